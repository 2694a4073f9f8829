//! Error types for the live component layer.
//!
//! All fallible operations return [`LiveResult<T>`].
//!
//! | Category | Variants |
//! |----------|----------|
//! | Bootstrap | [`LiveError::MissingAuthToken`], [`LiveError::RootNotFound`], [`LiveError::MissingTarget`], [`LiveError::InvalidComponentName`] |
//! | Hooks | [`LiveError::Lifecycle`] |
//! | Bridge | [`LiveError::Serialization`], [`LiveError::Connection`] |
//! | Environment | [`LiveError::Config`], [`LiveError::Platform`] |

use thiserror::Error;

/// Result type alias using [`LiveError`].
pub type LiveResult<T> = Result<T, LiveError>;

/// Errors raised while bootstrapping connections or driving hooks.
#[derive(Error, Debug)]
pub enum LiveError {
	/// The page carries no auth token metadata; no connection is attempted.
	#[error("Missing CSRF token: no <meta name=\"{meta_name}\"> element with content")]
	MissingAuthToken {
		/// Name of the metadata element that was looked up.
		meta_name: String,
	},

	/// The single-root bootstrap target does not exist.
	#[error("Live root element not found: #{selector}")]
	RootNotFound {
		/// Id of the element that was looked up.
		selector: String,
	},

	/// A component connection has no element to bind to.
	#[error("No target element for component '{component}'")]
	MissingTarget {
		/// Component name the connection was opened for.
		component: String,
	},

	/// A component name cannot form a single path segment.
	#[error("Invalid component name '{name}'")]
	InvalidComponentName {
		/// The rejected name.
		name: String,
	},

	/// A lifecycle callback was requested out of order.
	#[error("Hook '{hook}' cannot run {phase}")]
	Lifecycle {
		/// Hook name.
		hook: String,
		/// Description of the rejected transition.
		phase: &'static str,
	},

	/// An event payload could not be serialized.
	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	/// Configuration could not be loaded.
	#[error("Configuration error: {0}")]
	Config(String),

	/// The connection is closed or the transport rejected it.
	#[error("Connection error: {0}")]
	Connection(String),

	/// A browser API failed.
	#[error("Platform error: {0}")]
	Platform(String),
}

impl LiveError {
	pub(crate) fn lifecycle(hook: impl Into<String>, phase: &'static str) -> Self {
		Self::Lifecycle {
			hook: hook.into(),
			phase,
		}
	}
}
