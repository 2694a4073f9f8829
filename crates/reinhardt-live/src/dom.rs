//! Target-neutral DOM handles.
//!
//! Hooks, discovery, and the theme controller only talk to [`Document`],
//! [`Element`] and [`Event`]. On `wasm32` these wrap `web-sys` objects; on
//! every other target they are backed by an in-memory headless tree that
//! supports attributes, classes, text, containment and bubbling events.
//!
//! Listeners are registered through [`Element::add_event_listener`] and
//! [`Document::add_event_listener`], both returning an [`EventHandle`] that
//! removes the listener when dropped.

use std::fmt;

#[cfg(not(target_arch = "wasm32"))]
mod headless;
#[cfg(target_arch = "wasm32")]
mod web;

#[cfg(not(target_arch = "wasm32"))]
pub use headless::{Document, Element, Event};
#[cfg(target_arch = "wasm32")]
pub use web::{Document, Element, Event};

/// Quotes `value` as a CSS string for attribute selectors.
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
pub(crate) fn css_string(value: &str) -> String {
	let mut quoted = String::with_capacity(value.len() + 2);
	quoted.push('"');
	for ch in value.chars() {
		match ch {
			'"' | '\\' => {
				quoted.push('\\');
				quoted.push(ch);
			}
			'\n' => quoted.push_str("\\a "),
			_ => quoted.push(ch),
		}
	}
	quoted.push('"');
	quoted
}

/// RAII guard for a registered listener, observer, or timer.
///
/// Dropping the handle releases the underlying registration exactly once.
#[must_use = "dropping an EventHandle immediately removes the listener"]
pub struct EventHandle {
	release: Option<Box<dyn FnOnce()>>,
}

impl EventHandle {
	/// Creates a handle that runs `release` when dropped.
	pub fn new(release: impl FnOnce() + 'static) -> Self {
		Self {
			release: Some(Box::new(release)),
		}
	}

	/// Creates a handle with nothing to release.
	pub fn noop() -> Self {
		Self { release: None }
	}

	/// Releases the registration now.
	pub fn release(mut self) {
		if let Some(release) = self.release.take() {
			release();
		}
	}

	/// Returns true if dropping this handle still has something to release.
	pub fn is_active(&self) -> bool {
		self.release.is_some()
	}
}

impl Drop for EventHandle {
	fn drop(&mut self) {
		if let Some(release) = self.release.take() {
			release();
		}
	}
}

impl fmt::Debug for EventHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EventHandle")
			.field("active", &self.is_active())
			.finish()
	}
}
