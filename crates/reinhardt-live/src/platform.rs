//! Browser services used by the bootstrap layer and the built-in hooks.
//!
//! [`Platform`] bundles everything outside the DOM tree itself: page location,
//! persistent storage, the OS color-scheme media query, timers, visibility
//! observation and the external syntax highlighter. Every subscription-style
//! method returns an [`EventHandle`] that cancels the registration on drop.
//!
//! - [`BrowserPlatform`] (wasm32): `window`, `localStorage`, `matchMedia`,
//!   `setTimeout`, `IntersectionObserver` and highlight.js.
//! - [`HeadlessPlatform`] (other targets): deterministic in-memory versions with
//!   manual clocks and synthetic notifications, driven by the test-suite.

use std::rc::Rc;

use crate::dom::{Document, Element, EventHandle};
use crate::error::LiveResult;

#[cfg(target_arch = "wasm32")]
mod browser;
#[cfg(not(target_arch = "wasm32"))]
mod headless;

#[cfg(target_arch = "wasm32")]
pub use browser::BrowserPlatform;
#[cfg(not(target_arch = "wasm32"))]
pub use headless::HeadlessPlatform;

/// Media query watched for OS dark-mode preference.
pub const DARK_SCHEME_QUERY: &str = "(prefers-color-scheme: dark)";

/// Callback receiving a boolean notification (OS prefers dark, element visible).
pub type FlagCallback = Rc<dyn Fn(bool)>;

/// Browser services consumed by hooks and bootstrap.
pub trait Platform {
	/// The page document.
	fn document(&self) -> Document;

	/// `window.location.pathname`.
	fn pathname(&self) -> String;

	/// Reads a persisted value.
	fn storage_get(&self, key: &str) -> Option<String>;

	/// Persists a value across reloads.
	fn storage_set(&self, key: &str, value: &str) -> LiveResult<()>;

	/// Removes a persisted value.
	fn storage_remove(&self, key: &str) -> LiveResult<()>;

	/// Whether the OS currently prefers a dark color scheme.
	fn prefers_dark(&self) -> bool;

	/// Subscribes to OS color-scheme changes; the callback receives the new
	/// "prefers dark" value.
	fn on_color_scheme_change(&self, callback: FlagCallback) -> EventHandle;

	/// Runs `callback` once after `delay_ms`; dropping the handle cancels it.
	fn set_timeout(&self, delay_ms: u32, callback: Box<dyn FnOnce()>) -> EventHandle;

	/// Observes `element` with an intersection threshold of 0; the callback
	/// receives `true` when any part is visible and `false` once fully out of view.
	fn observe_visibility(&self, element: &Element, callback: FlagCallback) -> EventHandle;

	/// Highlights one code element.
	fn highlight_element(&self, element: &Element);

	/// Highlights every code block on the page.
	fn highlight_all(&self);
}
