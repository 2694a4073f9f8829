//! Reinhardt Live - browser-side hooks and bootstrap for live components
//!
//! Server-rendered pages opt into interactivity by connecting DOM roots to the
//! live server. This crate discovers those roots, opens one connection per
//! root and drives the client hooks that let imperative browser APIs
//! (highlighting, visibility, theme, outside clicks) take part in an otherwise
//! server-driven UI.
//!
//! ## Architecture
//!
//! - [`bootstrap`]: single-root bootstrap ([`LiveApp`]) and path derivation
//! - [`discovery`]: component markers, prop extraction, multi-component loading
//! - [`connection`]: per-component session state driving hook lifecycles
//! - [`hooks`]: the hook contract, hook tables and the built-in hooks
//! - [`bridge`]: `pushEvent` / `handleEvent` plumbing per connection
//! - [`theme`]: the shared light/dark controller
//! - [`dom`] and [`platform`]: browser access, with a headless backend on
//!   non-WASM targets
//!
//! The wire protocol is not part of this crate; transports implement
//! [`Connector`] and drain [`ConnectionHandle::take_outbound`].
//!
//! ## Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use reinhardt_live::LiveApp;
//!
//! let app = LiveApp::browser(Rc::new(MyTransport::new()))?;
//! let connection = app.launch();
//! ```
//!
//! ## Feature Flags
//!
//! - `debug-hooks`: log hook binding and discovery decisions
//! - `console_error_panic_hook`: readable panics in the browser console
//! - `web-sys-full`: every `web-sys` feature this crate touches

pub mod bootstrap;
pub mod bridge;
pub mod config;
pub mod connection;
pub mod discovery;
pub mod dom;
pub mod error;
pub mod hooks;
pub mod logging;
pub mod platform;
#[cfg(not(target_arch = "wasm32"))]
pub mod testing;
pub mod theme;

pub use bootstrap::{LiveApp, connect_path};
pub use bridge::{BindingId, EventBridge, EventEmitter, OutboundEvent};
pub use config::{LiveConfig, ThemeConfig};
pub use connection::{ConnectOptions, ConnectionHandle, Connector, LocalConnector};
pub use discovery::{ComponentLoader, ComponentMarker, component_path, extract_props, find_markers, load_components};
pub use dom::{Document, Element, Event, EventHandle};
pub use error::{LiveError, LiveResult};
pub use hooks::{ClientHook, HookBinding, HookContext, HookDefinition, HookTable};
pub use platform::Platform;
#[cfg(target_arch = "wasm32")]
pub use platform::BrowserPlatform;
#[cfg(not(target_arch = "wasm32"))]
pub use platform::HeadlessPlatform;
pub use theme::{ThemeController, ThemeMode};

#[doc(hidden)]
pub mod __private {
	pub use tracing;
	#[cfg(target_arch = "wasm32")]
	pub use web_sys;
}
