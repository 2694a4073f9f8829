//! Test utilities for pages driven on the headless backend.
//!
//! ```ignore
//! let page = TestPage::new().with_token("secret")?;
//! page.body()?.append_child(&marker_element("counter", &[("data-start", "3")])?)?;
//! let connections = page.app().load_components(&page.body()?)?;
//! assert_eq!(page.connector.call_count(), 1);
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use futures::channel::mpsc::UnboundedReceiver;

use crate::bootstrap::LiveApp;
use crate::bridge::OutboundEvent;
use crate::config::LiveConfig;
use crate::connection::{ConnectOptions, ConnectionHandle, Connector, LocalConnector};
use crate::dom::Element;
use crate::error::{LiveError, LiveResult};
use crate::platform::{HeadlessPlatform, Platform};

/// One recorded [`Connector::connect`] call.
#[derive(Debug, Clone)]
pub struct ConnectCall {
	/// Requested path.
	pub path: String,
	/// Target element.
	pub target: Element,
	/// Names in the hook table.
	pub hook_names: Vec<String>,
	/// Initial props.
	pub initial_props: BTreeMap<String, String>,
	/// Auth token.
	pub auth_token: String,
}

/// Connector that records every call and opens local sessions.
#[derive(Debug)]
pub struct RecordingConnector {
	inner: LocalConnector,
	calls: RefCell<Vec<ConnectCall>>,
	refused_paths: RefCell<Vec<String>>,
}

impl RecordingConnector {
	/// Creates a connector whose sessions use `platform`.
	pub fn new(platform: Rc<dyn Platform>) -> Self {
		Self {
			inner: LocalConnector::new(platform),
			calls: RefCell::new(Vec::new()),
			refused_paths: RefCell::new(Vec::new()),
		}
	}

	/// Makes every later connect to `path` fail (after being recorded).
	pub fn refuse(&self, path: &str) {
		self.refused_paths.borrow_mut().push(path.to_string());
	}

	/// Recorded calls in order.
	pub fn calls(&self) -> Vec<ConnectCall> {
		self.calls.borrow().clone()
	}

	/// Number of recorded calls.
	pub fn call_count(&self) -> usize {
		self.calls.borrow().len()
	}
}

impl Connector for RecordingConnector {
	fn connect(&self, path: &str, options: ConnectOptions) -> LiveResult<ConnectionHandle> {
		self.calls.borrow_mut().push(ConnectCall {
			path: path.to_string(),
			target: options.target.clone(),
			hook_names: options.hooks.names(),
			initial_props: options.initial_props.clone(),
			auth_token: options.auth_token.clone(),
		});
		if self.refused_paths.borrow().iter().any(|refused| refused == path) {
			return Err(LiveError::Connection(format!("{} refused", path)));
		}
		self.inner.connect(path, options)
	}
}

/// Headless page with a recording connector.
#[derive(Debug, Clone)]
pub struct TestPage {
	/// Platform shared with the app.
	pub platform: HeadlessPlatform,
	/// Connector shared with the app.
	pub connector: Rc<RecordingConnector>,
}

impl Default for TestPage {
	fn default() -> Self {
		Self::new()
	}
}

impl TestPage {
	/// Empty page at `/` with no auth token.
	pub fn new() -> Self {
		let platform = HeadlessPlatform::new();
		let connector = Rc::new(RecordingConnector::new(Rc::new(platform.clone())));
		Self { platform, connector }
	}

	/// Adds the auth token metadata.
	pub fn with_token(self, token: &str) -> LiveResult<Self> {
		self.platform
			.set_meta(&LiveConfig::default().auth_meta_name, token)?;
		Ok(self)
	}

	/// Sets the current path.
	pub fn with_pathname(self, pathname: &str) -> Self {
		self.platform.set_pathname(pathname);
		self
	}

	/// The page body.
	pub fn body(&self) -> LiveResult<Element> {
		self.platform
			.document()
			.body()
			.ok_or_else(|| LiveError::Platform("document has no body".to_string()))
	}

	/// Appends `<tag id="{id}">` to the body.
	pub fn add_element(&self, tag: &str, id: &str) -> LiveResult<Element> {
		let element = self.platform.document().create_element(tag)?;
		element.set_attribute("id", id)?;
		self.body()?.append_child(&element)?;
		Ok(element)
	}

	/// App with default configuration.
	pub fn app(&self) -> LiveApp {
		self.app_with(LiveConfig::default())
	}

	/// App with `config`.
	pub fn app_with(&self, config: LiveConfig) -> LiveApp {
		LiveApp::new(
			Rc::new(self.platform.clone()),
			Rc::clone(&self.connector) as Rc<dyn Connector>,
			config,
		)
	}
}

/// Builds a component marker with a single `<div>` target child.
pub fn marker_element(name: &str, attributes: &[(&str, &str)]) -> LiveResult<Element> {
	let marker = Element::new("div");
	marker.set_attribute(&LiveConfig::default().marker_attribute, name)?;
	for (key, value) in attributes {
		marker.set_attribute(key, value)?;
	}
	marker.append_child(&Element::new("div"))?;
	Ok(marker)
}

/// Everything queued on `receiver` so far, without waiting.
pub fn drain_outbound(receiver: &mut UnboundedReceiver<OutboundEvent>) -> Vec<OutboundEvent> {
	let mut events = Vec::new();
	while let Ok(Some(event)) = receiver.try_next() {
		events.push(event);
	}
	events
}
