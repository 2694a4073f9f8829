//! Multi-component discovery.
//!
//! Server-rendered markup flags each embeddable component with a marker
//! attribute whose value is the component name. The marker is a
//! non-rendering wrapper; its first child element is the connection target.
//!
//! ```text
//! <div data-sprocket="counter" data-start="3">   ← marker, props {start: "3"}
//!   <div>…</div>                                 ← target
//! </div>
//! ```
//!
//! Markers nested inside another marker are left for that component's own
//! scan, which only happens when the component's hook table carries
//! `LoadComponents` and the server binds it. The default component table
//! ([`HookTable::components`]) does not, so nested markers stay static unless
//! the application opts in with `LiveApp::with_component_hooks`.
//!
//! Each marker is processed independently: a malformed marker or a failed
//! connection never prevents its siblings from connecting.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::config::LiveConfig;
use crate::connection::{ConnectOptions, ConnectionHandle, Connector};
use crate::dom::{Document, Element};
use crate::error::{LiveError, LiveResult};
use crate::hooks::HookTable;
use crate::{debug_log, error_log, warn_log};

/// A component marker found in the DOM.
#[derive(Debug, Clone)]
pub struct ComponentMarker {
	/// The marker element.
	pub element: Element,
	/// Component name from the marker attribute.
	pub name: String,
	/// Props extracted from prefixed attributes.
	pub props: BTreeMap<String, String>,
}

impl ComponentMarker {
	/// Reads a marker. Returns `None` when the name is missing or empty.
	pub fn from_element(element: Element, config: &LiveConfig) -> Option<Self> {
		let name = element.get_attribute(&config.marker_attribute)?;
		if name.is_empty() {
			return None;
		}
		let props = extract_props(&element, config);
		Some(Self { element, name, props })
	}

	/// The element the connection binds to.
	pub fn target(&self) -> Option<Element> {
		self.element.first_element_child()
	}
}

/// Top-level markers under `root` (exclusive), in document order.
pub fn find_markers(root: &Element, config: &LiveConfig) -> Vec<ComponentMarker> {
	let mut markers: Vec<ComponentMarker> = Vec::new();
	for element in root.elements_with_attribute(&config.marker_attribute) {
		let nested = markers
			.iter()
			.any(|marker| marker.element != element && marker.element.contains(&element));
		if nested {
			debug_log!("skipping nested component marker");
			continue;
		}
		match ComponentMarker::from_element(element, config) {
			Some(marker) => markers.push(marker),
			None => debug_log!("skipping component marker without a name"),
		}
	}
	markers
}

/// Prefixed attributes of `element` as unparsed props, marker attribute excluded.
pub fn extract_props(element: &Element, config: &LiveConfig) -> BTreeMap<String, String> {
	element
		.attributes()
		.into_iter()
		.filter(|(name, _)| *name != config.marker_attribute)
		.filter_map(|(name, value)| {
			let key = name.strip_prefix(config.config_prefix.as_str())?;
			if key.is_empty() {
				return None;
			}
			Some((key.to_string(), value))
		})
		.collect()
}

/// Connection path of component `name`, e.g. `/components/counter/connect`.
///
/// The name must be a single path segment: empty names, `.`, `..` and names
/// containing `/`, `\`, `?` or `#` are rejected.
pub fn component_path(config: &LiveConfig, name: &str) -> LiveResult<String> {
	let single_segment = !matches!(name, "" | "." | "..")
		&& !name.contains(['/', '\\', '?', '#']);
	if !single_segment {
		return Err(LiveError::InvalidComponentName {
			name: name.to_string(),
		});
	}
	Ok(format!(
		"{}/{}/{}",
		config.component_path_prefix.trim_end_matches('/'),
		name,
		config.connect_suffix
	))
}

/// Opens one connection per top-level marker under `root`.
///
/// Markers without a target element and connections that fail to open are
/// logged and skipped.
pub fn load_components(
	root: &Element,
	auth_token: &str,
	connector: &dyn Connector,
	hooks: &HookTable,
	config: &LiveConfig,
) -> Vec<ConnectionHandle> {
	let mut connections = Vec::new();
	for marker in find_markers(root, config) {
		let Some(target) = marker.target() else {
			warn_log!(
				"{}",
				LiveError::MissingTarget {
					component: marker.name.clone()
				}
			);
			continue;
		};
		let path = match component_path(config, &marker.name) {
			Ok(path) => path,
			Err(err) => {
				warn_log!("{}", err);
				continue;
			}
		};
		let options = ConnectOptions::new(auth_token, target)
			.with_hooks(hooks.clone())
			.with_initial_props(marker.props);
		match connector.connect(&path, options) {
			Ok(connection) => connections.push(connection),
			Err(err) => error_log!("failed to connect component '{}': {}", marker.name, err),
		}
	}
	connections
}

/// Discovery bundled with everything it needs, shared by the `LoadComponents` hook.
pub struct ComponentLoader {
	connector: Rc<dyn Connector>,
	config: Rc<LiveConfig>,
	hooks: HookTable,
}

impl fmt::Debug for ComponentLoader {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ComponentLoader")
			.field("hooks", &self.hooks.names())
			.finish_non_exhaustive()
	}
}

impl ComponentLoader {
	/// Creates a loader handing `hooks` to every discovered component.
	pub fn new(connector: Rc<dyn Connector>, config: Rc<LiveConfig>, hooks: HookTable) -> Self {
		Self { connector, config, hooks }
	}

	/// Reads the auth token from `document` and connects every marker under `root`.
	pub fn load(&self, root: &Element, document: &Document) -> LiveResult<Vec<ConnectionHandle>> {
		let token = auth_token(document, &self.config)?;
		Ok(load_components(
			root,
			&token,
			self.connector.as_ref(),
			&self.hooks,
			&self.config,
		))
	}
}

/// Non-empty auth token from the page metadata.
pub fn auth_token(document: &Document, config: &LiveConfig) -> LiveResult<String> {
	document
		.meta_content(&config.auth_meta_name)
		.filter(|token| !token.is_empty())
		.ok_or_else(|| LiveError::MissingAuthToken {
			meta_name: config.auth_meta_name.clone(),
		})
}
