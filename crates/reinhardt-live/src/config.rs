//! Configuration for the live component layer.
//!
//! Every field has a default matching the markup conventions the server
//! renders, so most pages need no configuration at all. A page can override
//! any subset by embedding JSON:
//!
//! ```html
//! <script type="application/json" id="reinhardt-live-config">
//!   {"root_id": "main", "theme": {"dark_color": "#000000"}}
//! </script>
//! ```

use serde::{Deserialize, Serialize};

use crate::dom::Document;
use crate::error::{LiveError, LiveResult};

/// Id of the element holding JSON configuration.
pub const CONFIG_ELEMENT_ID: &str = "reinhardt-live-config";

/// Bootstrap and discovery settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
	/// `name` of the `<meta>` element carrying the auth token.
	pub auth_meta_name: String,
	/// Id of the single-root bootstrap target.
	pub root_id: String,
	/// Segment appended to page paths to form the connection path.
	pub connect_suffix: String,
	/// Attribute flagging an embeddable component root; its value is the component name.
	pub marker_attribute: String,
	/// Prefix of marker attributes that become initial props.
	pub config_prefix: String,
	/// Path prefix of component connections (`<prefix>/<name>/<suffix>`).
	pub component_path_prefix: String,
	/// Delay before the scroll observer starts watching its element.
	pub visibility_delay_ms: u32,
	/// Theme settings.
	pub theme: ThemeConfig,
}

impl Default for LiveConfig {
	fn default() -> Self {
		Self {
			auth_meta_name: "csrf-token".to_string(),
			root_id: "app".to_string(),
			connect_suffix: "connect".to_string(),
			marker_attribute: "data-sprocket".to_string(),
			config_prefix: "data-".to_string(),
			component_path_prefix: "/components".to_string(),
			visibility_delay_ms: 100,
			theme: ThemeConfig::default(),
		}
	}
}

impl LiveConfig {
	/// Parses configuration from JSON; absent keys keep their defaults.
	pub fn from_json(json: &str) -> LiveResult<Self> {
		serde_json::from_str(json).map_err(|err| LiveError::Config(err.to_string()))
	}

	/// Reads configuration embedded in the page, falling back to defaults.
	pub fn from_document(document: &Document) -> LiveResult<Self> {
		match document.element_by_id(CONFIG_ELEMENT_ID) {
			Some(element) => Self::from_json(&element.text_content()),
			None => Ok(Self::default()),
		}
	}
}

/// Light/dark theme settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
	/// Storage key of the explicit user choice.
	pub storage_key: String,
	/// Class toggled on the document root in dark mode.
	pub dark_class: String,
	/// `<meta name="theme-color">` value in light mode.
	pub light_color: String,
	/// `<meta name="theme-color">` value in dark mode.
	pub dark_color: String,
	/// Id of the `<link>` carrying the code highlighting stylesheet.
	pub code_theme_link_id: String,
	/// Code stylesheet used for an explicit light choice.
	pub light_stylesheet: Option<String>,
	/// Code stylesheet used for an explicit dark choice.
	pub dark_stylesheet: Option<String>,
}

impl Default for ThemeConfig {
	fn default() -> Self {
		Self {
			storage_key: "theme".to_string(),
			dark_class: "dark".to_string(),
			light_color: "#ffffff".to_string(),
			dark_color: "#121212".to_string(),
			code_theme_link_id: "highlight-theme".to_string(),
			light_stylesheet: Some(
				"https://cdnjs.cloudflare.com/ajax/libs/highlight.js/11.9.0/styles/atom-one-light.min.css"
					.to_string(),
			),
			dark_stylesheet: Some(
				"https://cdnjs.cloudflare.com/ajax/libs/highlight.js/11.9.0/styles/atom-one-dark.min.css"
					.to_string(),
			),
		}
	}
}
