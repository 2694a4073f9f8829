//! Process-wide light/dark theme controller.
//!
//! One [`ThemeController`] is built at startup and cloned into whichever hook
//! needs it. Clones share state.
//!
//! ## States
//!
//! | Mode | Persisted | Rendered as |
//! |------|-----------|-------------|
//! | `auto` | nothing stored | OS preference at the time of evaluation |
//! | `light` | `"light"` | light |
//! | `dark` | `"dark"` | dark |
//!
//! Rendering toggles the dark class on the document root, sets
//! `<meta name="theme-color">` and, for explicit modes, swaps the code
//! highlighting stylesheet.
//!
//! ## OS preference subscription
//!
//! [`ThemeController::activate`] and [`ThemeController::deactivate`] are
//! reference counted. The first activation subscribes to OS color-scheme
//! changes; the matching last deactivation drops the subscription. While an
//! explicit mode is stored the subscription stays registered but ignores
//! notifications.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ThemeConfig;
use crate::dom::{Document, EventHandle};
use crate::error::{LiveError, LiveResult};
use crate::platform::Platform;
use crate::{debug_log, warn_log};

/// Name of the chrome color hint metadata element.
pub const THEME_COLOR_META: &str = "theme-color";

/// User-facing theme mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
	/// Follow the OS preference.
	#[default]
	Auto,
	/// Always light.
	Light,
	/// Always dark.
	Dark,
}

impl ThemeMode {
	/// Wire and storage representation.
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Auto => "auto",
			Self::Light => "light",
			Self::Dark => "dark",
		}
	}

	/// Parses a server `set_mode` payload: `"dark"` or `{"mode": "dark"}`.
	pub fn from_payload(payload: &Value) -> Option<Self> {
		let raw = match payload {
			Value::String(mode) => mode.as_str(),
			Value::Object(map) => map.get("mode")?.as_str()?,
			_ => return None,
		};
		raw.parse().ok()
	}

	/// Whether this mode renders dark given the OS preference.
	pub fn is_dark(&self, prefers_dark: bool) -> bool {
		match self {
			Self::Auto => prefers_dark,
			Self::Light => false,
			Self::Dark => true,
		}
	}
}

impl fmt::Display for ThemeMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for ThemeMode {
	type Err = LiveError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"auto" => Ok(Self::Auto),
			"light" => Ok(Self::Light),
			"dark" => Ok(Self::Dark),
			other => Err(LiveError::Config(format!("unknown theme mode '{}'", other))),
		}
	}
}

struct ThemeInner {
	platform: Rc<dyn Platform>,
	config: ThemeConfig,
	activations: Cell<usize>,
	subscription: RefCell<Option<EventHandle>>,
}

/// Shared theme state; clone to hand it to hooks.
#[derive(Clone)]
pub struct ThemeController {
	inner: Rc<ThemeInner>,
}

impl fmt::Debug for ThemeController {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ThemeController")
			.field("mode", &self.current_mode())
			.field("activations", &self.activations())
			.field("subscribed", &self.is_subscribed())
			.finish()
	}
}

impl ThemeController {
	/// Creates the controller. Nothing is rendered until [`Self::initialize`]
	/// or [`Self::activate`].
	pub fn new(platform: Rc<dyn Platform>, config: ThemeConfig) -> Self {
		Self {
			inner: Rc::new(ThemeInner {
				platform,
				config,
				activations: Cell::new(0),
				subscription: RefCell::new(None),
			}),
		}
	}

	/// Theme settings.
	pub fn config(&self) -> &ThemeConfig {
		&self.inner.config
	}

	/// The explicit choice in storage, if any.
	pub fn explicit_mode(&self) -> Option<ThemeMode> {
		let stored = self.inner.platform.storage_get(&self.inner.config.storage_key)?;
		match stored.parse() {
			Ok(ThemeMode::Auto) => None,
			Ok(mode) => Some(mode),
			Err(_) => {
				warn_log!("ignoring stored theme '{}'", stored);
				None
			}
		}
	}

	/// The effective mode: the explicit choice, else `auto`.
	pub fn current_mode(&self) -> ThemeMode {
		self.explicit_mode().unwrap_or_default()
	}

	/// Whether the page currently renders dark.
	pub fn is_dark(&self) -> bool {
		self.current_mode().is_dark(self.inner.platform.prefers_dark())
	}

	/// Renders the effective mode without subscribing to anything.
	pub fn initialize(&self) -> LiveResult<()> {
		self.apply()
	}

	/// Persists `mode` and renders it immediately.
	///
	/// `auto` clears the stored choice so OS changes apply again.
	pub fn set_mode(&self, mode: ThemeMode) -> LiveResult<()> {
		let key = &self.inner.config.storage_key;
		match mode {
			ThemeMode::Auto => self.inner.platform.storage_remove(key)?,
			explicit => self.inner.platform.storage_set(key, explicit.as_str())?,
		}
		debug_log!("theme set to {}", mode);
		self.apply()
	}

	/// Clears the explicit choice.
	pub fn clear_mode(&self) -> LiveResult<()> {
		self.set_mode(ThemeMode::Auto)
	}

	/// Renders the effective mode.
	pub fn apply(&self) -> LiveResult<()> {
		let mode = self.current_mode();
		self.render(mode, mode.is_dark(self.inner.platform.prefers_dark()))
	}

	/// Registers one user of the OS preference subscription.
	///
	/// Applies the effective mode; the first activation subscribes.
	pub fn activate(&self) -> LiveResult<()> {
		let count = self.inner.activations.get() + 1;
		self.inner.activations.set(count);
		if count == 1 {
			let weak: Weak<ThemeInner> = Rc::downgrade(&self.inner);
			let handle = self
				.inner
				.platform
				.on_color_scheme_change(Rc::new(move |prefers_dark| {
					if let Some(inner) = weak.upgrade() {
						ThemeController { inner }.on_os_change(prefers_dark);
					}
				}));
			*self.inner.subscription.borrow_mut() = Some(handle);
			debug_log!("theme subscribed to OS color scheme");
		}
		self.apply()
	}

	/// Releases one activation; the last one drops the subscription.
	pub fn deactivate(&self) {
		let count = self.inner.activations.get();
		if count == 0 {
			return;
		}
		self.inner.activations.set(count - 1);
		if count == 1 {
			let handle = self.inner.subscription.borrow_mut().take();
			drop(handle);
			debug_log!("theme unsubscribed from OS color scheme");
		}
	}

	/// Number of outstanding activations.
	pub fn activations(&self) -> usize {
		self.inner.activations.get()
	}

	/// Whether the OS preference subscription is registered.
	pub fn is_subscribed(&self) -> bool {
		self.inner.subscription.borrow().is_some()
	}

	fn on_os_change(&self, prefers_dark: bool) {
		if self.explicit_mode().is_some() {
			return;
		}
		if let Err(err) = self.render(ThemeMode::Auto, prefers_dark) {
			warn_log!("failed to follow OS color scheme: {}", err);
		}
	}

	fn render(&self, mode: ThemeMode, dark: bool) -> LiveResult<()> {
		let config = &self.inner.config;
		let document = self.inner.platform.document();

		if let Some(root) = document.document_element() {
			if dark {
				root.add_class(&config.dark_class)?;
			} else {
				root.remove_class(&config.dark_class)?;
			}
		}

		let color = if dark { &config.dark_color } else { &config.light_color };
		let meta = match document.meta_element(THEME_COLOR_META) {
			Some(meta) => meta,
			None => {
				let meta = document.create_element("meta")?;
				meta.set_attribute("name", THEME_COLOR_META)?;
				if let Some(head) = document.head() {
					head.append_child(&meta)?;
				}
				meta
			}
		};
		meta.set_attribute("content", color)?;

		let stylesheet = match mode {
			ThemeMode::Auto => None,
			ThemeMode::Light => config.light_stylesheet.as_deref(),
			ThemeMode::Dark => config.dark_stylesheet.as_deref(),
		};
		self.swap_code_stylesheet(&document, stylesheet)
	}

	fn swap_code_stylesheet(&self, document: &Document, href: Option<&str>) -> LiveResult<()> {
		let id = &self.inner.config.code_theme_link_id;
		let existing = document.element_by_id(id);
		match (existing, href) {
			(Some(link), Some(href)) => link.set_attribute("href", href),
			(None, Some(href)) => {
				let link = document.create_element("link")?;
				link.set_attribute("id", id)?;
				link.set_attribute("rel", "stylesheet")?;
				link.set_attribute("href", href)?;
				match document.head() {
					Some(head) => head.append_child(&link),
					None => Ok(()),
				}
			}
			(Some(link), None) => {
				link.remove();
				Ok(())
			}
			(None, None) => Ok(()),
		}
	}
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
	use super::*;
	use crate::platform::HeadlessPlatform;
	use rstest::{fixture, rstest};
	use serde_json::json;

	#[fixture]
	fn platform() -> HeadlessPlatform {
		HeadlessPlatform::new()
	}

	fn controller(platform: &HeadlessPlatform) -> ThemeController {
		ThemeController::new(Rc::new(platform.clone()), ThemeConfig::default())
	}

	fn root_is_dark(platform: &HeadlessPlatform) -> bool {
		platform
			.document()
			.document_element()
			.unwrap()
			.has_class("dark")
	}

	fn theme_color(platform: &HeadlessPlatform) -> Option<String> {
		platform.document().meta_content(THEME_COLOR_META)
	}

	#[rstest]
	#[case(json!("dark"), Some(ThemeMode::Dark))]
	#[case(json!({"mode": "light"}), Some(ThemeMode::Light))]
	#[case(json!("auto"), Some(ThemeMode::Auto))]
	#[case(json!("sepia"), None)]
	#[case(json!(3), None)]
	fn test_mode_from_payload(#[case] payload: Value, #[case] expected: Option<ThemeMode>) {
		assert_eq!(ThemeMode::from_payload(&payload), expected);
	}

	#[rstest]
	fn test_auto_follows_os_preference(platform: HeadlessPlatform) {
		platform.set_prefers_dark(true);
		let theme = controller(&platform);
		theme.initialize().unwrap();
		assert!(root_is_dark(&platform));
		assert_eq!(theme_color(&platform).as_deref(), Some("#121212"));
	}

	#[rstest]
	fn test_explicit_mode_is_persisted_and_rendered(platform: HeadlessPlatform) {
		let theme = controller(&platform);
		theme.set_mode(ThemeMode::Dark).unwrap();
		assert_eq!(platform.storage_get("theme").as_deref(), Some("dark"));
		assert!(root_is_dark(&platform));
		let link = platform.document().element_by_id("highlight-theme").unwrap();
		assert!(link.get_attribute("href").unwrap().contains("atom-one-dark"));

		theme.set_mode(ThemeMode::Light).unwrap();
		assert!(!root_is_dark(&platform));
		assert_eq!(theme_color(&platform).as_deref(), Some("#ffffff"));
		assert!(link.get_attribute("href").unwrap().contains("atom-one-light"));

		theme.clear_mode().unwrap();
		assert_eq!(platform.storage_get("theme"), None);
		assert!(platform.document().element_by_id("highlight-theme").is_none());
	}

	#[rstest]
	fn test_theme_color_meta_is_reused(platform: HeadlessPlatform) {
		platform.set_meta(THEME_COLOR_META, "#abcdef").unwrap();
		let theme = controller(&platform);
		theme.set_mode(ThemeMode::Dark).unwrap();
		theme.set_mode(ThemeMode::Light).unwrap();
		let metas: Vec<_> = platform
			.document()
			.head()
			.unwrap()
			.children()
			.into_iter()
			.filter(|element| element.get_attribute("name").as_deref() == Some(THEME_COLOR_META))
			.collect();
		assert_eq!(metas.len(), 1);
		assert_eq!(theme_color(&platform).as_deref(), Some("#ffffff"));
	}

	#[rstest]
	fn test_activation_is_reference_counted(platform: HeadlessPlatform) {
		let theme = controller(&platform);
		theme.activate().unwrap();
		theme.activate().unwrap();
		assert_eq!(platform.color_scheme_listener_count(), 1);

		theme.deactivate();
		assert!(theme.is_subscribed());
		theme.deactivate();
		assert!(!theme.is_subscribed());
		assert_eq!(platform.color_scheme_listener_count(), 0);

		theme.deactivate();
		assert_eq!(theme.activations(), 0);
	}

	#[rstest]
	fn test_os_change_ignored_while_explicit(platform: HeadlessPlatform) {
		let theme = controller(&platform);
		theme.activate().unwrap();
		theme.set_mode(ThemeMode::Light).unwrap();

		platform.emit_color_scheme_change(true);
		assert!(!root_is_dark(&platform));

		theme.clear_mode().unwrap();
		assert!(root_is_dark(&platform));
		platform.emit_color_scheme_change(false);
		assert!(!root_is_dark(&platform));
		theme.deactivate();
	}

	#[rstest]
	fn test_unknown_stored_value_is_auto(platform: HeadlessPlatform) {
		platform.storage_set("theme", "sepia").unwrap();
		let theme = controller(&platform);
		assert_eq!(theme.current_mode(), ThemeMode::Auto);
	}
}
