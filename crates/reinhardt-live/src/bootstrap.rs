//! Page bootstrap: single-root connection, standalone components and the
//! launch entry point.
//!
//! ```ignore
//! let app = LiveApp::new(platform, connector, LiveConfig::default());
//! // Applies the persisted theme, then connects `#app` to `<path>/connect`.
//! let connection = app.launch();
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::config::LiveConfig;
use crate::connection::{ConnectOptions, ConnectionHandle, Connector};
use crate::discovery::{self, ComponentLoader};
use crate::dom::Element;
use crate::error::{LiveError, LiveResult};
use crate::hooks::HookTable;
use crate::platform::Platform;
use crate::theme::ThemeController;
use crate::{error_log, info_log, warn_log};

/// Connection path for a page path: `/` maps to `/<suffix>`, anything else
/// gets `/<suffix>` appended after trailing slashes are trimmed.
///
/// ```
/// use reinhardt_live::connect_path;
///
/// assert_eq!(connect_path("/", "connect"), "/connect");
/// assert_eq!(connect_path("/docs/intro", "connect"), "/docs/intro/connect");
/// ```
pub fn connect_path(pathname: &str, suffix: &str) -> String {
	let trimmed = pathname.trim_end_matches('/');
	format!("{}/{}", trimmed, suffix)
}

/// Wires a page to the live server.
pub struct LiveApp {
	platform: Rc<dyn Platform>,
	connector: Rc<dyn Connector>,
	config: Rc<LiveConfig>,
	theme: ThemeController,
	component_hooks: HookTable,
}

impl fmt::Debug for LiveApp {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LiveApp")
			.field("config", &self.config)
			.field("theme", &self.theme)
			.finish_non_exhaustive()
	}
}

impl LiveApp {
	/// Creates the app and its theme controller.
	pub fn new(platform: Rc<dyn Platform>, connector: Rc<dyn Connector>, config: LiveConfig) -> Self {
		let theme = ThemeController::new(Rc::clone(&platform), config.theme.clone());
		Self {
			platform,
			connector,
			config: Rc::new(config),
			theme,
			component_hooks: HookTable::components(),
		}
	}

	/// Replaces the hook table handed to discovered components.
	///
	/// Include [`HookDefinition::LoadComponents`] to let a component connect
	/// the markers nested inside it.
	///
	/// [`HookDefinition::LoadComponents`]: crate::hooks::HookDefinition::LoadComponents
	pub fn with_component_hooks(mut self, hooks: HookTable) -> Self {
		self.component_hooks = hooks;
		self
	}

	/// Creates the app for the current browser window, reading configuration
	/// embedded in the page.
	#[cfg(target_arch = "wasm32")]
	pub fn browser(connector: Rc<dyn Connector>) -> LiveResult<Self> {
		let platform = crate::platform::BrowserPlatform::new()?;
		let config = LiveConfig::from_document(&platform.document())?;
		Ok(Self::new(Rc::new(platform), connector, config))
	}

	/// The shared theme controller.
	pub fn theme(&self) -> &ThemeController {
		&self.theme
	}

	/// Active configuration.
	pub fn config(&self) -> &LiveConfig {
		&self.config
	}

	/// Loader handing the component hook table to every discovered component.
	///
	/// Defaults to [`HookTable::components`].
	pub fn component_loader(&self) -> ComponentLoader {
		ComponentLoader::new(
			Rc::clone(&self.connector),
			Rc::clone(&self.config),
			self.component_hooks.clone(),
		)
	}

	/// Hook table handed to discovered components.
	pub fn component_hooks(&self) -> &HookTable {
		&self.component_hooks
	}

	/// Hook table of the single-root connection.
	pub fn hooks(&self) -> HookTable {
		HookTable::standard(
			self.theme.clone(),
			Rc::new(self.component_loader()),
			self.config.visibility_delay_ms,
		)
	}

	/// Non-empty auth token from the page metadata.
	pub fn auth_token(&self) -> LiveResult<String> {
		discovery::auth_token(&self.platform.document(), &self.config)
	}

	/// Connects the root element to `<current path>/<suffix>`.
	///
	/// Fails before any connection attempt when the token or root is missing.
	pub fn start(&self) -> LiveResult<ConnectionHandle> {
		let token = self.auth_token()?;
		let root = self
			.platform
			.document()
			.element_by_id(&self.config.root_id)
			.ok_or_else(|| LiveError::RootNotFound {
				selector: self.config.root_id.clone(),
			})?;
		let path = connect_path(&self.platform.pathname(), &self.config.connect_suffix);
		info_log!("bootstrapping #{} via {}", self.config.root_id, path);
		self.connector
			.connect(&path, ConnectOptions::new(token, root).with_hooks(self.hooks()))
	}

	/// Connects component `name` to the element with id `target_id`.
	pub fn connect_standalone(
		&self,
		name: &str,
		target_id: &str,
		props: BTreeMap<String, String>,
	) -> LiveResult<ConnectionHandle> {
		let token = self.auth_token()?;
		let target = self
			.platform
			.document()
			.element_by_id(target_id)
			.ok_or_else(|| LiveError::MissingTarget {
				component: name.to_string(),
			})?;
		let path = discovery::component_path(&self.config, name)?;
		self.connector
			.connect(&path, ConnectOptions::new(token, target).with_initial_props(props))
	}

	/// Connects every component marker under `root`.
	pub fn load_components(&self, root: &Element) -> LiveResult<Vec<ConnectionHandle>> {
		self.component_loader().load(root, &self.platform.document())
	}

	/// Applies the persisted theme, then runs [`Self::start`].
	///
	/// Failures are logged once and leave the page static.
	pub fn launch(&self) -> Option<ConnectionHandle> {
		#[cfg(feature = "console_error_panic_hook")]
		console_error_panic_hook::set_once();

		if let Err(err) = self.theme.initialize() {
			warn_log!("failed to apply theme: {}", err);
		}
		match self.start() {
			Ok(connection) => Some(connection),
			Err(err) => {
				error_log!("{}", err);
				None
			}
		}
	}
}
