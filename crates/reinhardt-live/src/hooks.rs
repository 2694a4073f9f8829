//! Client hooks: lifecycle-bound browser behavior attached to one element.
//!
//! ## Lifecycle contract
//!
//! ```text
//! bind ──► create ──► update* ──► destroy ──► (nothing)
//! ```
//!
//! - `create` runs exactly once, after the element is in the DOM.
//! - `update` runs once per server patch touching the element and must be
//!   idempotent.
//! - `destroy` runs exactly once, when the element is removed or the
//!   connection closes, and must release every listener, timer and observer
//!   registered earlier. Holding those registrations as [`EventHandle`]s in the
//!   hook's own state and dropping them here satisfies this by construction.
//!
//! [`HookBinding`] enforces the ordering; hooks only implement [`ClientHook`].
//!
//! ## Hook tables
//!
//! Hooks are a closed set of [`HookDefinition`] variants plus
//! [`HookDefinition::Custom`] for application hooks, registered by name in a
//! [`HookTable`]. Names missing from the table resolve to
//! [`HookDefinition::Noop`], leaving the element non-interactive.
//!
//! [`EventHandle`]: crate::dom::EventHandle

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::Serialize;
use serde_json::Value;

use crate::bridge::{BindingId, EventBridge, EventEmitter};
use crate::discovery::ComponentLoader;
use crate::dom::{Document, Element};
use crate::error::LiveResult;
use crate::platform::Platform;
use crate::theme::ThemeController;
use crate::warn_log;

mod binding;
mod click_outside;
mod code_block;
mod dark_mode;
mod double_click;
mod highlight_all;
mod load_components;
mod scroll_observer;

pub use binding::{BindingPhase, HookBinding};
pub use click_outside::ClickOutside;
pub use code_block::{CodeBlock, HIGHLIGHTED_ATTR};
pub use dark_mode::DarkMode;
pub use double_click::DoubleClick;
pub use highlight_all::HighlightAll;
pub use load_components::LoadComponents;
pub use scroll_observer::ScrollObserver;

/// Registered name of [`CodeBlock`].
pub const CODE_BLOCK: &str = "CodeBlock";
/// Registered name of [`HighlightAll`].
pub const HIGHLIGHT_JS: &str = "HighlightJS";
/// Registered name of [`DoubleClick`].
pub const DOUBLE_CLICK: &str = "DoubleClick";
/// Registered name of [`ClickOutside`].
pub const CLICK_OUTSIDE: &str = "ClickOutside";
/// Registered name of [`DarkMode`].
pub const DARK_MODE: &str = "DarkMode";
/// Registered name of [`ScrollObserver`].
pub const SCROLL_OBSERVER: &str = "ScrollObserver";
/// Registered name of [`LoadComponents`].
pub const LOAD_COMPONENTS: &str = "LoadComponents";

/// Per-binding behavior driven by [`HookBinding`].
pub trait ClientHook {
	/// Runs once after the bound element exists.
	fn create(&mut self, ctx: &HookContext) -> LiveResult<()>;

	/// Runs after each server patch touching the element.
	fn update(&mut self, _ctx: &HookContext) -> LiveResult<()> {
		Ok(())
	}

	/// Runs once; releases everything `create` and `update` registered.
	fn destroy(&mut self, _ctx: &HookContext) {}
}

/// Value handed to every lifecycle callback of one binding.
pub struct HookContext {
	element: Element,
	binding: BindingId,
	emitter: EventEmitter,
	bridge: EventBridge,
	platform: Rc<dyn Platform>,
}

impl fmt::Debug for HookContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("HookContext")
			.field("element", &self.element)
			.field("binding", &self.binding)
			.finish()
	}
}

impl HookContext {
	/// Creates the context for a new binding.
	pub fn new(
		element: Element,
		binding: BindingId,
		hook: &str,
		bridge: EventBridge,
		platform: Rc<dyn Platform>,
	) -> Self {
		let emitter = bridge.emitter(binding, hook);
		Self {
			element,
			binding,
			emitter,
			bridge,
			platform,
		}
	}

	/// The bound element.
	pub fn element(&self) -> &Element {
		&self.element
	}

	/// The binding id.
	pub fn binding_id(&self) -> BindingId {
		self.binding
	}

	/// Queues an event for the owning connection.
	pub fn push_event(&self, name: &str, payload: impl Serialize) -> LiveResult<()> {
		self.emitter.push_event(name, payload)
	}

	/// A clonable emitter for listeners that outlive this call.
	pub fn emitter(&self) -> EventEmitter {
		self.emitter.clone()
	}

	/// Subscribes to a server-pushed event for this binding.
	///
	/// Handlers are dropped when the binding is destroyed.
	pub fn handle_event(&self, name: &str, handler: impl Fn(&Value) + 'static) {
		self.bridge.subscribe(self.binding, name, Rc::new(handler));
	}

	/// Browser services.
	pub fn platform(&self) -> &Rc<dyn Platform> {
		&self.platform
	}

	/// The page document.
	pub fn document(&self) -> Document {
		self.platform.document()
	}
}

/// Factory for application-defined hooks.
pub type HookFactory = Rc<dyn Fn() -> Box<dyn ClientHook>>;

/// A hook kind; one value per table entry, instantiated once per binding.
#[derive(Clone)]
pub enum HookDefinition {
	/// Syntax-highlights the bound element.
	CodeBlock,
	/// Syntax-highlights the whole page once.
	HighlightAll,
	/// Pushes `doubleclick` on double clicks.
	DoubleClick,
	/// Pushes `click_outside` on clicks outside the element.
	ClickOutside,
	/// Announces and applies the light/dark theme.
	DarkMode(ThemeController),
	/// Pushes `in_view` / `out_of_view`.
	ScrollObserver {
		/// Delay before observing starts.
		delay_ms: u32,
	},
	/// Discovers and connects embedded components under the element.
	LoadComponents(Rc<ComponentLoader>),
	/// Application-defined hook.
	Custom(HookFactory),
	/// Placeholder for unknown names.
	Noop,
}

impl fmt::Debug for HookDefinition {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::CodeBlock => f.write_str("CodeBlock"),
			Self::HighlightAll => f.write_str("HighlightAll"),
			Self::DoubleClick => f.write_str("DoubleClick"),
			Self::ClickOutside => f.write_str("ClickOutside"),
			Self::DarkMode(_) => f.write_str("DarkMode"),
			Self::ScrollObserver { delay_ms } => f
				.debug_struct("ScrollObserver")
				.field("delay_ms", delay_ms)
				.finish(),
			Self::LoadComponents(_) => f.write_str("LoadComponents"),
			Self::Custom(_) => f.write_str("Custom"),
			Self::Noop => f.write_str("Noop"),
		}
	}
}

impl HookDefinition {
	/// Wraps an application hook factory.
	pub fn custom<F, H>(factory: F) -> Self
	where
		F: Fn() -> H + 'static,
		H: ClientHook + 'static,
	{
		Self::Custom(Rc::new(move || Box::new(factory()) as Box<dyn ClientHook>))
	}

	/// Fresh per-binding state for this hook kind.
	pub fn instantiate(&self) -> Box<dyn ClientHook> {
		match self {
			Self::CodeBlock => Box::new(CodeBlock::default()),
			Self::HighlightAll => Box::new(HighlightAll::default()),
			Self::DoubleClick => Box::new(DoubleClick::default()),
			Self::ClickOutside => Box::new(ClickOutside::default()),
			Self::DarkMode(theme) => Box::new(DarkMode::new(theme.clone())),
			Self::ScrollObserver { delay_ms } => Box::new(ScrollObserver::new(*delay_ms)),
			Self::LoadComponents(loader) => Box::new(LoadComponents::new(Rc::clone(loader))),
			Self::Custom(factory) => factory(),
			Self::Noop => Box::new(NoopHook),
		}
	}

	/// Returns true for the unknown-name placeholder.
	pub fn is_noop(&self) -> bool {
		matches!(self, Self::Noop)
	}
}

struct NoopHook;

impl ClientHook for NoopHook {
	fn create(&mut self, _ctx: &HookContext) -> LiveResult<()> {
		Ok(())
	}
}

/// Mapping from hook name to definition; names are unique.
#[derive(Clone, Debug, Default)]
pub struct HookTable {
	hooks: BTreeMap<String, HookDefinition>,
}

impl HookTable {
	/// Creates an empty table.
	pub fn new() -> Self {
		Self::default()
	}

	/// Table handed to discovered components: `CodeBlock` and `DoubleClick`.
	pub fn components() -> Self {
		Self::new()
			.with(CODE_BLOCK, HookDefinition::CodeBlock)
			.with(DOUBLE_CLICK, HookDefinition::DoubleClick)
	}

	/// Every built-in hook, as handed to the single-root connection.
	pub fn standard(theme: ThemeController, loader: Rc<ComponentLoader>, visibility_delay_ms: u32) -> Self {
		Self::components()
			.with(HIGHLIGHT_JS, HookDefinition::HighlightAll)
			.with(CLICK_OUTSIDE, HookDefinition::ClickOutside)
			.with(DARK_MODE, HookDefinition::DarkMode(theme))
			.with(
				SCROLL_OBSERVER,
				HookDefinition::ScrollObserver {
					delay_ms: visibility_delay_ms,
				},
			)
			.with(LOAD_COMPONENTS, HookDefinition::LoadComponents(loader))
	}

	/// Adds or replaces an entry, builder style.
	pub fn with(mut self, name: impl Into<String>, definition: HookDefinition) -> Self {
		self.insert(name, definition);
		self
	}

	/// Adds or replaces an entry, returning the previous definition.
	pub fn insert(&mut self, name: impl Into<String>, definition: HookDefinition) -> Option<HookDefinition> {
		self.hooks.insert(name.into(), definition)
	}

	/// Looks up a definition.
	pub fn get(&self, name: &str) -> Option<&HookDefinition> {
		self.hooks.get(name)
	}

	/// Looks up a definition, degrading unknown names to [`HookDefinition::Noop`].
	pub fn resolve(&self, name: &str) -> HookDefinition {
		match self.hooks.get(name) {
			Some(definition) => definition.clone(),
			None => {
				warn_log!("unknown client hook '{}'; element stays non-interactive", name);
				HookDefinition::Noop
			}
		}
	}

	/// Returns true if `name` is registered.
	pub fn contains(&self, name: &str) -> bool {
		self.hooks.contains_key(name)
	}

	/// Registered names in sorted order.
	pub fn names(&self) -> Vec<String> {
		self.hooks.keys().cloned().collect()
	}

	/// Number of entries.
	pub fn len(&self) -> usize {
		self.hooks.len()
	}

	/// Returns true if the table is empty.
	pub fn is_empty(&self) -> bool {
		self.hooks.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_component_table() {
		let table = HookTable::components();
		assert_eq!(table.names(), vec![CODE_BLOCK.to_string(), DOUBLE_CLICK.to_string()]);
	}

	#[rstest]
	fn test_unknown_name_resolves_to_noop() {
		let table = HookTable::components();
		assert!(table.resolve("Missing").is_noop());
		assert!(!table.resolve(CODE_BLOCK).is_noop());
	}

	#[rstest]
	fn test_insert_replaces_existing_name() {
		let mut table = HookTable::new();
		assert!(table.insert("Hook", HookDefinition::CodeBlock).is_none());
		let previous = table.insert("Hook", HookDefinition::DoubleClick);
		assert!(matches!(previous, Some(HookDefinition::CodeBlock)));
		assert_eq!(table.len(), 1);
	}
}
