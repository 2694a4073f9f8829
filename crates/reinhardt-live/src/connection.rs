//! Component connections and the hook lifecycle driver.
//!
//! The wire protocol lives in the transport; this module owns the per-component
//! session state the transport drives:
//!
//! ```text
//! Connector::connect(path, options)
//!         │
//!         ▼
//! ConnectionHandle ── bind_hook ──► HookBinding (create)
//!         │          update_hook ─► HookBinding (update)
//!         │          unbind_hook / remove_subtree / close ─► HookBinding (destroy)
//!         │          dispatch ────► server event handlers
//!         └── take_outbound ─────► OutboundEvent FIFO for the transport
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use futures::channel::mpsc::UnboundedReceiver;
use serde_json::Value;

use crate::bridge::{BindingId, EventBridge, OutboundEvent};
use crate::dom::Element;
use crate::error::{LiveError, LiveResult};
use crate::hooks::{BindingPhase, HookBinding, HookContext, HookTable};
use crate::platform::Platform;
use crate::{debug_log, info_log, warn_log};

/// Options for opening one connection.
#[derive(Clone, Debug)]
pub struct ConnectOptions {
	/// Opaque auth token forwarded to the server.
	pub auth_token: String,
	/// Element the connection renders into.
	pub target: Element,
	/// Hooks available to bindings of this connection.
	pub hooks: HookTable,
	/// Starting configuration sent to the server; values are unparsed strings.
	pub initial_props: BTreeMap<String, String>,
}

impl ConnectOptions {
	/// Options with an empty hook table and no initial props.
	pub fn new(auth_token: impl Into<String>, target: Element) -> Self {
		Self {
			auth_token: auth_token.into(),
			target,
			hooks: HookTable::new(),
			initial_props: BTreeMap::new(),
		}
	}

	/// Sets the hook table.
	pub fn with_hooks(mut self, hooks: HookTable) -> Self {
		self.hooks = hooks;
		self
	}

	/// Sets the initial props.
	pub fn with_initial_props(mut self, initial_props: BTreeMap<String, String>) -> Self {
		self.initial_props = initial_props;
		self
	}
}

/// Opens connections. Implemented by the transport.
pub trait Connector {
	/// Opens a connection to `path`.
	fn connect(&self, path: &str, options: ConnectOptions) -> LiveResult<ConnectionHandle>;
}

/// Connector that creates in-process sessions without a network transport.
///
/// The outbound queue is left for the caller to drain via
/// [`ConnectionHandle::take_outbound`].
#[derive(Clone)]
pub struct LocalConnector {
	platform: Rc<dyn Platform>,
}

impl fmt::Debug for LocalConnector {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LocalConnector").finish_non_exhaustive()
	}
}

impl LocalConnector {
	/// Creates a connector whose hooks use `platform`.
	pub fn new(platform: Rc<dyn Platform>) -> Self {
		Self { platform }
	}
}

impl Connector for LocalConnector {
	fn connect(&self, path: &str, options: ConnectOptions) -> LiveResult<ConnectionHandle> {
		ConnectionHandle::open(path, options, Rc::clone(&self.platform))
	}
}

/// Session state of one component connection.
///
/// Closing (explicitly or by drop) destroys every live binding.
pub struct ConnectionHandle {
	path: String,
	options: ConnectOptions,
	platform: Rc<dyn Platform>,
	bridge: EventBridge,
	outbound: Option<UnboundedReceiver<OutboundEvent>>,
	bindings: BTreeMap<BindingId, HookBinding>,
	next_binding: u64,
	closed: bool,
}

impl fmt::Debug for ConnectionHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ConnectionHandle")
			.field("path", &self.path)
			.field("target", &self.options.target)
			.field("bindings", &self.bindings.len())
			.field("closed", &self.closed)
			.finish()
	}
}

impl ConnectionHandle {
	/// Opens a session.
	pub fn open(path: impl Into<String>, options: ConnectOptions, platform: Rc<dyn Platform>) -> LiveResult<Self> {
		let path = path.into();
		if options.auth_token.is_empty() {
			return Err(LiveError::Connection(format!("refusing to open {} without an auth token", path)));
		}
		let (bridge, outbound) = EventBridge::new();
		info_log!("opening live connection {}", path);
		Ok(Self {
			path,
			options,
			platform,
			bridge,
			outbound: Some(outbound),
			bindings: BTreeMap::new(),
			next_binding: 1,
			closed: false,
		})
	}

	/// Connection path.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// Element the connection renders into.
	pub fn target(&self) -> &Element {
		&self.options.target
	}

	/// Auth token the connection was opened with.
	pub fn auth_token(&self) -> &str {
		&self.options.auth_token
	}

	/// Hooks available to bindings.
	pub fn hooks(&self) -> &HookTable {
		&self.options.hooks
	}

	/// Initial props sent to the server.
	pub fn initial_props(&self) -> &BTreeMap<String, String> {
		&self.options.initial_props
	}

	/// Takes the outbound event queue. Returns `None` after the first call.
	pub fn take_outbound(&mut self) -> Option<UnboundedReceiver<OutboundEvent>> {
		self.outbound.take()
	}

	/// Binds the hook registered as `name` to `element` and runs `create`.
	///
	/// Unknown names bind a no-op hook. When `create` fails the binding is
	/// destroyed and discarded.
	pub fn bind_hook(&mut self, element: &Element, name: &str) -> LiveResult<BindingId> {
		if self.closed {
			return Err(LiveError::Connection(format!("{} is closed", self.path)));
		}
		let id = BindingId(self.next_binding);
		self.next_binding += 1;

		let hook = self.options.hooks.resolve(name).instantiate();
		let ctx = HookContext::new(
			element.clone(),
			id,
			name,
			self.bridge.clone(),
			Rc::clone(&self.platform),
		);
		let mut binding = HookBinding::new(name, hook, ctx);
		if let Err(err) = binding.mount() {
			binding.destroy();
			return Err(err);
		}
		self.bindings.insert(id, binding);
		Ok(id)
	}

	/// Runs `update` for one binding.
	pub fn update_hook(&mut self, id: BindingId) -> LiveResult<()> {
		match self.bindings.get_mut(&id) {
			Some(binding) => binding.update(),
			None => Err(LiveError::lifecycle(format!("binding {}", id), "update after destroy")),
		}
	}

	/// Runs `update` for every binding inside `root` (inclusive), in bind order.
	///
	/// A failing hook does not stop the others; each failure is logged and the
	/// first one is returned once every binding has been updated.
	pub fn patch(&mut self, root: &Element) -> LiveResult<usize> {
		let mut updated = 0;
		let mut first_error = None;
		for (id, binding) in self.bindings.iter_mut() {
			if !root.contains(binding.context().element()) {
				continue;
			}
			match binding.update() {
				Ok(()) => updated += 1,
				Err(err) => {
					warn_log!("hook {} on binding {} failed to update: {}", binding.name(), id, err);
					first_error.get_or_insert(err);
				}
			}
		}
		match first_error {
			Some(err) => Err(err),
			None => Ok(updated),
		}
	}

	/// Destroys one binding. Returns false if it was already gone.
	pub fn unbind_hook(&mut self, id: BindingId) -> bool {
		match self.bindings.remove(&id) {
			Some(mut binding) => {
				binding.destroy();
				true
			}
			None => false,
		}
	}

	/// Destroys every binding inside `root` (inclusive), then detaches `root`.
	///
	/// Returns the number of destroyed bindings.
	pub fn remove_subtree(&mut self, root: &Element) -> usize {
		let ids: Vec<BindingId> = self
			.bindings
			.iter()
			.filter(|(_, binding)| root.contains(binding.context().element()))
			.map(|(id, _)| *id)
			.collect();
		for id in &ids {
			self.unbind_hook(*id);
		}
		root.remove();
		debug_log!("removed subtree with {} bindings from {}", ids.len(), self.path);
		ids.len()
	}

	/// Delivers a server-pushed event to one binding's handlers.
	///
	/// Returns the number of handlers invoked.
	pub fn dispatch(&self, id: BindingId, event: &str, payload: &Value) -> usize {
		self.bridge.dispatch(id, event, payload)
	}

	/// Phase of a live binding.
	pub fn binding_phase(&self, id: BindingId) -> Option<BindingPhase> {
		self.bindings.get(&id).map(HookBinding::phase)
	}

	/// Ids of live bindings in bind order.
	pub fn binding_ids(&self) -> Vec<BindingId> {
		self.bindings.keys().copied().collect()
	}

	/// Number of live bindings.
	pub fn binding_count(&self) -> usize {
		self.bindings.len()
	}

	/// Returns true once closed.
	pub fn is_closed(&self) -> bool {
		self.closed
	}

	/// Destroys every binding and closes the outbound queue. Idempotent.
	pub fn close(&mut self) {
		if self.closed {
			return;
		}
		self.closed = true;
		let bindings = std::mem::take(&mut self.bindings);
		for (_, mut binding) in bindings {
			binding.destroy();
		}
		self.bridge.close();
		info_log!("closed live connection {}", self.path);
	}
}

impl Drop for ConnectionHandle {
	fn drop(&mut self) {
		self.close();
	}
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
	use super::*;
	use crate::hooks::{ClientHook, HookDefinition};
	use crate::platform::HeadlessPlatform;
	use rstest::rstest;
	use serde_json::json;
	use std::cell::{Cell, RefCell};

	struct Echo;

	impl ClientHook for Echo {
		fn create(&mut self, ctx: &HookContext) -> LiveResult<()> {
			let emitter = ctx.emitter();
			ctx.handle_event("ping", move |payload| {
				let _ = emitter.push_event("pong", payload.clone());
			});
			Ok(())
		}
	}

	struct Failing(Rc<RefCell<Vec<&'static str>>>);

	impl ClientHook for Failing {
		fn create(&mut self, _ctx: &HookContext) -> LiveResult<()> {
			self.0.borrow_mut().push("create");
			Err(LiveError::Platform("boom".to_string()))
		}

		fn destroy(&mut self, _ctx: &HookContext) {
			self.0.borrow_mut().push("destroy");
		}
	}

	fn open(hooks: HookTable) -> ConnectionHandle {
		let platform = HeadlessPlatform::new();
		let target = Element::new("div");
		ConnectionHandle::open(
			"/connect",
			ConnectOptions::new("token", target).with_hooks(hooks),
			Rc::new(platform),
		)
		.unwrap()
	}

	#[rstest]
	fn test_open_requires_token() {
		let err = ConnectionHandle::open(
			"/connect",
			ConnectOptions::new("", Element::new("div")),
			Rc::new(HeadlessPlatform::new()),
		)
		.unwrap_err();
		assert!(matches!(err, LiveError::Connection(_)));
	}

	#[rstest]
	fn test_server_event_round_trip() {
		let mut connection = open(HookTable::new().with("Echo", HookDefinition::custom(|| Echo)));
		let mut outbound = connection.take_outbound().unwrap();
		assert!(connection.take_outbound().is_none());

		let element = Element::new("span");
		let id = connection.bind_hook(&element, "Echo").unwrap();
		assert_eq!(connection.dispatch(id, "ping", &json!({"n": 1})), 1);

		let event = outbound.try_next().unwrap().unwrap();
		assert_eq!(event.name, "pong");
		assert_eq!(event.hook, "Echo");
		assert_eq!(event.payload, json!({"n": 1}));

		assert!(connection.unbind_hook(id));
		assert_eq!(connection.dispatch(id, "ping", &json!({})), 0);
		assert!(!connection.unbind_hook(id));
	}

	#[rstest]
	fn test_failed_create_is_destroyed_and_discarded() {
		let log = Rc::new(RefCell::new(Vec::new()));
		let hook_log = Rc::clone(&log);
		let mut connection = open(HookTable::new().with(
			"Failing",
			HookDefinition::custom(move || Failing(Rc::clone(&hook_log))),
		));
		assert!(connection.bind_hook(&Element::new("div"), "Failing").is_err());
		assert_eq!(connection.binding_count(), 0);
		assert_eq!(*log.borrow(), vec!["create", "destroy"]);
	}

	#[rstest]
	fn test_unknown_hook_binds_noop() {
		let mut connection = open(HookTable::new());
		let id = connection.bind_hook(&Element::new("div"), "Nope").unwrap();
		assert_eq!(connection.binding_phase(id), Some(BindingPhase::Mounted));
		connection.update_hook(id).unwrap();
	}

	#[rstest]
	fn test_remove_subtree_only_touches_descendants() {
		let mut connection = open(HookTable::components());
		let root = Element::new("section");
		let inner = Element::new("pre");
		root.append_child(&inner).unwrap();
		let outside = Element::new("pre");

		connection.bind_hook(&inner, "CodeBlock").unwrap();
		connection.bind_hook(&root, "DoubleClick").unwrap();
		let kept = connection.bind_hook(&outside, "CodeBlock").unwrap();

		assert_eq!(connection.remove_subtree(&root), 2);
		assert_eq!(connection.binding_ids(), vec![kept]);
	}

	struct RejectsUpdate;

	impl ClientHook for RejectsUpdate {
		fn create(&mut self, _ctx: &HookContext) -> LiveResult<()> {
			Ok(())
		}

		fn update(&mut self, _ctx: &HookContext) -> LiveResult<()> {
			Err(LiveError::Platform("stale node".to_string()))
		}
	}

	struct CountsUpdates(Rc<Cell<usize>>);

	impl ClientHook for CountsUpdates {
		fn create(&mut self, _ctx: &HookContext) -> LiveResult<()> {
			Ok(())
		}

		fn update(&mut self, _ctx: &HookContext) -> LiveResult<()> {
			self.0.set(self.0.get() + 1);
			Ok(())
		}
	}

	#[rstest]
	fn test_patch_updates_siblings_of_a_failing_hook() {
		let updates = Rc::new(Cell::new(0));
		let counter = Rc::clone(&updates);
		let mut connection = open(
			HookTable::new()
				.with("RejectsUpdate", HookDefinition::custom(|| RejectsUpdate))
				.with(
					"CountsUpdates",
					HookDefinition::custom(move || CountsUpdates(Rc::clone(&counter))),
				),
		);
		let root = Element::new("section");
		let first = Element::new("div");
		let second = Element::new("div");
		root.append_child(&first).unwrap();
		root.append_child(&second).unwrap();
		connection.bind_hook(&first, "RejectsUpdate").unwrap();
		connection.bind_hook(&second, "CountsUpdates").unwrap();

		let err = connection.patch(&root).unwrap_err();
		assert!(matches!(err, LiveError::Platform(_)));
		assert_eq!(updates.get(), 1);
		assert_eq!(connection.patch(&second).unwrap(), 1);
		assert_eq!(updates.get(), 2);
	}

	#[rstest]
	fn test_close_rejects_new_bindings() {
		let mut connection = open(HookTable::components());
		let mut outbound = connection.take_outbound().unwrap();
		connection.bind_hook(&Element::new("div"), "DoubleClick").unwrap();
		connection.close();
		connection.close();
		assert!(connection.is_closed());
		assert_eq!(connection.binding_count(), 0);
		assert!(connection.bind_hook(&Element::new("div"), "DoubleClick").is_err());
		assert_eq!(outbound.try_next().unwrap(), None);
	}
}
