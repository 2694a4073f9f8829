//! Lifecycle state machine for one hook attached to one element.

use std::fmt;

use super::{ClientHook, HookContext};
use crate::debug_log;
use crate::error::{LiveError, LiveResult};

/// Where a binding is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingPhase {
	/// Bound, `create` not yet run.
	Pending,
	/// `create` ran; `update` may run.
	Mounted,
	/// `destroy` ran or the binding was discarded before mounting.
	Destroyed,
}

/// One hook instance bound to one element.
///
/// Dropping a binding destroys it.
pub struct HookBinding {
	name: String,
	hook: Box<dyn ClientHook>,
	ctx: HookContext,
	phase: BindingPhase,
}

impl fmt::Debug for HookBinding {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("HookBinding")
			.field("name", &self.name)
			.field("binding", &self.ctx.binding_id())
			.field("phase", &self.phase)
			.finish()
	}
}

impl HookBinding {
	/// Creates a pending binding.
	pub fn new(name: impl Into<String>, hook: Box<dyn ClientHook>, ctx: HookContext) -> Self {
		Self {
			name: name.into(),
			hook,
			ctx,
			phase: BindingPhase::Pending,
		}
	}

	/// Hook name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Current phase.
	pub fn phase(&self) -> BindingPhase {
		self.phase
	}

	/// The binding's context.
	pub fn context(&self) -> &HookContext {
		&self.ctx
	}

	/// Runs `create`. Only valid once, from [`BindingPhase::Pending`].
	///
	/// The binding counts as mounted even when `create` fails, so `destroy`
	/// still releases whatever was registered before the failure.
	pub fn mount(&mut self) -> LiveResult<()> {
		if self.phase != BindingPhase::Pending {
			return Err(LiveError::lifecycle(&self.name, "create"));
		}
		self.phase = BindingPhase::Mounted;
		debug_log!("hook {} mounted on binding {}", self.name, self.ctx.binding_id());
		self.hook.create(&self.ctx)
	}

	/// Runs `update`. Only valid while mounted.
	pub fn update(&mut self) -> LiveResult<()> {
		if self.phase != BindingPhase::Mounted {
			return Err(LiveError::lifecycle(&self.name, "update"));
		}
		self.hook.update(&self.ctx)
	}

	/// Runs `destroy` if mounted and drops server-event handlers. Idempotent.
	pub fn destroy(&mut self) {
		match self.phase {
			BindingPhase::Mounted => {
				self.phase = BindingPhase::Destroyed;
				self.hook.destroy(&self.ctx);
				self.ctx.bridge.unsubscribe_all(self.ctx.binding_id());
				debug_log!("hook {} destroyed on binding {}", self.name, self.ctx.binding_id());
			}
			BindingPhase::Pending => self.phase = BindingPhase::Destroyed,
			BindingPhase::Destroyed => {}
		}
	}
}

impl Drop for HookBinding {
	fn drop(&mut self) {
		self.destroy();
	}
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
	use super::*;
	use crate::bridge::{BindingId, EventBridge};
	use crate::dom::Element;
	use crate::platform::HeadlessPlatform;
	use rstest::rstest;
	use std::cell::RefCell;
	use std::rc::Rc;

	struct Recorder(Rc<RefCell<Vec<&'static str>>>);

	impl ClientHook for Recorder {
		fn create(&mut self, ctx: &HookContext) -> LiveResult<()> {
			ctx.handle_event("ping", |_| {});
			self.0.borrow_mut().push("create");
			Ok(())
		}

		fn update(&mut self, _ctx: &HookContext) -> LiveResult<()> {
			self.0.borrow_mut().push("update");
			Ok(())
		}

		fn destroy(&mut self, _ctx: &HookContext) {
			self.0.borrow_mut().push("destroy");
		}
	}

	fn binding(log: &Rc<RefCell<Vec<&'static str>>>) -> (HookBinding, EventBridge) {
		let (bridge, _receiver) = EventBridge::new();
		let ctx = HookContext::new(
			Element::new("div"),
			BindingId(7),
			"Recorder",
			bridge.clone(),
			Rc::new(HeadlessPlatform::new()),
		);
		(
			HookBinding::new("Recorder", Box::new(Recorder(Rc::clone(log))), ctx),
			bridge,
		)
	}

	#[rstest]
	fn test_full_lifecycle_order() {
		let log = Rc::new(RefCell::new(Vec::new()));
		let (mut binding, bridge) = binding(&log);
		binding.mount().unwrap();
		binding.update().unwrap();
		binding.update().unwrap();
		assert_eq!(bridge.handler_count(BindingId(7)), 1);
		binding.destroy();
		binding.destroy();
		drop(binding);

		assert_eq!(*log.borrow(), vec!["create", "update", "update", "destroy"]);
		assert_eq!(bridge.handler_count(BindingId(7)), 0);
	}

	#[rstest]
	fn test_update_before_create_is_rejected() {
		let log = Rc::new(RefCell::new(Vec::new()));
		let (mut binding, _bridge) = binding(&log);
		let err = binding.update().unwrap_err();
		assert!(matches!(err, LiveError::Lifecycle { .. }));
		assert!(log.borrow().is_empty());
	}

	#[rstest]
	fn test_second_mount_is_rejected() {
		let log = Rc::new(RefCell::new(Vec::new()));
		let (mut binding, _bridge) = binding(&log);
		binding.mount().unwrap();
		assert!(binding.mount().is_err());
		binding.destroy();
		assert!(binding.update().is_err());
		assert_eq!(*log.borrow(), vec!["create", "destroy"]);
	}

	#[rstest]
	fn test_unmounted_binding_never_destroys_hook() {
		let log = Rc::new(RefCell::new(Vec::new()));
		let (binding, _bridge) = binding(&log);
		drop(binding);
		assert!(log.borrow().is_empty());
	}
}
