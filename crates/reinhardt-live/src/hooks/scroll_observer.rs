use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;

use super::{ClientHook, HookContext};
use crate::dom::EventHandle;
use crate::error::LiveResult;
use crate::warn_log;

/// Pushes `in_view` / `out_of_view` as the element crosses the viewport.
///
/// Observation starts `delay_ms` after create.
#[derive(Debug)]
pub struct ScrollObserver {
	delay_ms: u32,
	timer: Option<EventHandle>,
	observer: Rc<RefCell<Option<EventHandle>>>,
}

impl ScrollObserver {
	/// Creates the hook.
	pub fn new(delay_ms: u32) -> Self {
		Self {
			delay_ms,
			timer: None,
			observer: Rc::new(RefCell::new(None)),
		}
	}
}

impl ClientHook for ScrollObserver {
	fn create(&mut self, ctx: &HookContext) -> LiveResult<()> {
		let platform = Rc::downgrade(ctx.platform());
		let element = ctx.element().clone();
		let emitter = ctx.emitter();
		let slot = Rc::clone(&self.observer);
		self.timer = Some(ctx.platform().set_timeout(
			self.delay_ms,
			Box::new(move || {
				let Some(platform) = platform.upgrade() else {
					return;
				};
				let handle = platform.observe_visibility(
					&element,
					Rc::new(move |visible| {
						let name = if visible { "in_view" } else { "out_of_view" };
						if let Err(err) = emitter.push_event(name, Value::Null) {
							warn_log!("{} not delivered: {}", name, err);
						}
					}),
				);
				*slot.borrow_mut() = Some(handle);
			}),
		));
		Ok(())
	}

	fn destroy(&mut self, _ctx: &HookContext) {
		self.timer = None;
		let observer = self.observer.borrow_mut().take();
		drop(observer);
	}
}
