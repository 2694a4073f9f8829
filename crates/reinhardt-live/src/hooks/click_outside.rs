use serde_json::json;

use super::{ClientHook, HookContext};
use crate::dom::EventHandle;
use crate::error::LiveResult;
use crate::warn_log;

/// Pushes `click_outside` when a click lands anywhere outside the bound element.
///
/// The listener sits on the document; clicks on the element or any of its
/// descendants are ignored.
#[derive(Debug, Default)]
pub struct ClickOutside {
	listener: Option<EventHandle>,
}

impl ClientHook for ClickOutside {
	fn create(&mut self, ctx: &HookContext) -> LiveResult<()> {
		let element = ctx.element().clone();
		let emitter = ctx.emitter();
		self.listener = Some(ctx.document().add_event_listener("click", move |event| {
			let inside = event.target().is_some_and(|target| element.contains(&target));
			if inside {
				return;
			}
			if let Err(err) = emitter.push_event("click_outside", json!({})) {
				warn_log!("click_outside not delivered: {}", err);
			}
		}));
		Ok(())
	}

	fn destroy(&mut self, _ctx: &HookContext) {
		self.listener = None;
	}
}
