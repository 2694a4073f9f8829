use serde_json::json;

use super::{ClientHook, HookContext};
use crate::dom::EventHandle;
use crate::error::LiveResult;
use crate::warn_log;

/// Pushes `doubleclick` with an empty payload on every double click.
#[derive(Debug, Default)]
pub struct DoubleClick {
	listener: Option<EventHandle>,
}

impl ClientHook for DoubleClick {
	fn create(&mut self, ctx: &HookContext) -> LiveResult<()> {
		let emitter = ctx.emitter();
		self.listener = Some(ctx.element().add_event_listener("dblclick", move |_event| {
			if let Err(err) = emitter.push_event("doubleclick", json!({})) {
				warn_log!("doubleclick not delivered: {}", err);
			}
		}));
		Ok(())
	}

	fn destroy(&mut self, _ctx: &HookContext) {
		self.listener = None;
	}
}
