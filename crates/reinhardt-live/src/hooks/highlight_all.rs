use std::rc::Rc;

use super::{ClientHook, HookContext};
use crate::dom::EventHandle;
use crate::error::LiveResult;

/// Highlights every code block on the page once, on the next tick after mount.
#[derive(Debug, Default)]
pub struct HighlightAll {
	pending: Option<EventHandle>,
}

impl ClientHook for HighlightAll {
	fn create(&mut self, ctx: &HookContext) -> LiveResult<()> {
		let platform = Rc::clone(ctx.platform());
		self.pending = Some(
			ctx.platform()
				.set_timeout(0, Box::new(move || platform.highlight_all())),
		);
		Ok(())
	}

	fn destroy(&mut self, _ctx: &HookContext) {
		self.pending = None;
	}
}
