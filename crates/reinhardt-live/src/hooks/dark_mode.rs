use super::{ClientHook, HookContext};
use crate::error::LiveResult;
use crate::theme::{ThemeController, ThemeMode};
use crate::warn_log;

/// Binds an element to the shared [`ThemeController`].
///
/// On create the effective mode is pushed as `set_mode` so the server can
/// render mode-dependent markup on first paint; server `set_mode` events are
/// applied and persisted like a local choice.
#[derive(Debug)]
pub struct DarkMode {
	theme: ThemeController,
	active: bool,
}

impl DarkMode {
	/// Creates the hook around the shared controller.
	pub fn new(theme: ThemeController) -> Self {
		Self { theme, active: false }
	}
}

impl ClientHook for DarkMode {
	fn create(&mut self, ctx: &HookContext) -> LiveResult<()> {
		self.active = true;
		self.theme.activate()?;
		ctx.push_event("set_mode", self.theme.current_mode().as_str())?;

		let theme = self.theme.clone();
		ctx.handle_event("set_mode", move |payload| match ThemeMode::from_payload(payload) {
			Some(mode) => {
				if let Err(err) = theme.set_mode(mode) {
					warn_log!("failed to apply theme '{}': {}", mode, err);
				}
			}
			None => warn_log!("ignoring set_mode payload {}", payload),
		});
		Ok(())
	}

	fn destroy(&mut self, _ctx: &HookContext) {
		if self.active {
			self.active = false;
			self.theme.deactivate();
		}
	}
}
