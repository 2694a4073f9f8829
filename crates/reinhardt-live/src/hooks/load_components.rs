use std::rc::Rc;

use super::{ClientHook, HookContext};
use crate::connection::ConnectionHandle;
use crate::discovery::ComponentLoader;
use crate::error::LiveResult;

/// Discovers component markers under the bound element and owns their
/// connections until destroyed.
#[derive(Debug)]
pub struct LoadComponents {
	loader: Rc<ComponentLoader>,
	connections: Vec<ConnectionHandle>,
}

impl LoadComponents {
	/// Creates the hook around a shared loader.
	pub fn new(loader: Rc<ComponentLoader>) -> Self {
		Self {
			loader,
			connections: Vec::new(),
		}
	}
}

impl ClientHook for LoadComponents {
	fn create(&mut self, ctx: &HookContext) -> LiveResult<()> {
		self.connections = self.loader.load(ctx.element(), &ctx.document())?;
		Ok(())
	}

	fn destroy(&mut self, _ctx: &HookContext) {
		for mut connection in self.connections.drain(..) {
			connection.close();
		}
	}
}
