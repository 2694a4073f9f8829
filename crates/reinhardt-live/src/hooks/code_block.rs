use super::{ClientHook, HookContext};
use crate::error::LiveResult;

/// Attribute set on an element once it has been highlighted.
pub const HIGHLIGHTED_ATTR: &str = "data-highlighted";

/// Syntax-highlights the bound element on create and on every update.
///
/// An element whose text has not changed since the last pass is left alone,
/// so repeated updates never double-process the same content.
#[derive(Debug, Default)]
pub struct CodeBlock {
	highlighted_text: Option<String>,
}

impl CodeBlock {
	fn highlight(&mut self, ctx: &HookContext) -> LiveResult<()> {
		let element = ctx.element();
		let text = element.text_content();
		if element.has_attribute(HIGHLIGHTED_ATTR) && self.highlighted_text.as_deref() == Some(text.as_str()) {
			return Ok(());
		}
		ctx.platform().highlight_element(element);
		element.set_attribute(HIGHLIGHTED_ATTR, "yes")?;
		self.highlighted_text = Some(text);
		Ok(())
	}
}

impl ClientHook for CodeBlock {
	fn create(&mut self, ctx: &HookContext) -> LiveResult<()> {
		self.highlight(ctx)
	}

	fn update(&mut self, ctx: &HookContext) -> LiveResult<()> {
		self.highlight(ctx)
	}
}
