//! `web-sys` backed DOM handles for `wasm32` builds.

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::Closure;

use super::{EventHandle, css_string};
use crate::error::{LiveError, LiveResult};
use crate::warn_log;

fn js_error(err: wasm_bindgen::JsValue) -> LiveError {
	LiveError::Platform(format!("{:?}", err))
}

/// Registers `handler` on `target`; the closure lives as long as the handle.
fn listen(
	target: &web_sys::EventTarget,
	event_type: &str,
	handler: impl Fn(&Event) + 'static,
) -> EventHandle {
	let closure = Closure::<dyn FnMut(web_sys::Event)>::new(move |event: web_sys::Event| {
		handler(&Event { inner: event });
	});

	if let Err(err) =
		target.add_event_listener_with_callback(event_type, closure.as_ref().unchecked_ref())
	{
		warn_log!("failed to add '{}' listener: {:?}", event_type, err);
		return EventHandle::noop();
	}

	let target = target.clone();
	let event_type = event_type.to_string();
	EventHandle::new(move || {
		let _ = target
			.remove_event_listener_with_callback(&event_type, closure.as_ref().unchecked_ref());
		drop(closure);
	})
}

/// Wrapper around a `web_sys::Element`.
#[derive(Clone, Debug, PartialEq)]
pub struct Element {
	inner: web_sys::Element,
}

impl Element {
	/// Wraps a `web_sys::Element`.
	pub fn new(inner: web_sys::Element) -> Self {
		Self { inner }
	}

	/// The wrapped `web_sys::Element`.
	pub fn as_web_sys(&self) -> &web_sys::Element {
		&self.inner
	}

	/// Lowercase tag name.
	pub fn tag_name(&self) -> String {
		self.inner.tag_name().to_ascii_lowercase()
	}

	/// Returns the value of an attribute.
	pub fn get_attribute(&self, name: &str) -> Option<String> {
		self.inner.get_attribute(name)
	}

	/// Returns true if the attribute is present.
	pub fn has_attribute(&self, name: &str) -> bool {
		self.inner.has_attribute(name)
	}

	/// Sets an attribute.
	pub fn set_attribute(&self, name: &str, value: &str) -> LiveResult<()> {
		self.inner.set_attribute(name, value).map_err(js_error)
	}

	/// Removes an attribute if present.
	pub fn remove_attribute(&self, name: &str) -> LiveResult<()> {
		self.inner.remove_attribute(name).map_err(js_error)
	}

	/// All attributes as `(name, value)` pairs in document order.
	pub fn attributes(&self) -> Vec<(String, String)> {
		let map = self.inner.attributes();
		(0..map.length())
			.filter_map(|i| map.item(i))
			.map(|attr| (attr.name(), attr.value()))
			.collect()
	}

	/// Adds a class.
	pub fn add_class(&self, class: &str) -> LiveResult<()> {
		self.inner.class_list().add_1(class).map_err(js_error)
	}

	/// Removes a class.
	pub fn remove_class(&self, class: &str) -> LiveResult<()> {
		self.inner.class_list().remove_1(class).map_err(js_error)
	}

	/// Returns true if the class is present.
	pub fn has_class(&self, class: &str) -> bool {
		self.inner.class_list().contains(class)
	}

	/// Concatenated text of this node and its descendants.
	pub fn text_content(&self) -> String {
		self.inner.text_content().unwrap_or_default()
	}

	/// Replaces all children with a single run of text.
	pub fn set_text_content(&self, text: &str) {
		self.inner.set_text_content(Some(text));
	}

	/// Appends `child`.
	pub fn append_child(&self, child: &Element) -> LiveResult<()> {
		self.inner
			.append_child(&child.inner)
			.map(|_| ())
			.map_err(js_error)
	}

	/// Detaches this element from its parent.
	pub fn remove(&self) {
		self.inner.remove();
	}

	/// The parent element, if attached.
	pub fn parent_element(&self) -> Option<Element> {
		self.inner.parent_element().map(Element::new)
	}

	/// The first child element.
	pub fn first_element_child(&self) -> Option<Element> {
		self.inner.first_element_child().map(Element::new)
	}

	/// Inclusive containment, like `Node.contains`.
	pub fn contains(&self, other: &Element) -> bool {
		let node: &web_sys::Node = other.inner.as_ref();
		self.inner.contains(Some(node))
	}

	/// Descendants carrying `attribute`, in document order (self excluded).
	pub fn elements_with_attribute(&self, attribute: &str) -> Vec<Element> {
		let mut found = Vec::new();
		if let Ok(node_list) = self.inner.query_selector_all(&format!("[{}]", attribute)) {
			for i in 0..node_list.length() {
				if let Some(element) = node_list
					.item(i)
					.and_then(|node| node.dyn_into::<web_sys::Element>().ok())
				{
					found.push(Element::new(element));
				}
			}
		}
		found
	}

	/// The first descendant with the given id.
	pub fn element_by_id(&self, id: &str) -> Option<Element> {
		self.inner
			.query_selector(&format!("[id={}]", css_string(id)))
			.ok()
			.flatten()
			.map(Element::new)
	}

	/// Registers a listener; dropping the returned handle removes it.
	pub fn add_event_listener(
		&self,
		event_type: &str,
		handler: impl Fn(&Event) + 'static,
	) -> EventHandle {
		listen(self.inner.as_ref(), event_type, handler)
	}
}

/// Wrapper around a `web_sys::Event`.
#[derive(Clone, Debug)]
pub struct Event {
	inner: web_sys::Event,
}

impl Event {
	/// The event type, e.g. `"click"`.
	pub fn event_type(&self) -> String {
		self.inner.type_()
	}

	/// The element the event was dispatched on.
	pub fn target(&self) -> Option<Element> {
		self.inner
			.target()
			.and_then(|target| target.dyn_into::<web_sys::Element>().ok())
			.map(Element::new)
	}
}

/// Wrapper around the page's `web_sys::Document`.
#[derive(Clone, Debug)]
pub struct Document {
	inner: web_sys::Document,
}

impl Document {
	/// Wraps a `web_sys::Document`.
	pub fn new(inner: web_sys::Document) -> Self {
		Self { inner }
	}

	/// The current page's document.
	pub fn current() -> LiveResult<Self> {
		web_sys::window()
			.and_then(|window| window.document())
			.map(Self::new)
			.ok_or_else(|| LiveError::Platform("document not available".to_string()))
	}

	/// The `<html>` element.
	pub fn document_element(&self) -> Option<Element> {
		self.inner.document_element().map(Element::new)
	}

	/// The `<head>` element.
	pub fn head(&self) -> Option<Element> {
		self.inner.head().map(|head| Element::new(head.into()))
	}

	/// The `<body>` element.
	pub fn body(&self) -> Option<Element> {
		self.inner.body().map(|body| Element::new(body.into()))
	}

	/// Creates a detached element.
	pub fn create_element(&self, tag: &str) -> LiveResult<Element> {
		self.inner
			.create_element(tag)
			.map(Element::new)
			.map_err(js_error)
	}

	/// Looks up an element by id.
	pub fn element_by_id(&self, id: &str) -> Option<Element> {
		self.inner.get_element_by_id(id).map(Element::new)
	}

	/// The first `<meta name="{name}">` element.
	pub fn meta_element(&self, name: &str) -> Option<Element> {
		let selector = format!("meta[name={}]", css_string(name));
		self.inner.query_selector(&selector).ok().flatten().map(Element::new)
	}

	/// Content of `<meta name="{name}" content="...">`.
	pub fn meta_content(&self, name: &str) -> Option<String> {
		self.meta_element(name)?.get_attribute("content")
	}

	/// Registers a document-level listener.
	pub fn add_event_listener(
		&self,
		event_type: &str,
		handler: impl Fn(&Event) + 'static,
	) -> EventHandle {
		listen(self.inner.as_ref(), event_type, handler)
	}
}
