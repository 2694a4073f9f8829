//! In-memory DOM used on non-WASM targets.
//!
//! The tree is single-threaded (`Rc`/`RefCell`) like the browser main thread.
//! Event dispatch bubbles from the target through every ancestor up to the
//! document node, snapshotting listeners per node so handlers may add or
//! remove listeners while an event is in flight.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::EventHandle;
use crate::error::LiveResult;

type Handler = Rc<dyn Fn(&Event)>;

struct Listener {
	id: u64,
	event_type: String,
	handler: Handler,
}

struct NodeData {
	tag: String,
	attributes: Vec<(String, String)>,
	text: String,
	children: Vec<Element>,
	parent: Weak<RefCell<NodeData>>,
	listeners: Vec<Listener>,
	next_listener: u64,
}

/// Handle to a headless DOM element. Clones refer to the same node.
#[derive(Clone)]
pub struct Element {
	node: Rc<RefCell<NodeData>>,
}

impl PartialEq for Element {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.node, &other.node)
	}
}

impl Eq for Element {}

impl fmt::Debug for Element {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let node = self.node.borrow();
		f.debug_struct("Element")
			.field("tag", &node.tag)
			.field("attributes", &node.attributes)
			.finish()
	}
}

impl Element {
	/// Creates a detached element.
	pub fn new(tag: impl Into<String>) -> Self {
		Self {
			node: Rc::new(RefCell::new(NodeData {
				tag: tag.into().to_ascii_lowercase(),
				attributes: Vec::new(),
				text: String::new(),
				children: Vec::new(),
				parent: Weak::new(),
				listeners: Vec::new(),
				next_listener: 0,
			})),
		}
	}

	/// Lowercase tag name.
	pub fn tag_name(&self) -> String {
		self.node.borrow().tag.clone()
	}

	/// Returns the value of an attribute.
	pub fn get_attribute(&self, name: &str) -> Option<String> {
		self.node
			.borrow()
			.attributes
			.iter()
			.find(|(key, _)| key == name)
			.map(|(_, value)| value.clone())
	}

	/// Returns true if the attribute is present.
	pub fn has_attribute(&self, name: &str) -> bool {
		self.node
			.borrow()
			.attributes
			.iter()
			.any(|(key, _)| key == name)
	}

	/// Sets an attribute, keeping its original position when it already exists.
	pub fn set_attribute(&self, name: &str, value: &str) -> LiveResult<()> {
		let mut node = self.node.borrow_mut();
		match node.attributes.iter().position(|(key, _)| key == name) {
			Some(index) => node.attributes[index].1 = value.to_string(),
			None => node
				.attributes
				.push((name.to_string(), value.to_string())),
		}
		Ok(())
	}

	/// Removes an attribute if present.
	pub fn remove_attribute(&self, name: &str) -> LiveResult<()> {
		self.node
			.borrow_mut()
			.attributes
			.retain(|(key, _)| key != name);
		Ok(())
	}

	/// All attributes as `(name, value)` pairs in document order.
	pub fn attributes(&self) -> Vec<(String, String)> {
		self.node.borrow().attributes.clone()
	}

	/// Adds a class to the `class` attribute.
	pub fn add_class(&self, class: &str) -> LiveResult<()> {
		if self.has_class(class) {
			return Ok(());
		}
		let classes = match self.get_attribute("class") {
			Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing.trim(), class),
			_ => class.to_string(),
		};
		self.set_attribute("class", &classes)
	}

	/// Removes a class from the `class` attribute.
	pub fn remove_class(&self, class: &str) -> LiveResult<()> {
		let Some(existing) = self.get_attribute("class") else {
			return Ok(());
		};
		let remaining: Vec<&str> = existing
			.split_whitespace()
			.filter(|name| *name != class)
			.collect();
		self.set_attribute("class", &remaining.join(" "))
	}

	/// Returns true if the class is present.
	pub fn has_class(&self, class: &str) -> bool {
		self.get_attribute("class")
			.is_some_and(|classes| classes.split_whitespace().any(|name| name == class))
	}

	/// Concatenated text of this node and its descendants.
	pub fn text_content(&self) -> String {
		let node = self.node.borrow();
		let mut text = node.text.clone();
		for child in &node.children {
			text.push_str(&child.text_content());
		}
		text
	}

	/// Replaces all children with a single run of text.
	pub fn set_text_content(&self, text: &str) {
		let children = std::mem::take(&mut self.node.borrow_mut().children);
		for child in children {
			child.node.borrow_mut().parent = Weak::new();
		}
		self.node.borrow_mut().text = text.to_string();
	}

	/// Appends `child`, detaching it from any previous parent.
	pub fn append_child(&self, child: &Element) -> LiveResult<()> {
		child.remove();
		child.node.borrow_mut().parent = Rc::downgrade(&self.node);
		self.node.borrow_mut().children.push(child.clone());
		Ok(())
	}

	/// Detaches this element from its parent.
	pub fn remove(&self) {
		let parent = self.node.borrow().parent.upgrade();
		if let Some(parent) = parent {
			parent
				.borrow_mut()
				.children
				.retain(|child| !Rc::ptr_eq(&child.node, &self.node));
		}
		self.node.borrow_mut().parent = Weak::new();
	}

	/// The parent node, if attached.
	pub fn parent_element(&self) -> Option<Element> {
		self.node
			.borrow()
			.parent
			.upgrade()
			.map(|node| Element { node })
	}

	/// Direct children.
	pub fn children(&self) -> Vec<Element> {
		self.node.borrow().children.clone()
	}

	/// The first child element.
	pub fn first_element_child(&self) -> Option<Element> {
		self.node.borrow().children.first().cloned()
	}

	/// Inclusive containment, like `Node.contains`.
	pub fn contains(&self, other: &Element) -> bool {
		let mut current = Some(other.clone());
		while let Some(element) = current {
			if element == *self {
				return true;
			}
			current = element.parent_element();
		}
		false
	}

	/// Descendants carrying `attribute`, in document order (self excluded).
	pub fn elements_with_attribute(&self, attribute: &str) -> Vec<Element> {
		let mut found = Vec::new();
		self.collect_descendants(&mut |element: &Element| element.has_attribute(attribute), &mut found);
		found
	}

	/// The first descendant whose `id` attribute equals `id`.
	pub fn element_by_id(&self, id: &str) -> Option<Element> {
		let mut found = Vec::new();
		self.collect_descendants(
			&mut |element: &Element| element.get_attribute("id").as_deref() == Some(id),
			&mut found,
		);
		found.into_iter().next()
	}

	fn collect_descendants(&self, predicate: &mut dyn FnMut(&Element) -> bool, out: &mut Vec<Element>) {
		for child in self.children() {
			if predicate(&child) {
				out.push(child.clone());
			}
			child.collect_descendants(predicate, out);
		}
	}

	/// Registers a listener; dropping the returned handle removes it.
	pub fn add_event_listener(&self, event_type: &str, handler: impl Fn(&Event) + 'static) -> EventHandle {
		let id = {
			let mut node = self.node.borrow_mut();
			let id = node.next_listener;
			node.next_listener += 1;
			node.listeners.push(Listener {
				id,
				event_type: event_type.to_string(),
				handler: Rc::new(handler),
			});
			id
		};
		let weak = Rc::downgrade(&self.node);
		EventHandle::new(move || {
			if let Some(node) = weak.upgrade() {
				node.borrow_mut().listeners.retain(|listener| listener.id != id);
			}
		})
	}

	/// Number of listeners registered for `event_type` on this node.
	pub fn listener_count(&self, event_type: &str) -> usize {
		self.node
			.borrow()
			.listeners
			.iter()
			.filter(|listener| listener.event_type == event_type)
			.count()
	}

	/// Dispatches a bubbling event with this element as target.
	pub fn dispatch_event(&self, event_type: &str) {
		let event = Event {
			event_type: event_type.to_string(),
			target: self.clone(),
		};
		let mut current = Some(self.clone());
		while let Some(element) = current {
			let handlers: Vec<Handler> = element
				.node
				.borrow()
				.listeners
				.iter()
				.filter(|listener| listener.event_type == event_type)
				.map(|listener| Rc::clone(&listener.handler))
				.collect();
			for handler in handlers {
				handler(&event);
			}
			current = element.parent_element();
		}
	}

	/// Dispatches a `click` event.
	pub fn click(&self) {
		self.dispatch_event("click");
	}

	/// Dispatches a `dblclick` event.
	pub fn double_click(&self) {
		self.dispatch_event("dblclick");
	}
}

/// A dispatched event.
#[derive(Clone, Debug)]
pub struct Event {
	event_type: String,
	target: Element,
}

impl Event {
	/// The event type, e.g. `"click"`.
	pub fn event_type(&self) -> String {
		self.event_type.clone()
	}

	/// The element the event was dispatched on.
	pub fn target(&self) -> Option<Element> {
		Some(self.target.clone())
	}
}

/// Headless document: a `#document` node holding `<html>`, `<head>` and `<body>`.
#[derive(Clone, Debug)]
pub struct Document {
	node: Element,
	html: Element,
	head: Element,
	body: Element,
}

impl Default for Document {
	fn default() -> Self {
		Self::new()
	}
}

impl Document {
	/// Creates an empty document.
	pub fn new() -> Self {
		let node = Element::new("#document");
		let html = Element::new("html");
		let head = Element::new("head");
		let body = Element::new("body");
		// Appending to fresh nodes cannot fail.
		let _ = html.append_child(&head);
		let _ = html.append_child(&body);
		let _ = node.append_child(&html);
		Self {
			node,
			html,
			head,
			body,
		}
	}

	/// The `<html>` element.
	pub fn document_element(&self) -> Option<Element> {
		Some(self.html.clone())
	}

	/// The `<head>` element.
	pub fn head(&self) -> Option<Element> {
		Some(self.head.clone())
	}

	/// The `<body>` element.
	pub fn body(&self) -> Option<Element> {
		Some(self.body.clone())
	}

	/// Creates a detached element.
	pub fn create_element(&self, tag: &str) -> LiveResult<Element> {
		Ok(Element::new(tag))
	}

	/// Looks up an element by id.
	pub fn element_by_id(&self, id: &str) -> Option<Element> {
		self.node.element_by_id(id)
	}

	/// The first `<meta name="{name}">` element.
	pub fn meta_element(&self, name: &str) -> Option<Element> {
		self.node
			.elements_with_attribute("name")
			.into_iter()
			.find(|element| element.tag_name() == "meta" && element.get_attribute("name").as_deref() == Some(name))
	}

	/// Content of `<meta name="{name}" content="...">`.
	pub fn meta_content(&self, name: &str) -> Option<String> {
		self.meta_element(name)?.get_attribute("content")
	}

	/// Registers a document-level listener; events from every element bubble here.
	pub fn add_event_listener(&self, event_type: &str, handler: impl Fn(&Event) + 'static) -> EventHandle {
		self.node.add_event_listener(event_type, handler)
	}

	/// Number of document-level listeners for `event_type`.
	pub fn listener_count(&self, event_type: &str) -> usize {
		self.node.listener_count(event_type)
	}
}
