//! Per-connection event bridge between hooks and the server.
//!
//! Upward traffic (`pushEvent`) is queued on an unbounded FIFO channel whose
//! receiver belongs to the transport; nothing is delivered synchronously.
//! Downward traffic (`handleEvent`) is a registry of handlers keyed by binding
//! and event name, cleared when the binding is destroyed.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};
use serde::Serialize;
use serde_json::Value;

use crate::error::{LiveError, LiveResult};

/// Identifier of one hook binding within a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct BindingId(pub u64);

impl fmt::Display for BindingId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// An event pushed by a hook, waiting for the transport.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundEvent {
	/// Binding that pushed the event.
	pub binding: BindingId,
	/// Name of the hook that pushed the event.
	pub hook: String,
	/// Event name.
	pub name: String,
	/// JSON payload.
	pub payload: Value,
}

/// Handler for a server-pushed event.
pub type ServerEventHandler = Rc<dyn Fn(&Value)>;

type HandlerMap = HashMap<BindingId, Vec<(String, ServerEventHandler)>>;

/// Shared bridge state of one connection.
#[derive(Clone)]
pub struct EventBridge {
	sender: UnboundedSender<OutboundEvent>,
	handlers: Rc<RefCell<HandlerMap>>,
}

impl fmt::Debug for EventBridge {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EventBridge")
			.field("closed", &self.sender.is_closed())
			.field("bindings", &self.handlers.borrow().len())
			.finish()
	}
}

impl EventBridge {
	/// Creates a bridge and the receiver the transport drains.
	pub fn new() -> (Self, UnboundedReceiver<OutboundEvent>) {
		let (sender, receiver) = unbounded();
		(
			Self {
				sender,
				handlers: Rc::new(RefCell::new(HashMap::new())),
			},
			receiver,
		)
	}

	/// Creates the upward half for one binding.
	pub fn emitter(&self, binding: BindingId, hook: impl Into<String>) -> EventEmitter {
		EventEmitter {
			sender: self.sender.clone(),
			binding,
			hook: hook.into(),
		}
	}

	/// Registers a handler for a server-pushed event scoped to `binding`.
	pub fn subscribe(&self, binding: BindingId, name: impl Into<String>, handler: ServerEventHandler) {
		self.handlers
			.borrow_mut()
			.entry(binding)
			.or_default()
			.push((name.into(), handler));
	}

	/// Delivers a server-pushed event to the handlers of `binding`.
	///
	/// Returns the number of handlers invoked.
	pub fn dispatch(&self, binding: BindingId, name: &str, payload: &Value) -> usize {
		let handlers: Vec<ServerEventHandler> = self
			.handlers
			.borrow()
			.get(&binding)
			.map(|handlers| {
				handlers
					.iter()
					.filter(|(event, _)| event == name)
					.map(|(_, handler)| Rc::clone(handler))
					.collect()
			})
			.unwrap_or_default();
		for handler in &handlers {
			handler(payload);
		}
		handlers.len()
	}

	/// Drops every handler registered by `binding`.
	pub fn unsubscribe_all(&self, binding: BindingId) {
		let removed = self.handlers.borrow_mut().remove(&binding);
		drop(removed);
	}

	/// Number of handlers registered by `binding`.
	pub fn handler_count(&self, binding: BindingId) -> usize {
		self.handlers
			.borrow()
			.get(&binding)
			.map_or(0, Vec::len)
	}

	/// Closes the outbound channel; later pushes fail.
	pub fn close(&self) {
		self.sender.close_channel();
	}

	/// Returns true once the channel is closed.
	pub fn is_closed(&self) -> bool {
		self.sender.is_closed()
	}
}

/// Upward half of the bridge for one binding. Cheap to clone into listeners.
#[derive(Clone, Debug)]
pub struct EventEmitter {
	sender: UnboundedSender<OutboundEvent>,
	binding: BindingId,
	hook: String,
}

impl EventEmitter {
	/// Queues an event for the server.
	pub fn push_event(&self, name: &str, payload: impl Serialize) -> LiveResult<()> {
		let payload = serde_json::to_value(payload)?;
		self.sender
			.unbounded_send(OutboundEvent {
				binding: self.binding,
				hook: self.hook.clone(),
				name: name.to_string(),
				payload,
			})
			.map_err(|_| LiveError::Connection(format!("cannot push '{}': connection closed", name)))
	}

	/// The binding this emitter belongs to.
	pub fn binding(&self) -> BindingId {
		self.binding
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;
	use std::cell::Cell;

	#[rstest]
	fn test_push_preserves_fifo_order() {
		let (bridge, mut receiver) = EventBridge::new();
		let emitter = bridge.emitter(BindingId(1), "DoubleClick");
		emitter.push_event("first", json!({})).unwrap();
		emitter.push_event("second", 2).unwrap();

		let first = receiver.try_next().unwrap().unwrap();
		let second = receiver.try_next().unwrap().unwrap();
		assert_eq!(first.name, "first");
		assert_eq!(second.payload, json!(2));
		assert_eq!(second.hook, "DoubleClick");
	}

	#[rstest]
	fn test_push_after_close_fails() {
		let (bridge, _receiver) = EventBridge::new();
		let emitter = bridge.emitter(BindingId(1), "DarkMode");
		bridge.close();
		let err = emitter.push_event("set_mode", "dark").unwrap_err();
		assert!(matches!(err, LiveError::Connection(_)));
	}

	#[rstest]
	fn test_dispatch_is_scoped_to_binding_and_name() {
		let (bridge, _receiver) = EventBridge::new();
		let hits = Rc::new(Cell::new(0));
		bridge.subscribe(BindingId(1), "set_mode", {
			let hits = Rc::clone(&hits);
			Rc::new(move |_: &Value| hits.set(hits.get() + 1))
		});

		assert_eq!(bridge.dispatch(BindingId(2), "set_mode", &json!("dark")), 0);
		assert_eq!(bridge.dispatch(BindingId(1), "other", &json!(null)), 0);
		assert_eq!(bridge.dispatch(BindingId(1), "set_mode", &json!("dark")), 1);
		assert_eq!(hits.get(), 1);

		bridge.unsubscribe_all(BindingId(1));
		assert_eq!(bridge.handler_count(BindingId(1)), 0);
	}
}
