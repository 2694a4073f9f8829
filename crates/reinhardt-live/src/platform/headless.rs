//! Deterministic platform for non-WASM targets.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use super::{FlagCallback, Platform};
use crate::dom::{Document, Element, EventHandle};
use crate::error::LiveResult;

struct Timer {
	id: u64,
	due: u64,
	callback: Box<dyn FnOnce()>,
}

struct Observer {
	id: u64,
	element: Element,
	callback: FlagCallback,
}

struct State {
	document: Document,
	pathname: RefCell<String>,
	storage: RefCell<HashMap<String, String>>,
	prefers_dark: Cell<bool>,
	color_listeners: RefCell<Vec<(u64, FlagCallback)>>,
	timers: RefCell<Vec<Timer>>,
	observers: RefCell<Vec<Observer>>,
	highlighted: RefCell<Vec<Element>>,
	highlight_all_calls: Cell<usize>,
	now_ms: Cell<u64>,
	next_id: Cell<u64>,
}

impl State {
	fn next_id(&self) -> u64 {
		let id = self.next_id.get();
		self.next_id.set(id + 1);
		id
	}
}

/// In-memory [`Platform`] with a manual clock and synthetic notifications.
///
/// Clones share state, so a test can keep one handle while the code under
/// test owns another as `Rc<dyn Platform>`.
///
/// ```ignore
/// let platform = HeadlessPlatform::new().with_pathname("/docs/intro");
/// platform.set_meta("csrf-token", "secret");
/// platform.emit_color_scheme_change(true);
/// platform.advance_time(100);
/// ```
#[derive(Clone)]
pub struct HeadlessPlatform {
	state: Rc<State>,
}

impl Default for HeadlessPlatform {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for HeadlessPlatform {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("HeadlessPlatform")
			.field("pathname", &self.state.pathname.borrow())
			.field("prefers_dark", &self.state.prefers_dark.get())
			.field("now_ms", &self.state.now_ms.get())
			.finish()
	}
}

impl HeadlessPlatform {
	/// Creates a platform with an empty document at path `/`.
	pub fn new() -> Self {
		Self {
			state: Rc::new(State {
				document: Document::new(),
				pathname: RefCell::new("/".to_string()),
				storage: RefCell::new(HashMap::new()),
				prefers_dark: Cell::new(false),
				color_listeners: RefCell::new(Vec::new()),
				timers: RefCell::new(Vec::new()),
				observers: RefCell::new(Vec::new()),
				highlighted: RefCell::new(Vec::new()),
				highlight_all_calls: Cell::new(0),
				now_ms: Cell::new(0),
				next_id: Cell::new(0),
			}),
		}
	}

	/// Sets the current path.
	pub fn with_pathname(self, pathname: &str) -> Self {
		self.set_pathname(pathname);
		self
	}

	/// Sets the current path.
	pub fn set_pathname(&self, pathname: &str) {
		*self.state.pathname.borrow_mut() = pathname.to_string();
	}

	/// Adds `<meta name="{name}" content="{content}">` to `<head>`.
	pub fn set_meta(&self, name: &str, content: &str) -> LiveResult<Element> {
		let document = &self.state.document;
		let meta = document.create_element("meta")?;
		meta.set_attribute("name", name)?;
		meta.set_attribute("content", content)?;
		if let Some(head) = document.head() {
			head.append_child(&meta)?;
		}
		Ok(meta)
	}

	/// Sets the OS preference without notifying listeners.
	pub fn set_prefers_dark(&self, dark: bool) {
		self.state.prefers_dark.set(dark);
	}

	/// Changes the OS preference and notifies every active listener.
	///
	/// Returns the number of listeners that were invoked.
	pub fn emit_color_scheme_change(&self, dark: bool) -> usize {
		self.state.prefers_dark.set(dark);
		let listeners: Vec<FlagCallback> = self
			.state
			.color_listeners
			.borrow()
			.iter()
			.map(|(_, callback)| Rc::clone(callback))
			.collect();
		for callback in &listeners {
			callback(dark);
		}
		listeners.len()
	}

	/// Number of active color-scheme listeners.
	pub fn color_scheme_listener_count(&self) -> usize {
		self.state.color_listeners.borrow().len()
	}

	/// Advances the clock, running due timers in order.
	pub fn advance_time(&self, ms: u64) {
		let target = self.state.now_ms.get() + ms;
		loop {
			let next = {
				let mut timers = self.state.timers.borrow_mut();
				let index = timers
					.iter()
					.enumerate()
					.filter(|(_, timer)| timer.due <= target)
					.min_by_key(|(_, timer)| (timer.due, timer.id))
					.map(|(index, _)| index);
				index.map(|index| timers.remove(index))
			};
			let Some(timer) = next else {
				break;
			};
			self.state.now_ms.set(timer.due);
			(timer.callback)();
		}
		self.state.now_ms.set(target);
	}

	/// Number of timers that have not fired or been cancelled.
	pub fn pending_timers(&self) -> usize {
		self.state.timers.borrow().len()
	}

	/// Reports a visibility change for `element`.
	///
	/// Returns the number of observers that were invoked.
	pub fn set_visibility(&self, element: &Element, visible: bool) -> usize {
		let callbacks: Vec<FlagCallback> = self
			.state
			.observers
			.borrow()
			.iter()
			.filter(|observer| observer.element == *element)
			.map(|observer| Rc::clone(&observer.callback))
			.collect();
		for callback in &callbacks {
			callback(visible);
		}
		callbacks.len()
	}

	/// Number of active visibility observers.
	pub fn observer_count(&self) -> usize {
		self.state.observers.borrow().len()
	}

	/// How many times `element` was passed to the highlighter.
	pub fn highlight_count(&self, element: &Element) -> usize {
		self.state
			.highlighted
			.borrow()
			.iter()
			.filter(|highlighted| *highlighted == element)
			.count()
	}

	/// How many times the whole page was highlighted.
	pub fn highlight_all_count(&self) -> usize {
		self.state.highlight_all_calls.get()
	}

	fn release_with<F>(&self, release: F) -> EventHandle
	where
		F: FnOnce(&State) + 'static,
	{
		let weak: Weak<State> = Rc::downgrade(&self.state);
		EventHandle::new(move || {
			if let Some(state) = weak.upgrade() {
				release(&state);
			}
		})
	}
}

impl Platform for HeadlessPlatform {
	fn document(&self) -> Document {
		self.state.document.clone()
	}

	fn pathname(&self) -> String {
		self.state.pathname.borrow().clone()
	}

	fn storage_get(&self, key: &str) -> Option<String> {
		self.state.storage.borrow().get(key).cloned()
	}

	fn storage_set(&self, key: &str, value: &str) -> LiveResult<()> {
		self.state
			.storage
			.borrow_mut()
			.insert(key.to_string(), value.to_string());
		Ok(())
	}

	fn storage_remove(&self, key: &str) -> LiveResult<()> {
		self.state.storage.borrow_mut().remove(key);
		Ok(())
	}

	fn prefers_dark(&self) -> bool {
		self.state.prefers_dark.get()
	}

	fn on_color_scheme_change(&self, callback: FlagCallback) -> EventHandle {
		let id = self.state.next_id();
		self.state.color_listeners.borrow_mut().push((id, callback));
		self.release_with(move |state| {
			state
				.color_listeners
				.borrow_mut()
				.retain(|(listener_id, _)| *listener_id != id);
		})
	}

	fn set_timeout(&self, delay_ms: u32, callback: Box<dyn FnOnce()>) -> EventHandle {
		let id = self.state.next_id();
		let due = self.state.now_ms.get() + u64::from(delay_ms);
		self.state.timers.borrow_mut().push(Timer { id, due, callback });
		self.release_with(move |state| {
			let cancelled: Vec<Timer> = {
				let mut timers = state.timers.borrow_mut();
				let (cancelled, kept): (Vec<Timer>, Vec<Timer>) =
					timers.drain(..).partition(|timer| timer.id == id);
				*timers = kept;
				cancelled
			};
			drop(cancelled);
		})
	}

	fn observe_visibility(&self, element: &Element, callback: FlagCallback) -> EventHandle {
		let id = self.state.next_id();
		self.state.observers.borrow_mut().push(Observer {
			id,
			element: element.clone(),
			callback,
		});
		self.release_with(move |state| {
			state
				.observers
				.borrow_mut()
				.retain(|observer| observer.id != id);
		})
	}

	fn highlight_element(&self, element: &Element) {
		self.state.highlighted.borrow_mut().push(element.clone());
		// highlight.js tags every element it processes
		let _ = element.add_class("hljs");
	}

	fn highlight_all(&self) {
		self.state
			.highlight_all_calls
			.set(self.state.highlight_all_calls.get() + 1);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_timers_fire_in_due_order() {
		let platform = HeadlessPlatform::new();
		let order = Rc::new(RefCell::new(Vec::new()));
		let _late = platform.set_timeout(100, {
			let order = Rc::clone(&order);
			Box::new(move || order.borrow_mut().push("late"))
		});
		let _early = platform.set_timeout(0, {
			let order = Rc::clone(&order);
			Box::new(move || order.borrow_mut().push("early"))
		});

		platform.advance_time(50);
		assert_eq!(*order.borrow(), vec!["early"]);
		platform.advance_time(50);
		assert_eq!(*order.borrow(), vec!["early", "late"]);
		assert_eq!(platform.pending_timers(), 0);
	}

	#[rstest]
	fn test_dropping_timer_handle_cancels() {
		let platform = HeadlessPlatform::new();
		let fired = Rc::new(Cell::new(false));
		let handle = platform.set_timeout(10, {
			let fired = Rc::clone(&fired);
			Box::new(move || fired.set(true))
		});
		drop(handle);
		platform.advance_time(20);
		assert!(!fired.get());
	}

	#[rstest]
	fn test_color_scheme_listener_lifecycle() {
		let platform = HeadlessPlatform::new();
		let handle = platform.on_color_scheme_change(Rc::new(|_| {}));
		assert_eq!(platform.color_scheme_listener_count(), 1);
		assert_eq!(platform.emit_color_scheme_change(true), 1);
		assert!(platform.prefers_dark());
		drop(handle);
		assert_eq!(platform.emit_color_scheme_change(false), 0);
	}

	#[rstest]
	fn test_storage_round_trip() {
		let platform = HeadlessPlatform::new();
		platform.storage_set("theme", "dark").unwrap();
		assert_eq!(platform.storage_get("theme").as_deref(), Some("dark"));
		platform.storage_remove("theme").unwrap();
		assert_eq!(platform.storage_get("theme"), None);
	}
}
