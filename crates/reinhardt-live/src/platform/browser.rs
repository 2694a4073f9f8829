//! Real browser services for `wasm32` builds.

use wasm_bindgen::prelude::*;
use wasm_bindgen::{JsCast, JsValue};

use super::{DARK_SCHEME_QUERY, FlagCallback, Platform};
use crate::dom::{Document, Element, EventHandle};
use crate::error::{LiveError, LiveResult};
use crate::warn_log;

#[wasm_bindgen]
extern "C" {
	#[wasm_bindgen(catch, js_namespace = hljs, js_name = highlightElement)]
	fn hljs_highlight_element(element: &web_sys::Element) -> Result<(), JsValue>;

	#[wasm_bindgen(catch, js_namespace = hljs, js_name = highlightAll)]
	fn hljs_highlight_all() -> Result<(), JsValue>;
}

/// [`Platform`] backed by `window`.
#[derive(Clone, Debug)]
pub struct BrowserPlatform {
	window: web_sys::Window,
	document: Document,
}

impl BrowserPlatform {
	/// Captures the current window and document.
	pub fn new() -> LiveResult<Self> {
		let window = web_sys::window()
			.ok_or_else(|| LiveError::Platform("window not available".to_string()))?;
		let document = window
			.document()
			.map(Document::new)
			.ok_or_else(|| LiveError::Platform("document not available".to_string()))?;
		Ok(Self { window, document })
	}

	fn local_storage(&self) -> LiveResult<web_sys::Storage> {
		self.window
			.local_storage()
			.ok()
			.flatten()
			.ok_or_else(|| LiveError::Platform("localStorage not available".to_string()))
	}

	fn dark_scheme_query(&self) -> Option<web_sys::MediaQueryList> {
		self.window.match_media(DARK_SCHEME_QUERY).ok().flatten()
	}
}

impl Platform for BrowserPlatform {
	fn document(&self) -> Document {
		self.document.clone()
	}

	fn pathname(&self) -> String {
		self.window
			.location()
			.pathname()
			.unwrap_or_else(|_| "/".to_string())
	}

	fn storage_get(&self, key: &str) -> Option<String> {
		self.local_storage().ok()?.get_item(key).ok().flatten()
	}

	fn storage_set(&self, key: &str, value: &str) -> LiveResult<()> {
		self.local_storage()?
			.set_item(key, value)
			.map_err(|err| LiveError::Platform(format!("{:?}", err)))
	}

	fn storage_remove(&self, key: &str) -> LiveResult<()> {
		self.local_storage()?
			.remove_item(key)
			.map_err(|err| LiveError::Platform(format!("{:?}", err)))
	}

	fn prefers_dark(&self) -> bool {
		self.dark_scheme_query()
			.map(|query| query.matches())
			.unwrap_or(false)
	}

	fn on_color_scheme_change(&self, callback: FlagCallback) -> EventHandle {
		let Some(query) = self.dark_scheme_query() else {
			return EventHandle::noop();
		};
		let closure = Closure::<dyn FnMut(web_sys::MediaQueryListEvent)>::new(
			move |event: web_sys::MediaQueryListEvent| callback(event.matches()),
		);
		if let Err(err) =
			query.add_event_listener_with_callback("change", closure.as_ref().unchecked_ref())
		{
			warn_log!("failed to watch {}: {:?}", DARK_SCHEME_QUERY, err);
			return EventHandle::noop();
		}
		EventHandle::new(move || {
			let _ = query
				.remove_event_listener_with_callback("change", closure.as_ref().unchecked_ref());
			drop(closure);
		})
	}

	fn set_timeout(&self, delay_ms: u32, callback: Box<dyn FnOnce()>) -> EventHandle {
		let closure: Closure<dyn FnMut()> = Closure::once(move || callback());
		let id = match self
			.window
			.set_timeout_with_callback_and_timeout_and_arguments_0(
				closure.as_ref().unchecked_ref(),
				i32::try_from(delay_ms).unwrap_or(i32::MAX),
			) {
			Ok(id) => id,
			Err(err) => {
				warn_log!("setTimeout failed: {:?}", err);
				return EventHandle::noop();
			}
		};
		let window = self.window.clone();
		EventHandle::new(move || {
			window.clear_timeout_with_handle(id);
			drop(closure);
		})
	}

	fn observe_visibility(&self, element: &Element, callback: FlagCallback) -> EventHandle {
		let closure = Closure::<dyn FnMut(js_sys::Array, web_sys::IntersectionObserver)>::new(
			move |entries: js_sys::Array, _observer: web_sys::IntersectionObserver| {
				for entry in entries.iter() {
					let entry: web_sys::IntersectionObserverEntry = entry.unchecked_into();
					callback(entry.is_intersecting());
				}
			},
		);
		let init = web_sys::IntersectionObserverInit::new();
		init.set_threshold(&JsValue::from_f64(0.0));
		let observer = match web_sys::IntersectionObserver::new_with_options(
			closure.as_ref().unchecked_ref(),
			&init,
		) {
			Ok(observer) => observer,
			Err(err) => {
				warn_log!("IntersectionObserver unavailable: {:?}", err);
				return EventHandle::noop();
			}
		};
		observer.observe(element.as_web_sys());
		EventHandle::new(move || {
			observer.disconnect();
			drop(closure);
		})
	}

	fn highlight_element(&self, element: &Element) {
		if let Err(err) = hljs_highlight_element(element.as_web_sys()) {
			warn_log!("hljs.highlightElement failed: {:?}", err);
		}
	}

	fn highlight_all(&self) {
		if let Err(err) = hljs_highlight_all() {
			warn_log!("hljs.highlightAll failed: {:?}", err);
		}
	}
}
