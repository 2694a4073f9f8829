//! Hook lifecycle and built-in hook behavior driven through connections.

#![cfg(not(target_arch = "wasm32"))]

use std::cell::RefCell;
use std::rc::Rc;

use futures::channel::mpsc::UnboundedReceiver;
use reinhardt_live::hooks::{BindingPhase, HIGHLIGHTED_ATTR};
use reinhardt_live::testing::{TestPage, drain_outbound};
use reinhardt_live::{
	ClientHook, ConnectOptions, ConnectionHandle, Connector, Element, HookContext, HookDefinition, HookTable,
	LiveError, LiveResult, OutboundEvent, Platform,
};
use rstest::{fixture, rstest};
use serde_json::{Value, json};

type Log = Rc<RefCell<Vec<String>>>;

struct Recorder {
	log: Log,
}

impl ClientHook for Recorder {
	fn create(&mut self, ctx: &HookContext) -> LiveResult<()> {
		let log = Rc::clone(&self.log);
		ctx.handle_event("server_ping", move |_| log.borrow_mut().push("server_ping".to_string()));
		self.log.borrow_mut().push("create".to_string());
		Ok(())
	}

	fn update(&mut self, _ctx: &HookContext) -> LiveResult<()> {
		self.log.borrow_mut().push("update".to_string());
		Ok(())
	}

	fn destroy(&mut self, _ctx: &HookContext) {
		self.log.borrow_mut().push("destroy".to_string());
	}
}

#[fixture]
fn page() -> TestPage {
	TestPage::new().with_token("secret").unwrap()
}

fn connect(page: &TestPage, hooks: HookTable) -> (ConnectionHandle, UnboundedReceiver<OutboundEvent>) {
	let options = ConnectOptions::new("secret", page.body().unwrap()).with_hooks(hooks);
	let mut connection = page.connector.connect("/connect", options).unwrap();
	let outbound = connection.take_outbound().unwrap();
	(connection, outbound)
}

fn recorder_table(log: &Log) -> HookTable {
	let log = Rc::clone(log);
	HookTable::new().with(
		"Recorder",
		HookDefinition::custom(move || Recorder { log: Rc::clone(&log) }),
	)
}

#[rstest]
fn test_lifecycle_order_through_connection(page: TestPage) {
	let log: Log = Rc::default();
	let (mut connection, _outbound) = connect(&page, recorder_table(&log));
	let element = page.add_element("div", "bound").unwrap();

	let id = connection.bind_hook(&element, "Recorder").unwrap();
	assert_eq!(connection.patch(&element).unwrap(), 1);
	connection.update_hook(id).unwrap();
	assert_eq!(connection.dispatch(id, "server_ping", &Value::Null), 1);
	assert_eq!(connection.remove_subtree(&element), 1);

	// nothing reaches a destroyed binding
	assert_eq!(connection.dispatch(id, "server_ping", &Value::Null), 0);
	assert!(matches!(connection.update_hook(id), Err(LiveError::Lifecycle { .. })));
	connection.close();

	assert_eq!(
		*log.borrow(),
		vec!["create", "update", "update", "server_ping", "destroy"]
	);
	assert!(element.parent_element().is_none());
}

#[rstest]
fn test_close_destroys_every_binding_once(page: TestPage) {
	let log: Log = Rc::default();
	let (mut connection, _outbound) = connect(&page, recorder_table(&log));
	let a = connection.bind_hook(&Element::new("div"), "Recorder").unwrap();
	connection.bind_hook(&Element::new("div"), "Recorder").unwrap();
	assert_eq!(connection.binding_phase(a), Some(BindingPhase::Mounted));

	drop(connection);
	let destroys = log.borrow().iter().filter(|entry| *entry == "destroy").count();
	assert_eq!(destroys, 2);
}

#[rstest]
fn test_code_block_update_is_idempotent(page: TestPage) {
	let (mut connection, _outbound) = connect(&page, HookTable::components());
	let code = page.add_element("pre", "code").unwrap();
	code.set_text_content("let x = 1;");

	let id = connection.bind_hook(&code, "CodeBlock").unwrap();
	connection.update_hook(id).unwrap();
	let after_one = (code.attributes(), page.platform.highlight_count(&code));
	connection.update_hook(id).unwrap();
	let after_two = (code.attributes(), page.platform.highlight_count(&code));

	assert_eq!(after_one, after_two);
	assert_eq!(page.platform.highlight_count(&code), 1);
	assert_eq!(code.get_attribute(HIGHLIGHTED_ATTR).as_deref(), Some("yes"));
	assert_eq!(code.get_attribute("class").as_deref(), Some("hljs"));
}

#[rstest]
fn test_click_outside_uses_containment(page: TestPage) {
	let (mut connection, mut outbound) =
		connect(&page, HookTable::new().with("ClickOutside", HookDefinition::ClickOutside));
	let menu = page.add_element("div", "menu").unwrap();
	let item = Element::new("button");
	menu.append_child(&item).unwrap();
	let other = page.add_element("div", "other").unwrap();

	connection.bind_hook(&menu, "ClickOutside").unwrap();

	menu.click();
	item.click();
	assert!(drain_outbound(&mut outbound).is_empty());

	other.click();
	page.body().unwrap().click();
	let events = drain_outbound(&mut outbound);
	assert_eq!(events.len(), 2);
	assert!(
		events
			.iter()
			.all(|event| event.name == "click_outside" && event.payload == json!({}))
	);
}

#[rstest]
fn test_click_outside_instances_are_scoped(page: TestPage) {
	let (mut connection, mut outbound) =
		connect(&page, HookTable::new().with("ClickOutside", HookDefinition::ClickOutside));
	let left = page.add_element("div", "left").unwrap();
	let right = page.add_element("div", "right").unwrap();
	let left_id = connection.bind_hook(&left, "ClickOutside").unwrap();
	let right_id = connection.bind_hook(&right, "ClickOutside").unwrap();

	left.click();
	let events = drain_outbound(&mut outbound);
	assert_eq!(events.len(), 1);
	assert_eq!(events[0].binding, right_id);

	connection.unbind_hook(right_id);
	connection.unbind_hook(left_id);
	assert_eq!(page.platform.document().listener_count("click"), 0);
	right.click();
	assert!(drain_outbound(&mut outbound).is_empty());
}

#[rstest]
fn test_double_click_pushes_in_order(page: TestPage) {
	let (mut connection, mut outbound) = connect(&page, HookTable::components());
	let button = page.add_element("button", "twice").unwrap();
	let id = connection.bind_hook(&button, "DoubleClick").unwrap();

	button.double_click();
	button.click();
	button.double_click();

	let events = drain_outbound(&mut outbound);
	assert_eq!(events.len(), 2);
	assert!(events.iter().all(|event| event.name == "doubleclick" && event.binding == id));

	connection.unbind_hook(id);
	assert_eq!(button.listener_count("dblclick"), 0);
}

#[rstest]
fn test_scroll_observer_waits_then_reports(page: TestPage) {
	let table = HookTable::new().with("ScrollObserver", HookDefinition::ScrollObserver { delay_ms: 100 });
	let (mut connection, mut outbound) = connect(&page, table);
	let section = page.add_element("section", "watched").unwrap();
	let id = connection.bind_hook(&section, "ScrollObserver").unwrap();

	assert_eq!(page.platform.observer_count(), 0);
	page.platform.advance_time(99);
	assert_eq!(page.platform.observer_count(), 0);
	page.platform.advance_time(1);
	assert_eq!(page.platform.observer_count(), 1);

	page.platform.set_visibility(&section, true);
	page.platform.set_visibility(&section, false);
	let names: Vec<String> = drain_outbound(&mut outbound)
		.into_iter()
		.map(|event| event.name)
		.collect();
	assert_eq!(names, vec!["in_view", "out_of_view"]);

	connection.unbind_hook(id);
	assert_eq!(page.platform.observer_count(), 0);
}

#[rstest]
fn test_scroll_observer_destroyed_before_delay(page: TestPage) {
	let table = HookTable::new().with("ScrollObserver", HookDefinition::ScrollObserver { delay_ms: 100 });
	let (mut connection, _outbound) = connect(&page, table);
	let id = connection.bind_hook(&Element::new("section"), "ScrollObserver").unwrap();
	assert_eq!(page.platform.pending_timers(), 1);

	connection.unbind_hook(id);
	assert_eq!(page.platform.pending_timers(), 0);
	page.platform.advance_time(500);
	assert_eq!(page.platform.observer_count(), 0);
}

#[rstest]
fn test_highlight_all_runs_on_next_tick(page: TestPage) {
	let table = HookTable::new().with("HighlightJS", HookDefinition::HighlightAll);
	let (mut connection, _outbound) = connect(&page, table);

	connection.bind_hook(&Element::new("div"), "HighlightJS").unwrap();
	assert_eq!(page.platform.highlight_all_count(), 0);
	page.platform.advance_time(0);
	assert_eq!(page.platform.highlight_all_count(), 1);

	let cancelled = connection.bind_hook(&Element::new("div"), "HighlightJS").unwrap();
	connection.unbind_hook(cancelled);
	page.platform.advance_time(10);
	assert_eq!(page.platform.highlight_all_count(), 1);
}

#[rstest]
fn test_unknown_hook_degrades_to_noop(page: TestPage) {
	let (mut connection, mut outbound) = connect(&page, HookTable::components());
	let element = page.add_element("div", "plain").unwrap();
	let id = connection.bind_hook(&element, "DoesNotExist").unwrap();
	connection.update_hook(id).unwrap();
	element.double_click();
	assert!(drain_outbound(&mut outbound).is_empty());
	assert!(connection.unbind_hook(id));
}
