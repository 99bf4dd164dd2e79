use super::*;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

const ACTION_STACK_BYTES: usize = 32 * 1024 * 1024;

pub type EventHandler = Rc<dyn Fn(&mut Page, &mut EventState) -> Result<()>>;

#[derive(Clone)]
pub(crate) struct Listener {
    pub(crate) capture: bool,
    pub(crate) callback: EventHandler,
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("capture", &self.capture)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default, Clone)]
pub(crate) struct ListenerStore {
    map: HashMap<NodeId, HashMap<String, Vec<Listener>>>,
}

impl ListenerStore {
    fn add(&mut self, node_id: NodeId, event: String, listener: Listener) {
        self.map
            .entry(node_id)
            .or_default()
            .entry(event)
            .or_default()
            .push(listener);
    }

    fn get(&self, node_id: NodeId, event: &str, capture: bool) -> Vec<Listener> {
        self.map
            .get(&node_id)
            .and_then(|events| events.get(event))
            .map(|listeners| {
                listeners
                    .iter()
                    .filter(|listener| listener.capture == capture)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

// Element-attached data lives beside the tree, keyed by node identity,
// so element structs stay plain attribute holders.
#[derive(Debug, Default, Clone)]
pub(crate) struct DataStore {
    map: HashMap<NodeId, HashMap<String, String>>,
}

impl DataStore {
    pub(crate) fn get(&self, node_id: NodeId, key: &str) -> Option<&str> {
        self.map
            .get(&node_id)
            .and_then(|entries| entries.get(key))
            .map(String::as_str)
    }

    pub(crate) fn set(&mut self, node_id: NodeId, key: &str, value: &str) {
        self.map
            .entry(node_id)
            .or_default()
            .insert(key.to_string(), value.to_string());
    }
}

#[derive(Debug, Clone)]
pub struct EventState {
    pub(crate) event_type: String,
    pub(crate) target: NodeId,
    pub(crate) current_target: NodeId,
    pub(crate) default_prevented: bool,
    pub(crate) propagation_stopped: bool,
    pub(crate) immediate_propagation_stopped: bool,
}

impl EventState {
    fn new(event_type: &str, target: NodeId) -> Self {
        Self {
            event_type: event_type.to_string(),
            target,
            current_target: target,
            default_prevented: false,
            propagation_stopped: false,
            immediate_propagation_stopped: false,
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn current_target(&self) -> NodeId {
        self.current_target
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_propagation_stopped = true;
    }
}

pub struct Page {
    pub(crate) dom: Dom,
    pub(crate) listeners: ListenerStore,
    pub(crate) data: DataStore,
    submissions: HashMap<NodeId, usize>,
    console_logs: Vec<String>,
    console_log_limit: usize,
    console_to_stderr: bool,
    trace_events: bool,
}

impl Page {
    pub fn from_html(html: &str) -> Result<Self> {
        let dom = parse_html(html)?;
        Ok(Self {
            dom,
            listeners: ListenerStore::default(),
            data: DataStore::default(),
            submissions: HashMap::new(),
            console_logs: Vec::new(),
            console_log_limit: 10_000,
            console_to_stderr: true,
            trace_events: false,
        })
    }

    pub fn enable_trace(&mut self, enabled: bool) {
        self.trace_events = enabled;
    }

    pub fn take_console_logs(&mut self) -> Vec<String> {
        std::mem::take(&mut self.console_logs)
    }

    pub fn set_console_stderr(&mut self, enabled: bool) {
        self.console_to_stderr = enabled;
    }

    pub fn set_console_log_limit(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::Runtime(
                "set_console_log_limit requires at least 1 entry".into(),
            ));
        }
        self.console_log_limit = max_entries;
        while self.console_logs.len() > self.console_log_limit {
            self.console_logs.remove(0);
        }
        Ok(())
    }

    pub(crate) fn log_line(&mut self, line: String) {
        if self.console_to_stderr {
            eprintln!("{line}");
        }
        if self.console_logs.len() >= self.console_log_limit {
            self.console_logs.remove(0);
        }
        self.console_logs.push(line);
    }

    fn trace_event_line(&mut self, line: String) {
        if self.trace_events {
            self.log_line(line);
        }
    }

    pub fn click(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        if self.dom.disabled(target) {
            return Ok(());
        }

        stacker::grow(ACTION_STACK_BYTES, || {
            let click_outcome = self.dispatch_event(target, "click")?;
            if click_outcome.default_prevented {
                return Ok(());
            }

            if is_submit_control(&self.dom, target) {
                if let Some(form_id) = self.resolve_form_for_submit(target) {
                    self.dispatch_event(form_id, "submit")?;
                }
            }

            Ok(())
        })
    }

    pub fn submit(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;

        let Some(form_id) = self.resolve_form_for_submit(target) else {
            return Ok(());
        };

        stacker::grow(ACTION_STACK_BYTES, || {
            self.dispatch_event(form_id, "submit")?;
            Ok(())
        })
    }

    pub fn dispatch(&mut self, selector: &str, event: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        stacker::grow(ACTION_STACK_BYTES, || {
            self.dispatch_event(target, event)?;
            Ok(())
        })
    }

    pub fn add_listener(&mut self, selector: &str, event: &str, handler: EventHandler) -> Result<()> {
        let target = self.select_one(selector)?;
        self.add_listener_to_node(target, event, false, handler);
        Ok(())
    }

    pub fn add_capture_listener(
        &mut self,
        selector: &str,
        event: &str,
        handler: EventHandler,
    ) -> Result<()> {
        let target = self.select_one(selector)?;
        self.add_listener_to_node(target, event, true, handler);
        Ok(())
    }

    pub(crate) fn add_listener_to_node(
        &mut self,
        node_id: NodeId,
        event: &str,
        capture: bool,
        handler: EventHandler,
    ) {
        self.listeners.add(
            node_id,
            event.to_string(),
            Listener {
                capture,
                callback: handler,
            },
        );
    }

    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        self.dom.query_selector_all(selector)
    }

    pub(crate) fn select_one(&self, selector: &str) -> Result<NodeId> {
        self.dom
            .query_selector_all(selector)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::SelectorNotFound(selector.to_string()))
    }

    fn dispatch_event(&mut self, target: NodeId, event_type: &str) -> Result<EventState> {
        let mut event = EventState::new(event_type, target);
        let outcome = self.run_dispatch_phases(&mut event)?;
        self.trace_event_done(&event, outcome);
        self.run_default_action(&event);
        Ok(event)
    }

    fn run_dispatch_phases(&mut self, event: &mut EventState) -> Result<&'static str> {
        let mut path = Vec::new();
        let mut cursor = Some(event.target);
        while let Some(node) = cursor {
            path.push(node);
            cursor = self.dom.parent(node);
        }
        path.reverse();

        // Capture phase.
        if path.len() >= 2 {
            for node in &path[..path.len() - 1] {
                event.current_target = *node;
                self.invoke_listeners(*node, event, true)?;
                if event.propagation_stopped {
                    return Ok("propagation_stopped");
                }
            }
        }

        // Target phase: capture listeners first.
        event.current_target = event.target;
        self.invoke_listeners(event.target, event, true)?;
        if event.propagation_stopped {
            return Ok("propagation_stopped");
        }

        // Target phase: bubble listeners.
        self.invoke_listeners(event.target, event, false)?;
        if event.propagation_stopped {
            return Ok("propagation_stopped");
        }

        // Bubble phase.
        if path.len() >= 2 {
            for node in path[..path.len() - 1].iter().rev() {
                event.current_target = *node;
                self.invoke_listeners(*node, event, false)?;
                if event.propagation_stopped {
                    return Ok("propagation_stopped");
                }
            }
        }

        Ok("completed")
    }

    fn invoke_listeners(
        &mut self,
        node_id: NodeId,
        event: &mut EventState,
        capture: bool,
    ) -> Result<()> {
        let listeners = self.listeners.get(node_id, &event.event_type, capture);
        for listener in listeners {
            if self.trace_events {
                let phase = if capture { "capture" } else { "bubble" };
                let target_label = self.event_node_label(event.target);
                let current_label = self.event_node_label(event.current_target);
                self.trace_event_line(format!(
                    "[event] {} target={} current={} phase={} default_prevented={}",
                    event.event_type, target_label, current_label, phase, event.default_prevented
                ));
            }
            (listener.callback)(self, event)?;
            if event.immediate_propagation_stopped {
                break;
            }
        }
        Ok(())
    }

    // Stop-propagation does not cancel the default action, so this runs
    // whatever way the phase walk ended.
    fn run_default_action(&mut self, event: &EventState) {
        if event.default_prevented {
            return;
        }
        if event.event_type == "submit"
            && self
                .dom
                .tag_name(event.target)
                .map(|t| t.eq_ignore_ascii_case("form"))
                .unwrap_or(false)
        {
            *self.submissions.entry(event.target).or_insert(0) += 1;
            let label = self.event_node_label(event.target);
            self.trace_event_line(format!("[event] submit default form={label}"));
        }
    }

    fn trace_event_done(&mut self, event: &EventState, outcome: &str) {
        if !self.trace_events {
            return;
        }
        let target_label = self.event_node_label(event.target);
        self.trace_event_line(format!(
            "[event] done {} target={} outcome={} default_prevented={} propagation_stopped={} immediate_stopped={}",
            event.event_type,
            target_label,
            outcome,
            event.default_prevented,
            event.propagation_stopped,
            event.immediate_propagation_stopped
        ));
    }

    pub(crate) fn event_node_label(&self, node_id: NodeId) -> String {
        match self.dom.tag_name(node_id) {
            Some(tag) => match self.dom.attr(node_id, "id") {
                Some(id) if !id.is_empty() => format!("{tag}#{id}"),
                _ => tag.to_string(),
            },
            None => "#document".to_string(),
        }
    }

    pub(crate) fn resolve_form_for_submit(&self, target: NodeId) -> Option<NodeId> {
        if self
            .dom
            .tag_name(target)
            .map(|t| t.eq_ignore_ascii_case("form"))
            .unwrap_or(false)
        {
            return Some(target);
        }
        self.dom.find_ancestor_by_tag(target, "form")
    }

    pub fn has_class(&self, selector: &str, class_name: &str) -> Result<bool> {
        let target = self.select_one(selector)?;
        self.dom.class_contains(target, class_name)
    }

    pub fn attr(&self, selector: &str, name: &str) -> Result<Option<String>> {
        let target = self.select_one(selector)?;
        Ok(self.dom.attr(target, name))
    }

    pub fn is_disabled(&self, selector: &str) -> Result<bool> {
        let target = self.select_one(selector)?;
        Ok(self.dom.disabled(target))
    }

    pub fn data(&self, selector: &str, key: &str) -> Result<Option<String>> {
        let target = self.select_one(selector)?;
        Ok(self.data.get(target, key).map(ToOwned::to_owned))
    }

    pub fn set_data(&mut self, selector: &str, key: &str, value: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.data.set(target, key, value);
        Ok(())
    }

    pub fn submission_count(&self, selector: &str) -> Result<usize> {
        let target = self.select_one(selector)?;
        Ok(self.submissions.get(&target).copied().unwrap_or(0))
    }

    pub fn assert_exists(&self, selector: &str) -> Result<()> {
        self.select_one(selector).map(|_| ())
    }

    pub fn assert_class(&self, selector: &str, class_name: &str, expected: bool) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.class_contains(target, class_name)?;
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: format!("class '{class_name}' present={expected}"),
                actual: format!("present={actual}"),
                dom_snippet: self.dom.dump_node(target),
            });
        }
        Ok(())
    }

    pub fn assert_disabled(&self, selector: &str, expected: bool) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.disabled(target);
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: format!("disabled={expected}"),
                actual: format!("disabled={actual}"),
                dom_snippet: self.dom.dump_node(target),
            });
        }
        Ok(())
    }
}

pub(crate) fn is_submit_control(dom: &Dom, node_id: NodeId) -> bool {
    let Some(element) = dom.element(node_id) else {
        return false;
    };

    if element.tag_name.eq_ignore_ascii_case("input") {
        return element
            .attrs
            .get("type")
            .is_some_and(|kind| kind.eq_ignore_ascii_case("submit"));
    }

    if element.tag_name.eq_ignore_ascii_case("button") {
        // A button without an explicit type submits its form.
        return element
            .attrs
            .get("type")
            .is_none_or(|kind| kind.eq_ignore_ascii_case("submit"));
    }

    false
}
