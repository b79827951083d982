use crate::dom::ElementHandle;
use serde_json::Value;
use std::cell::Cell;
use std::fmt;

/// A named notification carrying a JSON `detail`, dispatched through the document tree.
///
/// Flags set by listeners (`prevent_default`, `stop_propagation`) live in `Cell`s so
/// listeners only ever need `&CustomEvent`.
pub struct CustomEvent {
    event_type: String,
    detail: Value,
    bubbles: bool,
    cancelable: bool,
    target: Cell<Option<ElementHandle>>,
    current_target: Cell<Option<ElementHandle>>,
    default_prevented: Cell<bool>,
    propagation_stopped: Cell<bool>,
    immediate_stopped: Cell<bool>,
}

impl CustomEvent {
    /// Non-bubbling, non-cancelable, `null` detail: the DOM defaults.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            detail: Value::Null,
            bubbles: false,
            cancelable: false,
            target: Cell::new(None),
            current_target: Cell::new(None),
            default_prevented: Cell::new(false),
            propagation_stopped: Cell::new(false),
            immediate_stopped: Cell::new(false),
        }
    }

    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = detail;
        self
    }
    pub fn bubbles(mut self, yes: bool) -> Self {
        self.bubbles = yes;
        self
    }
    pub fn cancelable(mut self, yes: bool) -> Self {
        self.cancelable = yes;
        self
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }
    pub fn detail(&self) -> &Value {
        &self.detail
    }
    pub fn is_bubbling(&self) -> bool {
        self.bubbles
    }
    pub fn is_cancelable(&self) -> bool {
        self.cancelable
    }
    /// Element the event was dispatched on; `None` before dispatch.
    pub fn target(&self) -> Option<ElementHandle> {
        self.target.get()
    }
    /// Element whose listeners are currently running.
    pub fn current_target(&self) -> Option<ElementHandle> {
        self.current_target.get()
    }
    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }

    /// No-op unless the event is cancelable.
    pub fn prevent_default(&self) {
        if self.cancelable {
            self.default_prevented.set(true);
        }
    }
    pub fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }
    pub fn stop_immediate_propagation(&self) {
        self.propagation_stopped.set(true);
        self.immediate_stopped.set(true);
    }

    pub(crate) fn begin_dispatch(&self, target: ElementHandle) {
        self.target.set(Some(target));
        self.propagation_stopped.set(false);
        self.immediate_stopped.set(false);
    }
    pub(crate) fn set_current_target(&self, el: Option<ElementHandle>) {
        self.current_target.set(el);
    }
    pub(crate) fn propagation_stopped(&self) -> bool {
        self.propagation_stopped.get()
    }
    pub(crate) fn immediate_stopped(&self) -> bool {
        self.immediate_stopped.get()
    }
}

impl fmt::Debug for CustomEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomEvent")
            .field("type", &self.event_type)
            .field("detail", &self.detail)
            .field("bubbles", &self.bubbles)
            .field("cancelable", &self.cancelable)
            .field("target", &self.target.get())
            .field("default_prevented", &self.default_prevented.get())
            .finish()
    }
}
