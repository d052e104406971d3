use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::warn;

use super::channel::OutboundChannel;
use super::protocol::{
    is_scalar, is_truthy, InteractionEventRecord, NodeToken, OutboundMessage, SerializedTouch,
};

const TOUCH_EVENTS: &[&str] = &["touchstart", "touchmove", "touchend", "touchcancel"];

/// Emulated mouse events a platform may fire between `touchend` and its
/// compatibility click.
const COMPAT_MOUSE_EVENTS: &[&str] = &[
    "mousemove",
    "mouseover",
    "mouseout",
    "mouseenter",
    "mouseleave",
    "mousedown",
    "mouseup",
];

const COMMON_FIELDS: &[&str] = &[
    "bubbles",
    "cancelable",
    "composed",
    "defaultPrevented",
    "eventPhase",
    "isTrusted",
    "timeStamp",
];

const MODIFIER_FIELDS: &[&str] = &["altKey", "ctrlKey", "metaKey", "shiftKey"];

const MOUSE_FIELDS: &[&str] = &[
    "button",
    "buttons",
    "clientX",
    "clientY",
    "movementX",
    "movementY",
    "offsetX",
    "offsetY",
    "pageX",
    "pageY",
    "screenX",
    "screenY",
    "x",
    "y",
];

const WHEEL_FIELDS: &[&str] = &["deltaX", "deltaY", "deltaZ", "deltaMode"];

const KEY_FIELDS: &[&str] = &[
    "key",
    "code",
    "keyCode",
    "charCode",
    "which",
    "location",
    "repeat",
    "isComposing",
];

const INPUT_FIELDS: &[&str] = &["data", "inputType", "isComposing"];

/// Scalar fields harvested from a native event of `event_type`.
fn allowed_fields(event_type: &str) -> Vec<&'static str> {
    let mut fields = COMMON_FIELDS.to_vec();
    match event_type {
        "click" | "dblclick" | "contextmenu" | "mousedown" | "mouseup" | "mousemove"
        | "mouseover" | "mouseout" | "mouseenter" | "mouseleave" => {
            fields.extend_from_slice(MODIFIER_FIELDS);
            fields.extend_from_slice(MOUSE_FIELDS);
        }
        "wheel" => {
            fields.extend_from_slice(MODIFIER_FIELDS);
            fields.extend_from_slice(MOUSE_FIELDS);
            fields.extend_from_slice(WHEEL_FIELDS);
        }
        "keydown" | "keyup" | "keypress" => {
            fields.extend_from_slice(MODIFIER_FIELDS);
            fields.extend_from_slice(KEY_FIELDS);
        }
        "input" | "beforeinput" | "compositionstart" | "compositionupdate" | "compositionend" => {
            fields.extend_from_slice(INPUT_FIELDS);
        }
        name if TOUCH_EVENTS.contains(&name) => {
            fields.extend_from_slice(MODIFIER_FIELDS);
        }
        _ => {}
    }
    fields
}

/// Names such as `AT_TARGET` denote class-level constants, not event state.
fn is_constant_name(name: &str) -> bool {
    name == name.to_uppercase()
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NativeTouch {
    pub client_x: f64,
    pub client_y: f64,
    pub page_x: f64,
    pub page_y: f64,
    pub identifier: i64,
    pub target: Option<NodeToken>,
}

/// Scroll offsets as reported by the two containers different engines use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewportScroll {
    pub document_element: f64,
    pub body: f64,
}

impl ViewportScroll {
    fn offset(&self) -> f64 {
        if self.document_element != 0.0 {
            self.document_element
        } else {
            self.body
        }
    }
}

/// Interaction event as delivered by the rendering environment.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NativeEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    /// Identity bound to the element whose listener prop fired.
    pub current_target: Option<NodeToken>,
    /// The true target is the whole viewport rather than an element.
    pub target_is_viewport: bool,
    pub detail: Option<JsonValue>,
    pub touches: Vec<NativeTouch>,
    pub changed_touches: Vec<NativeTouch>,
    pub viewport_scroll: ViewportScroll,
    /// Own properties exposed by the environment for this event.
    pub properties: BTreeMap<String, JsonValue>,
}

impl NativeEvent {
    pub fn new(event_type: impl Into<String>, current_target: Option<NodeToken>) -> Self {
        Self {
            event_type: event_type.into(),
            current_target,
            ..Default::default()
        }
    }

    fn is_touch(&self) -> bool {
        TOUCH_EVENTS.contains(&self.event_type.as_str())
    }

    /// Page coordinates of the primary touch, falling back to the event's own.
    fn primary_point(&self) -> Option<(f64, f64)> {
        if let Some(touch) = self.changed_touches.first().or(self.touches.first()) {
            return Some((touch.page_x, touch.page_y));
        }
        let x = self.properties.get("pageX")?.as_f64()?;
        let y = self.properties.get("pageY")?.as_f64()?;
        Some((x, y))
    }
}

/// Tap-to-click synthesis state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TapState {
    #[default]
    Idle,
    Armed {
        page_x: f64,
        page_y: f64,
    },
    /// A click was synthesized; the platform's own click may still come.
    /// Any event other than that click or emulated mouse traffic ends it.
    Synthesized,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub propagation_stopped: bool,
    pub suppressed: bool,
    pub records_sent: usize,
}

/// Normalizes native events into [`InteractionEventRecord`]s and forwards
/// them to the background context.
#[derive(Debug, Clone)]
pub struct EventBridge {
    tap: TapState,
    tap_threshold: f64,
}

impl EventBridge {
    pub fn new(tap_threshold: f64) -> Self {
        Self {
            tap: TapState::Idle,
            tap_threshold,
        }
    }

    pub fn tap_state(&self) -> TapState {
        self.tap
    }

    /// Shared handler for every listener prop on every node.
    pub fn dispatch(
        &mut self,
        event: &NativeEvent,
        root_token: Option<&NodeToken>,
        channel: &dyn OutboundChannel,
    ) -> DispatchOutcome {
        let mut outcome = DispatchOutcome {
            propagation_stopped: true,
            ..Default::default()
        };

        if self.tap == TapState::Synthesized {
            if event.event_type == "click" {
                self.tap = TapState::Idle;
                outcome.suppressed = true;
                return outcome;
            }
            if !COMPAT_MOUSE_EVENTS.contains(&event.event_type.as_str()) {
                self.tap = TapState::Idle;
            }
        }

        let record = normalize(event, root_token);
        if send(channel, record.clone()) {
            outcome.records_sent += 1;
        }

        match event.event_type.as_str() {
            "touchstart" => {
                self.tap = match event.primary_point() {
                    Some((page_x, page_y)) => TapState::Armed { page_x, page_y },
                    None => TapState::Idle,
                };
            }
            "touchend" => {
                if let TapState::Armed { page_x, page_y } = self.tap {
                    self.tap = TapState::Idle;
                    let Some((end_x, end_y)) = event.primary_point() else {
                        return outcome;
                    };
                    let distance = (end_x - page_x).hypot(end_y - page_y);
                    if distance < self.tap_threshold {
                        let click = InteractionEventRecord {
                            event_type: "click".into(),
                            ..record
                        };
                        if send(channel, click) {
                            outcome.records_sent += 1;
                        }
                        self.tap = TapState::Synthesized;
                    }
                }
            }
            "touchcancel" => self.tap = TapState::Idle,
            _ => {}
        }

        outcome
    }
}

fn send(channel: &dyn OutboundChannel, event: InteractionEventRecord) -> bool {
    match channel.post(OutboundMessage::Event { event }) {
        Ok(()) => true,
        Err(err) => {
            warn!(target: "driver", error = %err, "dropping interaction event");
            false
        }
    }
}

/// Builds the outbound record for `event`.
pub fn normalize(event: &NativeEvent, root_token: Option<&NodeToken>) -> InteractionEventRecord {
    let mut record = InteractionEventRecord::new(event.event_type.clone());
    record.target = event.current_target.clone();

    if event.event_type == "scroll" && event.target_is_viewport {
        record.target = root_token.cloned();
        record.scroll_top = Some(event.viewport_scroll.offset());
    }

    if let Some(detail) = event.detail.as_ref().filter(|detail| is_truthy(detail)) {
        record.detail = Some(detail.clone());
    }

    for name in allowed_fields(&event.event_type) {
        let Some(value) = event.properties.get(name) else {
            continue;
        };
        if !is_scalar(value) || is_constant_name(name) || record.contains(name) {
            continue;
        }
        record.fields.insert(name.to_string(), value.clone());
    }

    if event.is_touch() {
        record.touches = Some(serialize_touches(&event.touches));
        record.changed_touches = Some(serialize_touches(&event.changed_touches));
    }

    record
}

fn serialize_touches(touches: &[NativeTouch]) -> Vec<SerializedTouch> {
    touches
        .iter()
        .map(|touch| SerializedTouch {
            client_x: touch.client_x,
            client_y: touch.client_y,
            page_x: touch.page_x,
            page_y: touch.page_y,
            identifier: touch.identifier,
            id: touch.target.clone(),
        })
        .collect()
}
