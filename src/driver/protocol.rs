use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map as JsonMap, Number, Value as JsonValue};
use url::Url;

pub const ELEMENT_NODE: u8 = 1;
pub const TEXT_NODE: u8 = 3;

const BODY_NODE_NAME: &str = "BODY";

/// Identity assigned by the background context to every node it creates.
///
/// The wire format uses either strings or integers; both are kept in their
/// textual form so `7` and `"7"` name the same node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeToken(String);

impl NodeToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeToken {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for NodeToken {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawToken {
            Text(String),
            Number(Number),
        }

        Ok(match RawToken::deserialize(deserializer)? {
            RawToken::Text(text) => NodeToken(text),
            RawToken::Number(number) => NodeToken(number_text(&number)),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Text,
}

/// A style description as emitted by the background context: either a
/// declaration string (`"color: red; font-size: 12px"`) or a property map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StyleDescription {
    Declarations(String),
    Properties(JsonMap<String, JsonValue>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDescriptor {
    pub name: String,
    #[serde(default)]
    pub value: JsonValue,
}

/// Serialized node as produced by the background context.
///
/// The same shape is used for full descriptors (`addedNodes`) and for bare
/// references (`target`, `removedNodes`), which typically only carry the
/// token and node name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteNodeDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    #[serde(rename = "$$id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<StyleDescription>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<AttributeDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub child_nodes: Vec<RemoteNodeDescriptor>,
}

impl RemoteNodeDescriptor {
    pub fn reference(token: impl Into<String>) -> Self {
        Self {
            id: Some(NodeToken::new(token)),
            ..Default::default()
        }
    }

    pub fn kind(&self) -> Option<NodeKind> {
        match self.node_type {
            Some(ELEMENT_NODE) => Some(NodeKind::Element),
            Some(TEXT_NODE) => Some(NodeKind::Text),
            _ => None,
        }
    }

    pub fn is_body(&self) -> bool {
        self.node_name
            .as_deref()
            .is_some_and(|name| name.eq_ignore_ascii_case(BODY_NODE_NAME))
    }
}

/// One structural edit emitted by the background context.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChangeRecord {
    #[serde(rename_all = "camelCase")]
    ChildList {
        #[serde(default)]
        target: Option<RemoteNodeDescriptor>,
        #[serde(default)]
        removed_nodes: Option<Vec<RemoteNodeDescriptor>>,
        #[serde(default)]
        added_nodes: Option<Vec<RemoteNodeDescriptor>>,
        #[serde(default)]
        next_sibling: Option<RemoteNodeDescriptor>,
    },
    #[serde(rename_all = "camelCase")]
    Attributes {
        #[serde(default)]
        target: Option<RemoteNodeDescriptor>,
        #[serde(default)]
        attribute_name: Option<String>,
        #[serde(default)]
        new_value: Option<JsonValue>,
        #[serde(default)]
        style: Option<StyleDescription>,
    },
    #[serde(rename_all = "camelCase")]
    CharacterData {
        #[serde(default)]
        target: Option<RemoteNodeDescriptor>,
        #[serde(default)]
        new_value: Option<JsonValue>,
    },
    #[serde(rename_all = "camelCase")]
    AddEvent {
        #[serde(default)]
        target: Option<RemoteNodeDescriptor>,
        #[serde(default)]
        event_name: String,
    },
    #[serde(rename_all = "camelCase")]
    RemoveEvent {
        #[serde(default)]
        target: Option<RemoteNodeDescriptor>,
        #[serde(default)]
        event_name: String,
    },
    #[serde(alias = "canvasRenderingContext2D")]
    CanvasContext2D {
        #[serde(default)]
        target: Option<RemoteNodeDescriptor>,
        #[serde(default)]
        method: Option<String>,
        #[serde(default)]
        args: Vec<JsonValue>,
        #[serde(default)]
        properties: Option<JsonMap<String, JsonValue>>,
    },
}

impl ChangeRecord {
    /// Wire tags accepted by [`ChangeRecord`]'s deserializer.
    pub const TAGS: &'static [&'static str] = &[
        "childList",
        "attributes",
        "characterData",
        "addEvent",
        "removeEvent",
        "canvasContext2D",
        "canvasRenderingContext2D",
    ];
}

/// Background → foreground messages.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum InboundMessage {
    /// Records stay undecoded until replay so a bad record only fails
    /// from its own position onward.
    MutationRecord {
        #[serde(default)]
        mutations: Vec<JsonValue>,
    },
    #[serde(other)]
    Other,
}

/// Foreground → background messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OutboundMessage {
    #[serde(rename_all = "camelCase")]
    Init { url: Url, viewport_width: u32 },
    Event { event: InteractionEventRecord },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedTouch {
    pub client_x: f64,
    pub client_y: f64,
    pub page_x: f64,
    pub page_y: f64,
    pub identifier: i64,
    #[serde(rename = "$$id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeToken>,
}

/// Normalized interaction event sent to the background context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionEventRecord {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<NodeToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scroll_top: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub touches: Option<Vec<SerializedTouch>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed_touches: Option<Vec<SerializedTouch>>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, JsonValue>,
}

impl InteractionEventRecord {
    const RESERVED: &'static [&'static str] = &[
        "type",
        "target",
        "detail",
        "scrollTop",
        "touches",
        "changedTouches",
    ];

    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            ..Default::default()
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        Self::RESERVED.contains(&name) || self.fields.contains_key(name)
    }
}

/// JavaScript truthiness of a wire value.
pub fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(flag) => *flag,
        JsonValue::Number(number) => number
            .as_f64()
            .is_some_and(|float| float != 0.0 && !float.is_nan()),
        JsonValue::String(text) => !text.is_empty(),
        JsonValue::Array(_) | JsonValue::Object(_) => true,
    }
}

/// Text payload of a text node: falsy values become the empty string.
pub fn coerce_text(value: Option<&JsonValue>) -> String {
    match value {
        Some(value) if is_truthy(value) => scalar_text(value).unwrap_or_else(|| value.to_string()),
        _ => String::new(),
    }
}

/// String form of a scalar, `None` for null, arrays and objects.
pub fn scalar_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(text) => Some(text.clone()),
        JsonValue::Number(number) => Some(number_text(number)),
        JsonValue::Bool(flag) => Some(flag.to_string()),
        JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => None,
    }
}

pub fn is_scalar(value: &JsonValue) -> bool {
    matches!(
        value,
        JsonValue::String(_) | JsonValue::Number(_) | JsonValue::Bool(_)
    )
}

fn number_text(number: &Number) -> String {
    if let Some(integer) = number.as_i64() {
        return integer.to_string();
    }
    match number.as_f64() {
        Some(float) if float.fract() == 0.0 && float.abs() < 1e15 => format!("{}", float as i64),
        Some(float) => float.to_string(),
        None => number.to_string(),
    }
}
