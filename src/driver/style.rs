use serde_json::Value as JsonValue;

use super::node::Props;
use super::protocol::{scalar_text, AttributeDescriptor, StyleDescription};

/// Converts background-side style and attribute descriptions into renderer
/// props.
pub trait StyleProjector {
    /// Merges `style` into the props' style sub-object. Existing entries not
    /// named by `style` are kept.
    fn project_style(&self, props: &mut Props, style: &StyleDescription);

    /// Copies raw attributes onto props verbatim.
    fn copy_attributes(&self, props: &mut Props, attributes: &[AttributeDescriptor]) {
        for attribute in attributes {
            match &attribute.value {
                JsonValue::String(text) => props.set_attribute(attribute.name.clone(), text.clone()),
                other => props.set_typed(attribute.name.clone(), other.clone()),
            }
        }
    }
}

/// Default projector: CSS property names become camel case, empty or null
/// values delete the property.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeclarationProjector;

impl StyleProjector for DeclarationProjector {
    fn project_style(&self, props: &mut Props, style: &StyleDescription) {
        let style_map = props.style_mut();
        match style {
            StyleDescription::Declarations(text) => {
                for declaration in text.split(';') {
                    let Some((name, value)) = declaration.split_once(':') else {
                        continue;
                    };
                    let name = name.trim();
                    if name.is_empty() {
                        continue;
                    }
                    let value = value.trim();
                    if value.is_empty() {
                        style_map.remove(&style_key(name));
                    } else {
                        style_map.insert(style_key(name), value.to_string());
                    }
                }
            }
            StyleDescription::Properties(properties) => {
                for (name, value) in properties {
                    match value {
                        JsonValue::Null => {
                            style_map.remove(&style_key(name));
                        }
                        JsonValue::String(text) if text.is_empty() => {
                            style_map.remove(&style_key(name));
                        }
                        other => {
                            if let Some(text) = scalar_text(other) {
                                style_map.insert(style_key(name), text);
                            }
                        }
                    }
                }
            }
        }
    }
}

/// `background-color` → `backgroundColor`; custom properties are kept as is.
fn style_key(name: &str) -> String {
    if name.starts_with("--") {
        return name.to_string();
    }
    let mut key = String::with_capacity(name.len());
    let mut upper_next = false;
    for ch in name.chars() {
        if ch == '-' {
            upper_next = !key.is_empty();
            continue;
        }
        if upper_next {
            key.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            key.push(ch);
        }
    }
    key
}
