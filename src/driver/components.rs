use std::collections::HashMap;

use crate::config::DriverConfig;

const BUILTIN_COMPONENTS: &[(&str, &str)] = &[
    ("VIEW", "div"),
    ("BUTTON", "Button"),
    ("BUTTON-GROUP", "Button.Group"),
    ("CHECKBOX", "Checkbox"),
];

/// Maps abstract node names to the renderable component the host draws.
#[derive(Debug, Clone)]
pub struct ComponentMap {
    entries: HashMap<String, String>,
    fallback: String,
    prefix: String,
}

impl ComponentMap {
    pub fn new(fallback: impl Into<String>) -> Self {
        let entries = BUILTIN_COMPONENTS
            .iter()
            .map(|(name, component)| (name.to_string(), component.to_string()))
            .collect();
        Self {
            entries,
            fallback: fallback.into(),
            prefix: String::new(),
        }
    }

    pub fn from_config(config: &DriverConfig) -> Self {
        let mut map = Self::new(config.default_component.clone());
        map.prefix = config.tag_name_prefix.to_ascii_uppercase();
        for (name, component) in &config.components {
            map.insert(name, component.clone());
        }
        map
    }

    pub fn insert(&mut self, node_name: &str, component: impl Into<String>) {
        self.entries
            .insert(node_name.to_ascii_uppercase(), component.into());
    }

    pub fn resolve(&self, node_name: Option<&str>) -> &str {
        let Some(name) = node_name else {
            return &self.fallback;
        };
        let upper = name.to_ascii_uppercase();
        let bare = upper.strip_prefix(self.prefix.as_str()).unwrap_or(&upper);
        self.entries
            .get(bare)
            .map(String::as_str)
            .unwrap_or(&self.fallback)
    }
}
