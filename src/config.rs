use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read driver config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Maximum touch travel, in page units, that still counts as a tap.
    pub tap_threshold: f64,
    pub default_component: String,
    pub text_component: String,
    pub root_component: String,
    pub identity_attribute: String,
    pub tag_name_prefix: String,
    /// Extra `NODENAME: component` entries; these win over the built-ins.
    pub components: HashMap<String, String>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            tap_threshold: 10.0,
            default_component: "div".into(),
            text_component: "span".into(),
            root_component: "div".into(),
            identity_attribute: "data-target-id".into(),
            tag_name_prefix: String::new(),
            components: HashMap::new(),
        }
    }
}

impl DriverConfig {
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        match config_path {
            Some(path) if path.exists() => {
                let contents = fs::read_to_string(path)?;
                Ok(serde_yaml::from_str(&contents)?)
            }
            _ => Ok(Self::default()),
        }
    }
}
