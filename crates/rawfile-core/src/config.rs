//! Operator configuration and the cleaned view handed to patches
//!
//! `OperatorConfig` is what an operator writes (YAML file plus `--set`
//! overrides). `ConfigView` is the snapshot patches read from: empty and
//! absent options are dropped so every consumer sees "unset" the same way.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{CoreError, Result};

pub const NAMESPACE: &str = "namespace";
pub const CREATE_NAMESPACE: &str = "create-namespace";
pub const NODE_SELECTOR: &str = "node-selector";
pub const NODE_STORAGE_PATH: &str = "node-storage-path";
pub const RBAC_NAME_FORMATTER: &str = "rbac-name-formatter";
pub const CSI_DRIVER_FORMATTER: &str = "csi-driver-formatter";
pub const STORAGE_CLASS_NAME: &str = "storage-class-name";
pub const STORAGE_CLASS_RECLAIM_POLICY: &str = "storage-class-reclaim-policy";
pub const RELEASE: &str = "release";

/// Namespace used when none is configured
pub const DEFAULT_NAMESPACE: &str = "default";

/// Declared operator options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct OperatorConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_namespace: Option<bool>,

    /// Space separated `key=value` pairs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_selector: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_storage_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rbac_name_formatter: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csi_driver_formatter: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class_reclaim_policy: Option<String>,

    /// Bundled chart release to deploy (newest when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
}

impl OperatorConfig {
    /// Parse configuration from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load configuration from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Apply `key=value` overrides on top of this configuration
    ///
    /// Boolean options take `true` or `false`; every other value is a string.
    pub fn apply_overrides(&mut self, set_args: &[String]) -> Result<()> {
        let mut map = match serde_json::to_value(&*self)? {
            JsonValue::Object(map) => map,
            _ => serde_json::Map::new(),
        };

        for arg in set_args {
            let (key, val) = arg.split_once('=').ok_or_else(|| CoreError::InvalidConfig {
                message: format!("Invalid --set format: '{}'. Expected key=value", arg),
            })?;

            let key = key.trim();
            let value = match (key, val) {
                (CREATE_NAMESPACE, "true") => JsonValue::Bool(true),
                (CREATE_NAMESPACE, "false") => JsonValue::Bool(false),
                _ => JsonValue::String(val.to_string()),
            };
            map.insert(key.to_string(), value);
        }

        *self = serde_json::from_value(JsonValue::Object(map)).map_err(|e| {
            CoreError::InvalidConfig {
                message: e.to_string(),
            }
        })?;
        Ok(())
    }
}

/// A single configuration value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
    String(String),
    Bool(bool),
}

/// Immutable, cleaned configuration snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigView {
    values: BTreeMap<String, ConfigValue>,
}

impl ConfigView {
    /// Build a view from declared configuration, dropping unset values
    pub fn from_config(config: &OperatorConfig) -> Self {
        let strings = [
            (NAMESPACE, &config.namespace),
            (NODE_SELECTOR, &config.node_selector),
            (NODE_STORAGE_PATH, &config.node_storage_path),
            (RBAC_NAME_FORMATTER, &config.rbac_name_formatter),
            (CSI_DRIVER_FORMATTER, &config.csi_driver_formatter),
            (STORAGE_CLASS_NAME, &config.storage_class_name),
            (STORAGE_CLASS_RECLAIM_POLICY, &config.storage_class_reclaim_policy),
            (RELEASE, &config.release),
        ];

        let mut values = BTreeMap::new();
        for (key, value) in strings {
            if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
                values.insert(key.to_string(), ConfigValue::String(v.to_string()));
            }
        }
        if let Some(create) = config.create_namespace {
            values.insert(CREATE_NAMESPACE.to_string(), ConfigValue::Bool(create));
        }

        Self { values }
    }

    /// Build a view directly from key/value pairs (empty strings dropped)
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, ConfigValue)>) -> Self {
        let values = pairs
            .into_iter()
            .filter(|(_, v)| !matches!(v, ConfigValue::String(s) if s.is_empty()))
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.values.get(key)
    }

    /// String option, `None` when unset
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(ConfigValue::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Boolean option, `false` when unset
    pub fn get_bool(&self, key: &str) -> bool {
        matches!(self.values.get(key), Some(ConfigValue::Bool(true)))
    }

    /// Target namespace, falling back to [`DEFAULT_NAMESPACE`]
    pub fn namespace(&self) -> &str {
        self.get_str(NAMESPACE).unwrap_or(DEFAULT_NAMESPACE)
    }

    pub fn create_namespace(&self) -> bool {
        self.get_bool(CREATE_NAMESPACE)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
