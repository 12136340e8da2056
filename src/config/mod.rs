//! Configuration loading and management
//!
//! Configuration is assembled from layers: YAML files or strings, then
//! environment overrides. Later layers win field by field.
//!
//! ```yaml
//! base_url: https://erp.example.com/api/v1
//! timeout_secs: 15
//! default_page_size: 50
//! selection_policy: keep_failed
//! ```

use crate::bulk::SelectionPolicy;
use crate::core::error::{ConfigError, PayResult};
use crate::core::query::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variables read by [`ConfigLayer::from_env`]
pub const ENV_BASE_URL: &str = "BULKPAY_BASE_URL";
pub const ENV_API_TOKEN: &str = "BULKPAY_API_TOKEN";
pub const ENV_TIMEOUT_SECS: &str = "BULKPAY_TIMEOUT_SECS";
pub const ENV_PAGE_SIZE: &str = "BULKPAY_PAGE_SIZE";

/// Resolved client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend root; `/payments` is appended to it
    pub base_url: String,

    /// Bearer token sent with every request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Per-request timeout; `None` keeps the transport default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    /// What happens to the selection after a bulk call
    #[serde(default)]
    pub selection_policy: SelectionPolicy,

    /// Refetch the loaded page after a bulk call
    #[serde(default = "default_true")]
    pub refresh_after_bulk: bool,

    /// Buffer size of the store's event bus
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_true() -> bool {
    true
}

fn default_event_capacity() -> usize {
    1024
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api/v1".to_string(),
            api_token: None,
            timeout_secs: None,
            default_page_size: default_page_size(),
            selection_policy: SelectionPolicy::default(),
            refresh_after_bulk: true,
            event_capacity: default_event_capacity(),
        }
    }
}

/// One configuration layer; unset fields leave earlier layers untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    pub base_url: Option<String>,
    pub api_token: Option<String>,
    pub timeout_secs: Option<u64>,
    pub default_page_size: Option<u32>,
    pub selection_policy: Option<SelectionPolicy>,
    pub refresh_after_bulk: Option<bool>,
    pub event_capacity: Option<usize>,
}

impl ConfigLayer {
    /// Parse a layer from a YAML string
    pub fn from_yaml_str(yaml: &str) -> PayResult<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parse a layer from a YAML file
    pub fn from_yaml_file(path: &str) -> PayResult<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                file: Some(path.to_string()),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Layer built from the process environment
    pub fn from_env() -> PayResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Layer built from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> PayResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            base_url: lookup(ENV_BASE_URL),
            api_token: lookup(ENV_API_TOKEN),
            timeout_secs: parse_var(&lookup, ENV_TIMEOUT_SECS)?,
            default_page_size: parse_var(&lookup, ENV_PAGE_SIZE)?,
            ..Self::default()
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> PayResult<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|e: T::Err| {
            ConfigError::InvalidValue {
                field: key.to_string(),
                value: raw.clone(),
                message: e.to_string(),
            }
            .into()
        }),
    }
}

impl ClientConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> PayResult<Self> {
        Self::from_layers(vec![ConfigLayer::from_yaml_file(path)?])
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> PayResult<Self> {
        Self::from_layers(vec![ConfigLayer::from_yaml_str(yaml)?])
    }

    /// Defaults, then the given layers in order, validated
    pub fn from_layers(layers: Vec<ConfigLayer>) -> PayResult<Self> {
        let mut config = Self::default();
        for layer in layers {
            config.apply(layer);
        }
        config.validate()?;
        Ok(config)
    }

    /// Apply a layer on top of this configuration
    pub fn apply(&mut self, layer: ConfigLayer) {
        if let Some(base_url) = layer.base_url {
            self.base_url = base_url;
        }
        if layer.api_token.is_some() {
            self.api_token = layer.api_token;
        }
        if layer.timeout_secs.is_some() {
            self.timeout_secs = layer.timeout_secs;
        }
        if let Some(size) = layer.default_page_size {
            self.default_page_size = size;
        }
        if let Some(policy) = layer.selection_policy {
            self.selection_policy = policy;
        }
        if let Some(refresh) = layer.refresh_after_bulk {
            self.refresh_after_bulk = refresh;
        }
        if let Some(capacity) = layer.event_capacity {
            self.event_capacity = capacity;
        }
    }

    /// Check values that would only fail later, at request time
    pub fn validate(&self) -> PayResult<()> {
        let base = self.base_url.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "base_url".to_string(),
                value: self.base_url.clone(),
                message: "must be an http or https URL".to_string(),
            }
            .into());
        }
        if self.default_page_size == 0 || self.default_page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::InvalidValue {
                field: "default_page_size".to_string(),
                value: self.default_page_size.to_string(),
                message: format!("must be between 1 and {}", MAX_PAGE_SIZE),
            }
            .into());
        }
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "timeout_secs".to_string(),
                value: "0".to_string(),
                message: "must be positive; omit it to keep the transport default".to_string(),
            }
            .into());
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// `base_url` without a trailing slash
    pub fn api_root(&self) -> &str {
        self.base_url.trim().trim_end_matches('/')
    }
}
