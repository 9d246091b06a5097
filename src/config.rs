use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings of a flow-model service, usually read from `flowmodel.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// File, next to the requesting file, that receives module-level connections.
    #[serde(default = "default_connections_file")]
    pub connections_file: String,

    /// Companion file whose functions are treated as data mappings.
    #[serde(default = "default_data_mappings_file")]
    pub data_mappings_file: String,

    /// Template catalog to load instead of the bundled one.
    #[serde(default)]
    pub templates: Option<PathBuf>,

    /// Additional client classes, as `org/module:Class`.
    #[serde(default)]
    pub client_classes: Vec<String>,

    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_connections_file() -> String {
    "connections.bal".to_string()
}

fn default_data_mappings_file() -> String {
    "data_mappings.bal".to_string()
}

fn default_log_filter() -> String {
    "flowmodel=info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connections_file: default_connections_file(),
            data_mappings_file: default_data_mappings_file(),
            templates: None,
            client_classes: Vec::new(),
            log_filter: default_log_filter(),
        }
    }
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn overrides_are_read() {
        let config = Config::from_toml_str(
            r#"
            connections_file = "clients.bal"
            client_classes = ["acme/billing:Client"]
            "#,
        )
        .unwrap();
        assert_eq!(config.connections_file, "clients.bal");
        assert_eq!(config.data_mappings_file, "data_mappings.bal");
        assert_eq!(config.client_classes, vec!["acme/billing:Client"]);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            Config::from_toml_str("connection_file = \"x.bal\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
