use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MedMinderError, Result};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StorageConfig {
    pub data_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    pub storage: Option<StorageConfig>,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| MedMinderError::Config(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| MedMinderError::Config(e.to_string()))
    }

    /// Configured data directory, or the default when unset or blank.
    pub fn data_dir(&self) -> String {
        self.storage
            .as_ref()
            .and_then(|s| s.data_dir.clone())
            .map(|dir| dir.trim().to_string())
            .filter(|dir| !dir.is_empty())
            .unwrap_or_else(default_data_dir)
    }
}

pub fn default_data_dir() -> String {
    "./data/medminder".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_default_data_dir() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.data_dir(), default_data_dir());
    }

    #[test]
    fn configured_data_dir_wins() {
        let config: Config =
            serde_json::from_str(r#"{"storage":{"data_dir":"/tmp/meds"}}"#).unwrap();
        assert_eq!(config.data_dir(), "/tmp/meds");
    }

    #[test]
    fn blank_data_dir_falls_back() {
        let config: Config = serde_json::from_str(r#"{"storage":{"data_dir":"  "}}"#).unwrap();
        assert_eq!(config.data_dir(), default_data_dir());
    }
}
