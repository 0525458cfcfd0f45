//! Config file loading.

use std::fs;
use std::path::Path;

use crate::domain::address_manager::AddressManagerConfig;
use crate::domain::ConfigError;

/// TOML-based configuration provider.
///
/// # Config File Format
///
/// Either a bare document or an `[addrmgr]` table:
///
/// ```toml
/// [addrmgr]
/// peers_filename = "peers.json"
/// tried_bucket_size = 256
/// dump_interval_secs = 600
/// ```
#[derive(Debug, Clone)]
pub struct TomlConfigProvider {
    config: AddressManagerConfig,
}

impl TomlConfigProvider {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, parsed, or validated.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let table: toml::Table = toml::from_str(content)?;
        let config = match table.get("addrmgr") {
            Some(section) => {
                let config = section.clone().try_into::<AddressManagerConfig>()?;
                config.validate()?;
                config
            }
            None => AddressManagerConfig::from_toml_str(content)?,
        };
        Ok(Self { config })
    }

    /// The loaded configuration.
    pub fn config(&self) -> &AddressManagerConfig {
        &self.config
    }

    /// Take the loaded configuration.
    pub fn into_config(self) -> AddressManagerConfig {
        self.config
    }
}
