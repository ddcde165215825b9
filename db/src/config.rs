//! Registry configuration.
//!
//! A YAML file naming where schema sources live and how their metadata is
//! laid out in storage.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! prefix: mgs
//! unit_layout: list-indices
//! schema_dirs:
//!   - /etc/mdschema/schemas
//! bundles:
//!   - /usr/share/mdschema/schemas.json
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use mdschema_core::{DEFAULT_PREFIX, SchemaOptions, UnitLayout};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Top-level registry configuration.
///
/// Omitted keys take their defaults: prefix `mgs`, the `list-indices` unit
/// layout and no sources.
///
/// # Examples
///
/// ```
/// use mdschema_db::RegistryConfig;
/// use mdschema_core::UnitLayout;
///
/// let config: RegistryConfig = serde_yaml::from_str("schema_dirs: [schemas]").unwrap();
/// assert_eq!(config.prefix, "mgs");
/// assert_eq!(config.unit_layout, UnitLayout::ListIndices);
/// assert_eq!(config.schema_dirs.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Configuration format version (e.g., `"1.0"`).
    pub version: String,
    /// First segment of every storage name.
    pub prefix: String,
    pub unit_layout: UnitLayout,
    /// Directories of `*.json` schema sources, tried first.
    pub schema_dirs: Vec<PathBuf>,
    /// JSON bundle files, tried after the directories.
    pub bundles: Vec<PathBuf>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            prefix: DEFAULT_PREFIX.to_string(),
            unit_layout: UnitLayout::default(),
            schema_dirs: Vec::new(),
            bundles: Vec::new(),
        }
    }
}

impl RegistryConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::RegistryError::Io) if the file cannot be read,
    /// or [`Yaml`](crate::RegistryError::Yaml) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Storage options derived from this configuration.
    pub fn schema_options(&self) -> SchemaOptions {
        SchemaOptions {
            prefix: self.prefix.clone(),
            unit_layout: self.unit_layout,
        }
    }
}
