//! Registry of published metadata schemas.
//!
//! This crate loads schema sources from directories of JSON files or JSON
//! bundles, keeps the highest published version of each schema, and reads
//! its configuration from YAML.
//!
//! # Quick start
//!
//! ```no_run
//! use mdschema_db::{RegistryConfig, SchemaRegistry};
//!
//! // Load schemas from a directory
//! let registry = SchemaRegistry::from_dir("schemas/").unwrap();
//! if let Some(book) = registry.get("book") {
//!     println!("book has {} fields", book.fields().len());
//! }
//!
//! // Or from a configuration file listing the sources
//! let config = RegistryConfig::load("mdschema.yml").unwrap();
//! let registry = SchemaRegistry::from_config(&config).unwrap();
//! ```

mod config;
mod error;
mod loader;

pub use config::RegistryConfig;
pub use error::{RegistryError, Result};
pub use loader::{RegistryBuilder, RegistrySource, SchemaRegistry, compare_versions};
