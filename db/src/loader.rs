//! Schema registry loading with builder pattern and fallback chains.
//!
//! Provides [`SchemaRegistry`] for lookup of published schemas by name and
//! [`RegistryBuilder`] for constructing a registry from multiple sources with
//! automatic fallback.
//!
//! # Loading patterns
//!
//! ```no_run
//! use mdschema_db::SchemaRegistry;
//!
//! // Load from a directory of JSON schema sources
//! let registry = SchemaRegistry::from_dir("schemas/").unwrap();
//! assert!(registry.get("book").is_some());
//!
//! // Load from a single JSON array of sources
//! let registry = SchemaRegistry::from_bundle("schemas.json").unwrap();
//!
//! // Use the builder for a fallback chain
//! let registry = SchemaRegistry::builder()
//!     .from_dir("schemas/")
//!     .from_bundle("schemas.json")
//!     .build()
//!     .unwrap();
//! ```
//!
//! Only published sources are registered. When several versions of the same
//! schema are found, the highest version wins.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use mdschema_core::{Schema, SchemaOptions, SchemaSource};
use tracing::{debug, warn};

use crate::config::RegistryConfig;
use crate::error::{RegistryError, Result};

/// Describes where a [`SchemaRegistry`] was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrySource {
    /// Loaded from a directory of individual JSON source files.
    Directory(PathBuf),
    /// Loaded from a single JSON array of sources.
    Bundle(PathBuf),
    /// Loaded via a fallback chain of multiple sources.
    Multiple(Vec<RegistrySource>),
}

/// Published schemas indexed by schema name.
///
/// # Examples
///
/// ```no_run
/// use mdschema_db::SchemaRegistry;
///
/// let registry = SchemaRegistry::from_dir("schemas/").unwrap();
/// println!("Loaded {} schemas", registry.len());
///
/// if let Some(book) = registry.get("book") {
///     println!("book is at version {}", book.version());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Schema>,
    options: SchemaOptions,
    source: RegistrySource,
}

impl SchemaRegistry {
    /// Returns a new [`RegistryBuilder`] for configuring a fallback chain.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Loads every `*.json` source in a directory, with default options.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Io`] if the directory or a file cannot be
    /// read, [`RegistryError::Json`] for malformed JSON and
    /// [`RegistryError::Schema`] for a source that is not a valid schema.
    pub fn from_dir(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_dir(path.as_ref(), SchemaOptions::default())
    }

    /// Loads sources from a single JSON file holding an array of them.
    ///
    /// # Errors
    ///
    /// Same as [`from_dir`](Self::from_dir).
    pub fn from_bundle(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_bundle(path.as_ref(), SchemaOptions::default())
    }

    /// Builds a registry from a configuration: its directories first, then
    /// its bundles, with the configured storage options.
    pub fn from_config(config: &RegistryConfig) -> Result<Self> {
        let mut builder = Self::builder().with_options(config.schema_options());
        for dir in &config.schema_dirs {
            builder = builder.from_dir(dir);
        }
        for bundle in &config.bundles {
            builder = builder.from_bundle(bundle);
        }
        builder.build()
    }

    fn empty(options: SchemaOptions, source: RegistrySource) -> Self {
        Self {
            schemas: HashMap::new(),
            options,
            source,
        }
    }

    fn load_dir(path: &Path, options: SchemaOptions) -> Result<Self> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let file_path = entry?.path();
            if file_path.extension().and_then(|e| e.to_str()) == Some("json") {
                files.push(file_path);
            }
        }
        files.sort();

        let mut registry = Self::empty(options, RegistrySource::Directory(path.to_path_buf()));
        for file_path in files {
            let reader = BufReader::new(std::fs::File::open(&file_path)?);
            let json: serde_json::Value = serde_json::from_reader(reader)?;
            registry.register_source(SchemaSource::from_json_value(json)?, &file_path)?;
        }
        debug!(dir = %path.display(), schemas = registry.len(), "loaded schema directory");
        Ok(registry)
    }

    fn load_bundle(path: &Path, options: SchemaOptions) -> Result<Self> {
        let reader = BufReader::new(std::fs::File::open(path)?);
        let sources: Vec<serde_json::Value> = serde_json::from_reader(reader)?;

        let mut registry = Self::empty(options, RegistrySource::Bundle(path.to_path_buf()));
        for json in sources {
            registry.register_source(SchemaSource::from_json_value(json)?, path)?;
        }
        debug!(bundle = %path.display(), schemas = registry.len(), "loaded schema bundle");
        Ok(registry)
    }

    fn register_source(&mut self, source: SchemaSource, origin: &Path) -> Result<()> {
        if !source.is_published() {
            warn!(
                schema = %source.schema_name,
                version = %source.version,
                status = %source.status,
                origin = %origin.display(),
                "skipping unpublished schema"
            );
            return Ok(());
        }
        let schema = Schema::from_source(source, self.options.clone())?;
        self.register(schema);
        Ok(())
    }

    /// Adds a schema unless a higher version of it is already registered.
    ///
    /// Returns `true` when the schema was stored.
    pub fn register(&mut self, schema: Schema) -> bool {
        let existing = self.schemas.get(schema.name());
        if let Some(existing) = existing.filter(|e| compare_versions(e.version(), schema.version()) != Ordering::Less) {
            debug!(
                schema = %schema.name(),
                kept = %existing.version(),
                ignored = %schema.version(),
                "keeping higher schema version"
            );
            return false;
        }
        self.schemas.insert(schema.name().to_string(), schema);
        true
    }

    /// Inserts a schema, replacing any entry with the same name regardless
    /// of version.
    pub fn insert(&mut self, schema: Schema) -> Option<Schema> {
        self.schemas.insert(schema.name().to_string(), schema)
    }

    /// Looks up a schema by name.
    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    /// Returns `true` if the registry contains a schema called `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Registered schema names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Storage options every registered schema was built with.
    pub fn options(&self) -> &SchemaOptions {
        &self.options
    }

    /// Returns a reference to the source metadata.
    pub fn source(&self) -> &RegistrySource {
        &self.source
    }

    /// Merges another registry into this one, keeping the higher version of
    /// each schema.
    fn absorb(&mut self, other: SchemaRegistry) {
        for schema in other.schemas.into_values() {
            self.register(schema);
        }
    }
}

/// Builder for constructing a [`SchemaRegistry`] with a fallback chain.
///
/// Sources are tried in the order they are added and every source that
/// loads contributes its schemas. Sources that fail are skipped with a
/// warning; if none loads, [`RegistryError::NoSourcesAvailable`] is returned.
///
/// # Example
///
/// ```no_run
/// use mdschema_db::SchemaRegistry;
///
/// let registry = SchemaRegistry::builder()
///     .from_dir("/opt/schemas/")
///     .from_bundle("/opt/schemas.json")
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct RegistryBuilder {
    sources: Vec<RegistrySource>,
    options: SchemaOptions,
}

impl RegistryBuilder {
    /// Creates a new builder with no sources and default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a directory of JSON source files.
    pub fn from_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(RegistrySource::Directory(path.into()));
        self
    }

    /// Adds a JSON bundle file.
    pub fn from_bundle(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(RegistrySource::Bundle(path.into()));
        self
    }

    /// Storage options for every schema the registry builds.
    pub fn with_options(mut self, options: SchemaOptions) -> Self {
        self.options = options;
        self
    }

    /// Loads all configured sources in order.
    pub fn build(self) -> Result<SchemaRegistry> {
        let mut merged: Option<SchemaRegistry> = None;
        for source in &self.sources {
            let result = match source {
                RegistrySource::Directory(path) => SchemaRegistry::load_dir(path, self.options.clone()),
                RegistrySource::Bundle(path) => SchemaRegistry::load_bundle(path, self.options.clone()),
                RegistrySource::Multiple(_) => continue,
            };
            match result {
                Ok(registry) => match merged.as_mut() {
                    Some(acc) => acc.absorb(registry),
                    None => merged = Some(registry),
                },
                Err(err) => warn!(source = ?source, error = %err, "schema source failed to load"),
            }
        }

        let mut registry = merged.ok_or(RegistryError::NoSourcesAvailable)?;
        registry.source = RegistrySource::Multiple(self.sources);
        Ok(registry)
    }
}

/// Compares dotted version strings segment by segment, numerically where
/// both segments are numbers. Missing segments count as lower.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let order = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    _ => x.cmp(y),
                };
                if order != Ordering::Equal {
                    return order;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source(name: &str, version: &str, status: &str) -> serde_json::Value {
        json!({
            "schema_name": name,
            "version": version,
            "status": status,
            "title": name,
            "properties": {"title": {"type": "text", "required": true}}
        })
    }

    fn write_source(dir: &Path, file: &str, source: &serde_json::Value) {
        std::fs::write(dir.join(file), serde_json::to_vec_pretty(source).unwrap()).unwrap();
    }

    #[test]
    fn test_compare_versions() {
        assert_eq!(compare_versions("1.10.0", "1.9.3"), Ordering::Greater);
        assert_eq!(compare_versions("2.0.0", "2.0.0"), Ordering::Equal);
        assert_eq!(compare_versions("1.0", "1.0.1"), Ordering::Less);
        assert_eq!(compare_versions("1.0.0-rc", "1.0.0-rc"), Ordering::Equal);
    }

    #[test]
    fn test_from_dir_skips_unpublished_and_keeps_highest() {
        let dir = tempfile::tempdir().unwrap();
        write_source(dir.path(), "book-1.9.0.json", &source("book", "1.9.0", "published"));
        write_source(dir.path(), "book-1.10.0.json", &source("book", "1.10.0", "published"));
        write_source(dir.path(), "book-2.0.0.json", &source("book", "2.0.0", "draft"));
        write_source(dir.path(), "film-1.0.0.json", &source("film", "1.0.0", "published"));
        std::fs::write(dir.path().join("notes.txt"), "not a schema").unwrap();

        let registry = SchemaRegistry::from_dir(dir.path()).unwrap();
        assert_eq!(registry.names(), ["book", "film"]);
        assert_eq!(registry.get("book").unwrap().version(), "1.10.0");
        assert_eq!(registry.source(), &RegistrySource::Directory(dir.path().to_path_buf()));
    }

    #[test]
    fn test_from_dir_rejects_invalid_source() {
        let dir = tempfile::tempdir().unwrap();
        write_source(dir.path(), "broken.json", &json!({"schema_name": "broken"}));
        let err = SchemaRegistry::from_dir(dir.path()).unwrap_err();
        assert!(matches!(err, RegistryError::Schema(_)));
    }

    #[test]
    fn test_register_and_insert() {
        let old = Schema::from_json_value(source("book", "1.0.0", "published")).unwrap();
        let new = Schema::from_json_value(source("book", "1.1.0", "published")).unwrap();
        let mut registry = SchemaRegistry::empty(SchemaOptions::default(), RegistrySource::Multiple(vec![]));

        assert!(registry.register(new.clone()));
        assert!(!registry.register(old.clone()));
        assert_eq!(registry.get("book").unwrap().version(), "1.1.0");

        let replaced = registry.insert(old).unwrap();
        assert_eq!(replaced.version(), "1.1.0");
        assert_eq!(registry.get("book").unwrap().version(), "1.0.0");
    }

    #[test]
    fn test_builder_all_fail() {
        let result = SchemaRegistry::builder()
            .from_dir("/nonexistent/dir1/")
            .from_bundle("/nonexistent/bundle1.json")
            .build();
        assert!(matches!(result, Err(RegistryError::NoSourcesAvailable)));
    }

    #[test]
    fn test_builder_without_sources() {
        assert!(matches!(
            RegistryBuilder::new().build(),
            Err(RegistryError::NoSourcesAvailable)
        ));
    }
}
