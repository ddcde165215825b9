//! The schema orchestrator.
//!
//! A [`Schema`] owns the root composite built from a published source and
//! chains the pieces of the crate:
//!
//! - records go through validation, flattening and unit encoding on their
//!   way to storage ([`Schema::to_storage_triples`], [`Schema::apply`]);
//! - triples come back through decoding, unflattening and conversion
//!   ([`Schema::from_storage_triples`], [`Schema::extract`]).
//!
//! Storage names live under `"{prefix}.{schema name}"`, and every applied
//! record is tagged with a `__version__` triple holding the schema version.
//!
//! Each operation exists in two forms: `op` logs the advisory diagnostics
//! at `debug` level, `op_with` hands them to the caller.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::diagnostics::{Context, DiagnosticKind, Diagnostics, ValidateOptions};
use crate::error::{Error, Result, SchemaError};
use crate::fields::{CompositeField, Field, SchemaField};
use crate::source::SchemaSource;
use crate::store::TripleStore;
use crate::triple::{StorageTriple, UnitLayout, from_triples, to_triples};
use crate::value::Value;

/// Namespace under which all schemas store their triples.
pub const DEFAULT_PREFIX: &str = "mgs";

/// Last name segment of the version marker triple.
pub const VERSION_KEY: &str = "__version__";

/// Storage options of a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaOptions {
    /// First segment of every storage name.
    pub prefix: String,
    pub unit_layout: UnitLayout,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            unit_layout: UnitLayout::default(),
        }
    }
}

/// Outcome of [`Schema::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    /// Triples removed from the item (previous values and marker).
    pub removed: usize,
    /// Triples added, including the version marker.
    pub added: usize,
    /// Version recorded by the previous application, if any.
    pub previous_version: Option<String>,
}

/// A published metadata schema.
///
/// # Examples
///
/// ```
/// use mdschema_core::{MemoryStore, Schema, Value};
/// use serde_json::json;
///
/// let schema = Schema::from_json_str(r#"{
///     "schema_name": "book", "version": "1.0.0", "status": "published", "title": "Book",
///     "properties": {
///         "title": {"type": "text", "required": true},
///         "pages": {"type": "integer", "minimum": 1}
///     }
/// }"#).unwrap();
///
/// let mut store = MemoryStore::new();
/// let record = Value::from(json!({"title": "Dune", "pages": "412"}));
/// schema.apply(&mut store, "/zone/dune.pdf", record).unwrap();
///
/// let back = schema.extract(&store, "/zone/dune.pdf").unwrap();
/// assert_eq!(back, Value::from(json!({"title": "Dune", "pages": 412})));
/// ```
#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    version: String,
    title: String,
    options: SchemaOptions,
    root: CompositeField,
}

impl Schema {
    /// Builds a schema from a parsed source.
    ///
    /// # Errors
    ///
    /// Fails when the source is not published or a field declaration is
    /// invalid.
    pub fn from_source(source: SchemaSource, options: SchemaOptions) -> Result<Self> {
        if !source.is_published() {
            return Err(SchemaError::NotPublished {
                name: source.schema_name,
                status: source.status,
            }
            .into());
        }
        let fields = source.fields()?;
        let root = CompositeField::new(source.schema_name.as_str(), fields)?;
        let title = if source.title.is_empty() {
            source.schema_name.clone()
        } else {
            source.title
        };
        debug!(
            schema = %source.schema_name,
            version = %source.version,
            fields = root.fields().len(),
            "built schema"
        );
        Ok(Self {
            name: source.schema_name,
            version: source.version,
            title,
            options,
            root,
        })
    }

    /// Parses and builds a schema with default options.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Self::from_source(SchemaSource::from_json_str(text)?, SchemaOptions::default())
    }

    pub fn from_json_value(json: serde_json::Value) -> Result<Self> {
        Self::from_source(SchemaSource::from_json_value(json)?, SchemaOptions::default())
    }

    pub fn with_options(mut self, options: SchemaOptions) -> Self {
        self.options = options;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn options(&self) -> &SchemaOptions {
        &self.options
    }

    /// The root composite, named after the schema.
    pub fn root(&self) -> &CompositeField {
        &self.root
    }

    /// Common prefix of this schema's storage names, e.g. `mgs.book`.
    pub fn storage_prefix(&self) -> String {
        format!("{}.{}", self.options.prefix, self.name)
    }

    /// Name of the version marker triple, e.g. `mgs.book.__version__`.
    pub fn version_key(&self) -> String {
        format!("{}.{VERSION_KEY}", self.storage_prefix())
    }

    /// Top-level fields in declaration order.
    pub fn fields(&self) -> &[SchemaField] {
        self.root.fields()
    }

    /// Looks up a field by dotted path, e.g. `author.email`.
    pub fn field(&self, path: &str) -> Option<&SchemaField> {
        let segments: Vec<&str> = path.split('.').collect();
        self.root.resolve(&segments)
    }

    /// Top-level fields that must have a value.
    pub fn required_fields(&self) -> impl Iterator<Item = &SchemaField> {
        self.fields().iter().filter(|f| f.is_required())
    }

    /// Plain-text help for the whole schema.
    pub fn description(&self) -> String {
        format!(
            "{} (version {})\n{}",
            self.title,
            self.version,
            self.root.description()
        )
    }

    /// Validates a record, converting values first when `convert` is set.
    ///
    /// Returns the normalized record: defaults filled in, values in their
    /// canonical types.
    pub fn validate(&self, record: Value, convert: bool) -> Result<Value> {
        let mut diagnostics = Diagnostics::new();
        let result = self.validate_with(record, convert, &mut diagnostics);
        diagnostics.log();
        result
    }

    pub fn validate_with(&self, record: Value, convert: bool, diagnostics: &mut Diagnostics) -> Result<Value> {
        let options = ValidateOptions {
            convert,
            ..ValidateOptions::default()
        };
        let mut ctx = Context::new(diagnostics).with_options(options);
        Ok(self.root.validate(record, &mut ctx)?)
    }

    /// Converts a record to canonical types without validating it. Unknown
    /// keys are dropped.
    pub fn convert(&self, record: Value) -> Result<Value> {
        let mut diagnostics = Diagnostics::new();
        let result = self.convert_with(record, &mut diagnostics);
        diagnostics.log();
        result
    }

    pub fn convert_with(&self, record: Value, diagnostics: &mut Diagnostics) -> Result<Value> {
        let mut ctx = Context::new(diagnostics);
        Ok(self.root.convert(record, &mut ctx)?)
    }

    /// Validates a record and encodes it as storage triples. Nothing is
    /// produced unless the whole record is valid.
    pub fn to_storage_triples(&self, record: Value, convert: bool) -> Result<Vec<StorageTriple>> {
        let mut diagnostics = Diagnostics::new();
        let result = self.to_storage_triples_with(record, convert, &mut diagnostics);
        diagnostics.log();
        result
    }

    pub fn to_storage_triples_with(
        &self,
        record: Value,
        convert: bool,
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<StorageTriple>> {
        let record = self.validate_with(record, convert, diagnostics)?;
        Ok(to_triples(&self.storage_prefix(), &record, self.options.unit_layout)?)
    }

    /// Rebuilds a record from the triples of an item.
    ///
    /// Triples of other schemas and the version marker are ignored. Missing
    /// optional data is not an error; an item without triples of this schema
    /// yields an empty mapping.
    pub fn from_storage_triples(&self, triples: &[StorageTriple]) -> Result<Value> {
        let mut diagnostics = Diagnostics::new();
        let result = self.from_storage_triples_with(triples, &mut diagnostics);
        diagnostics.log();
        result
    }

    pub fn from_storage_triples_with(
        &self,
        triples: &[StorageTriple],
        diagnostics: &mut Diagnostics,
    ) -> Result<Value> {
        let prefix = self.storage_prefix();
        let version_key = self.version_key();
        self.check_version(triples, diagnostics);
        let own = triples
            .iter()
            .filter(|t| t.name != version_key && is_under(&t.name, &prefix));
        let raw = from_triples(&prefix, self.options.unit_layout, &self.root, own, diagnostics)?;
        self.convert_with(raw, diagnostics)
    }

    /// Replaces this schema's metadata on `item` with `record`.
    ///
    /// The record is validated and encoded before the store is touched, and
    /// the store receives a single atomic replace: the previous triples of
    /// this schema (marker included) out, the new ones plus a fresh marker
    /// in.
    pub fn apply<S: TripleStore>(&self, store: &mut S, item: &str, record: Value) -> Result<ApplyReport> {
        let mut diagnostics = Diagnostics::new();
        let result = self.apply_with(store, item, record, &mut diagnostics);
        diagnostics.log();
        result
    }

    pub fn apply_with<S: TripleStore>(
        &self,
        store: &mut S,
        item: &str,
        record: Value,
        diagnostics: &mut Diagnostics,
    ) -> Result<ApplyReport> {
        let mut add = self.to_storage_triples_with(record, true, diagnostics)?;
        let prefix = self.storage_prefix();
        let remove: Vec<StorageTriple> = store
            .list_triples(item)
            .map_err(Error::storage)?
            .into_iter()
            .filter(|t| is_under(&t.name, &prefix))
            .collect();
        let previous_version = self.check_version(&remove, diagnostics);
        add.push(StorageTriple::new(self.version_key(), self.version.as_str(), None));

        store.apply_replace(item, &remove, &add).map_err(Error::storage)?;
        info!(
            schema = %self.name,
            item,
            removed = remove.len(),
            added = add.len(),
            "applied metadata"
        );
        Ok(ApplyReport {
            removed: remove.len(),
            added: add.len(),
            previous_version,
        })
    }

    /// Reads this schema's metadata back from `item`.
    pub fn extract<S: TripleStore>(&self, store: &S, item: &str) -> Result<Value> {
        let mut diagnostics = Diagnostics::new();
        let result = self.extract_with(store, item, &mut diagnostics);
        diagnostics.log();
        result
    }

    pub fn extract_with<S: TripleStore>(
        &self,
        store: &S,
        item: &str,
        diagnostics: &mut Diagnostics,
    ) -> Result<Value> {
        let triples = store.list_triples(item).map_err(Error::storage)?;
        self.from_storage_triples_with(&triples, diagnostics)
    }

    /// Returns the stored marker version, warning when it differs from ours.
    fn check_version(&self, triples: &[StorageTriple], diagnostics: &mut Diagnostics) -> Option<String> {
        let version_key = self.version_key();
        let stored = triples.iter().find(|t| t.name == version_key)?.value.clone();
        if stored != self.version {
            warn!(
                schema = %self.name,
                stored = %stored,
                current = %self.version,
                "metadata was written with another schema version"
            );
            diagnostics.push(
                DiagnosticKind::VersionMismatch,
                version_key,
                format!("stored version {stored}, schema version {}", self.version),
            );
        }
        Some(stored)
    }
}

/// `name` is `prefix` itself or lies below it (`mgs.book` does not own
/// `mgs.bookshelf.x`).
fn is_under(name: &str, prefix: &str) -> bool {
    name.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}
