//! Typed metadata schemas over a flat `(name, value, unit)` triple store.
//!
//! Attribute stores attached to storage items hold flat triples and know
//! nothing of nesting. This crate validates nested metadata records against
//! a declarative schema and encodes them losslessly to triples and back:
//!
//! - [`Value`] / [`Map`]: the dynamic record model.
//! - [`Field`] / [`SchemaField`]: the field hierarchy (text, email, url,
//!   checkbox, integer/float, date/time/datetime, select, object) with
//!   [`RepeatableField`] for lists. Each field converts, validates and
//!   fills defaults recursively.
//! - [`flatten()`] / [`unflatten`]: nested values to dotted paths with `[i]`
//!   list indices, and back.
//! - [`triple`]: paths to storage names with list positions in the unit.
//! - [`Schema`]: the orchestrator, built from a [`SchemaSource`], that
//!   validates, encodes, applies to and extracts from a [`TripleStore`].
//!
//! Soft conditions (unknown keys dropped, defaults applied, ...) are
//! collected as [`Diagnostics`] rather than failing.
//!
//! # Example
//!
//! ```
//! use mdschema_core::*;
//! use serde_json::json;
//!
//! let schema = Schema::from_json_value(json!({
//!     "schema_name": "book",
//!     "version": "2.0.0",
//!     "status": "published",
//!     "title": "Book",
//!     "properties": {
//!         "title": {"type": "text", "required": true},
//!         "author": {
//!             "type": "object",
//!             "repeatable": true,
//!             "properties": {
//!                 "name": {"type": "text", "required": true},
//!                 "email": {"type": "email"}
//!             }
//!         }
//!     }
//! }))
//! .unwrap();
//!
//! let record = Value::from(json!({
//!     "title": "Good Omens",
//!     "author": [{"name": "Terry"}, {"name": "Neil", "email": "neil@example.org"}]
//! }));
//! let triples = schema.to_storage_triples(record.clone(), true).unwrap();
//! assert_eq!(triples[3], StorageTriple::new("mgs.book.author.email", "neil@example.org", Some("2".into())));
//!
//! assert_eq!(schema.from_storage_triples(&triples).unwrap(), record);
//! ```

mod diagnostics;
mod error;
mod fields;
pub mod flatten;
mod schema;
mod source;
mod store;
pub mod triple;
mod value;

pub use diagnostics::{Context, Diagnostic, DiagnosticKind, Diagnostics, ValidateOptions};
pub use error::{CodecError, Error, FieldError, Result, SchemaError};
pub use fields::{
    BooleanField, CompositeField, DateField, DateTimeField, EmailField, Field, FieldType,
    MultipleField, Number, NumericField, NumericKind, RepeatableField, SchemaField, TextField,
    TimeField, UrlField,
};
pub use flatten::{FlatEntry, Flatten, flatten, unflatten};
pub use schema::{ApplyReport, DEFAULT_PREFIX, Schema, SchemaOptions, VERSION_KEY};
pub use source::{FieldDeclaration, PUBLISHED, REQUIRED_KEYS, SchemaSource};
pub use store::{MemoryStore, MemoryStoreError, TripleStore};
pub use triple::{FieldLookup, StorageTriple, TripleDecoder, UnitLayout};
pub use value::{Map, Value};
