//! SQLite storage backend for metadata triples.
//!
//! This crate keeps `(name, value, unit)` triples per item in a prefixed
//! SQLite table and implements
//! [`TripleStore`](mdschema_core::TripleStore), so a
//! [`Schema`](mdschema_core::Schema) can apply and extract records directly.
//!
//! - **`schema`**: SQL generation with customizable table prefixes
//! - **`migration`**: lifecycle operations (up/down/refresh/status)
//! - **`store`**: the transactional triple store
//!
//! # Quick start
//!
//! ```no_run
//! use mdschema_core::{Schema, Value};
//! use mdschema_sqlite::{Migration, SqliteTripleStore};
//! use rusqlite::Connection;
//!
//! let mut migration = Migration::new(Connection::open("metadata.db").unwrap(), "md_").unwrap();
//! migration.up().unwrap();
//! let mut store = SqliteTripleStore::new(migration.into_connection(), "md_").unwrap();
//!
//! let schema = Schema::from_json_str(&std::fs::read_to_string("book.json").unwrap()).unwrap();
//! let record = Value::from(serde_json::json!({"title": "Dune"}));
//! schema.apply(&mut store, "/zone/dune.pdf", record).unwrap();
//! println!("{:?}", schema.extract(&store, "/zone/dune.pdf").unwrap());
//! ```
//!
//! # Table prefix customization
//!
//! Table and index names are prefixed with a configurable string, allowing
//! multiple isolated stores within the same SQLite database. Prefixes must
//! contain only alphanumeric characters and underscores.

mod error;
mod migration;
mod schema;
mod store;

pub use error::{Result, SqliteError};
pub use migration::{Migration, MigrationStatus};
pub use schema::{generate_drop_sql, generate_schema_sql};
pub use store::SqliteTripleStore;
