//! [`TripleStore`] implementation over the prefixed triple table.
//!
//! # Example
//!
//! ```no_run
//! use mdschema_core::{StorageTriple, TripleStore};
//! use mdschema_sqlite::{Migration, SqliteTripleStore};
//! use rusqlite::Connection;
//!
//! let mut migration = Migration::new(Connection::open("metadata.db").unwrap(), "md_").unwrap();
//! migration.up().unwrap();
//!
//! let mut store = SqliteTripleStore::new(migration.into_connection(), "md_").unwrap();
//! let title = StorageTriple::new("mgs.book.title", "Dune", None);
//! store.apply_replace("/zone/dune.pdf", &[], &[title]).unwrap();
//! assert_eq!(store.list_triples("/zone/dune.pdf").unwrap().len(), 1);
//! ```

use mdschema_core::{StorageTriple, TripleStore};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::error::{Result, SqliteError};
use crate::schema::validate_prefix;

/// Triples per item in SQLite. The table must exist (see
/// [`Migration::up`](crate::Migration::up)).
///
/// Each [`apply_replace`](TripleStore::apply_replace) runs in one
/// transaction: when a triple to remove is not found, nothing changes.
pub struct SqliteTripleStore {
    conn: Connection,
    prefix: String,
}

impl SqliteTripleStore {
    /// Wraps a connection whose triple table uses `prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::InvalidPrefix`] if the prefix is invalid.
    pub fn new(conn: Connection, prefix: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        validate_prefix(&prefix)?;
        Ok(Self { conn, prefix })
    }

    /// Items holding at least one triple, sorted.
    pub fn items(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT DISTINCT item FROM {}triples ORDER BY item",
            self.prefix
        ))?;
        let items = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// Removes every triple of `item`, returning how many were deleted.
    pub fn clear(&mut self, item: &str) -> Result<usize> {
        let deleted = self.conn.execute(
            &format!("DELETE FROM {}triples WHERE item = ?1", self.prefix),
            [item],
        )?;
        debug!(item, deleted, "cleared item");
        Ok(deleted)
    }

    /// Returns a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Consumes the store and returns the underlying connection.
    pub fn into_connection(self) -> Connection {
        self.conn
    }
}

impl TripleStore for SqliteTripleStore {
    type Error = SqliteError;

    fn list_triples(&self, item: &str) -> Result<Vec<StorageTriple>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT name, value, unit FROM {}triples WHERE item = ?1 ORDER BY position, id",
            self.prefix
        ))?;
        let triples = stmt
            .query_map([item], |row| {
                Ok(StorageTriple::new(
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(triples)
    }

    fn apply_replace(&mut self, item: &str, remove: &[StorageTriple], add: &[StorageTriple]) -> Result<()> {
        let prefix = &self.prefix;
        let tx = self.conn.transaction()?;

        for triple in remove {
            let id: Option<i64> = tx
                .query_row(
                    &format!(
                        "SELECT id FROM {prefix}triples \
                         WHERE item = ?1 AND name = ?2 AND value = ?3 AND unit IS ?4 \
                         ORDER BY position, id LIMIT 1"
                    ),
                    params![item, triple.name, triple.value, triple.unit],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(id) = id else {
                return Err(SqliteError::MissingTriple {
                    item: item.to_string(),
                    triple: triple.to_string(),
                });
            };
            tx.execute(&format!("DELETE FROM {prefix}triples WHERE id = ?1"), [id])?;
        }

        let next: i64 = tx.query_row(
            &format!("SELECT COALESCE(MAX(position) + 1, 0) FROM {prefix}triples WHERE item = ?1"),
            [item],
            |row| row.get(0),
        )?;
        {
            let mut insert = tx.prepare(&format!(
                "INSERT INTO {prefix}triples (item, name, value, unit, position) VALUES (?1, ?2, ?3, ?4, ?5)"
            ))?;
            for (offset, triple) in (0_i64..).zip(add) {
                insert.execute(params![item, triple.name, triple.value, triple.unit, next + offset])?;
            }
        }
        tx.commit()?;

        debug!(item, removed = remove.len(), added = add.len(), "replaced triples");
        Ok(())
    }
}
