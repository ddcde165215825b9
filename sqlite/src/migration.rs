//! Migration lifecycle operations for the triple table.
//!
//! # Example
//!
//! ```no_run
//! use mdschema_sqlite::Migration;
//! use rusqlite::Connection;
//!
//! let conn = Connection::open("metadata.db").unwrap();
//! let mut migration = Migration::new(conn, "md_").unwrap();
//!
//! migration.up().unwrap();
//! let status = migration.status().unwrap();
//! assert!(status.tables_exist);
//! ```

use rusqlite::Connection;
use tracing::info;

use crate::error::{Result, SqliteError};
use crate::schema::{generate_drop_sql, generate_schema_sql, validate_prefix};

/// Manages the lifecycle of the triple table.
///
/// [`up`](Self::up) creates it, [`down`](Self::down) drops it and
/// [`status`](Self::status) reports what is stored. Both mutations run in a
/// transaction.
pub struct Migration {
    conn: Connection,
    prefix: String,
}

impl Migration {
    /// Creates a new migration manager for the given connection and table prefix.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::InvalidPrefix`] if the prefix contains invalid characters.
    pub fn new(conn: Connection, prefix: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        validate_prefix(&prefix)?;
        Ok(Self { conn, prefix })
    }

    /// Creates the table and indexes. Safe to call repeatedly.
    pub fn up(&mut self) -> Result<()> {
        let sql = generate_schema_sql(&self.prefix)?;
        let tx = self.conn.transaction()?;
        tx.execute_batch(&sql)
            .map_err(|e| SqliteError::Migration(format!("failed to create tables: {e}")))?;
        tx.commit()?;
        info!(prefix = %self.prefix, "created triple table");
        Ok(())
    }

    /// Drops the table and indexes. Safe to call when they do not exist.
    pub fn down(&mut self) -> Result<()> {
        let sql = generate_drop_sql(&self.prefix)?;
        let tx = self.conn.transaction()?;
        tx.execute_batch(&sql)
            .map_err(|e| SqliteError::Migration(format!("failed to drop tables: {e}")))?;
        tx.commit()?;
        info!(prefix = %self.prefix, "dropped triple table");
        Ok(())
    }

    /// Drops and recreates the table, discarding all triples.
    pub fn refresh(&mut self) -> Result<()> {
        self.down()?;
        self.up()
    }

    /// Returns whether the table exists and how much it holds.
    pub fn status(&self) -> Result<MigrationStatus> {
        if !self.tables_exist()? {
            return Ok(MigrationStatus::default());
        }

        let triple_count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}triples", self.prefix),
            [],
            |row| row.get(0),
        )?;
        let item_count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(DISTINCT item) FROM {}triples", self.prefix),
            [],
            |row| row.get(0),
        )?;

        Ok(MigrationStatus {
            tables_exist: true,
            item_count: item_count as usize,
            triple_count: triple_count as usize,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Consumes the migration and returns the underlying connection.
    pub fn into_connection(self) -> Connection {
        self.conn
    }

    fn tables_exist(&self) -> Result<bool> {
        let table_name = format!("{}triples", self.prefix);
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
            [&table_name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

/// Snapshot returned by [`Migration::status`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationStatus {
    /// Whether the triple table exists in the database.
    pub tables_exist: bool,
    /// Number of distinct items holding triples.
    pub item_count: usize,
    /// Number of triples stored.
    pub triple_count: usize,
}
