//! SQL schema generation with customizable table prefixes.
//!
//! # Table structure
//!
//! A single table holds every triple:
//!
//! - `{prefix}triples`: `(id, item, name, value, unit, position)`, where
//!   `position` keeps the insertion order of an item's triples
//!
//! Indexed by item (with position) and by name.
//!
//! # Custom prefix
//!
//! Prefixes must contain only alphanumeric characters and underscores.
//! This enables multiple isolated stores (e.g., `prod_`, `test_`) within
//! the same SQLite database.

use crate::error::{Result, SqliteError};

/// Validates that a table prefix contains only alphanumeric characters and underscores.
pub(crate) fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.is_empty() {
        return Err(SqliteError::InvalidPrefix(prefix.to_string()));
    }
    if !prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(SqliteError::InvalidPrefix(prefix.to_string()));
    }
    Ok(())
}

/// Generates the table and index definitions for the given prefix.
///
/// # Errors
///
/// Returns [`SqliteError::InvalidPrefix`] if the prefix contains characters
/// other than alphanumerics and underscores, or if it is empty.
pub fn generate_schema_sql(prefix: &str) -> Result<String> {
    validate_prefix(prefix)?;

    let sql = format!(
        r#"
CREATE TABLE IF NOT EXISTS {prefix}triples (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    item TEXT NOT NULL,
    name TEXT NOT NULL,
    value TEXT NOT NULL,
    unit TEXT,
    position INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_{prefix}triples_item ON {prefix}triples(item, position);
CREATE INDEX IF NOT EXISTS idx_{prefix}triples_name ON {prefix}triples(name);
"#
    );

    Ok(sql)
}

/// Generates SQL to drop the triple table and its indexes.
///
/// # Errors
///
/// Returns [`SqliteError::InvalidPrefix`] if the prefix is invalid.
pub fn generate_drop_sql(prefix: &str) -> Result<String> {
    validate_prefix(prefix)?;

    let sql = format!(
        r#"
DROP INDEX IF EXISTS idx_{prefix}triples_name;
DROP INDEX IF EXISTS idx_{prefix}triples_item;
DROP TABLE IF EXISTS {prefix}triples;
"#
    );

    Ok(sql)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_prefix() {
        assert!(validate_prefix("md_").is_ok());
        assert!(validate_prefix("test123").is_ok());
        assert!(validate_prefix("A_B_C").is_ok());
    }

    #[test]
    fn test_invalid_prefix() {
        assert!(validate_prefix("").is_err());
        assert!(validate_prefix("drop;--").is_err());
        assert!(validate_prefix("hello world").is_err());
        assert!(validate_prefix("test-prefix").is_err());
        assert!(validate_prefix("mgs.book").is_err());
    }

    #[test]
    fn test_generate_schema_sql() {
        let sql = generate_schema_sql("md_").unwrap();
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS md_triples"));
        assert!(sql.contains("idx_md_triples_item"));
        assert!(sql.contains("idx_md_triples_name"));
        assert!(generate_schema_sql("bad prefix").is_err());
    }

    #[test]
    fn test_generate_drop_sql() {
        let sql = generate_drop_sql("md_").unwrap();
        assert!(sql.contains("DROP TABLE IF EXISTS md_triples"));
        assert!(generate_drop_sql("").is_err());
    }

    #[test]
    fn test_schema_sql_executes() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(&generate_schema_sql("t_").unwrap()).unwrap();
        conn.execute(
            "INSERT INTO t_triples (item, name, value, unit, position) VALUES ('a', 'n', 'v', NULL, 0)",
            [],
        )
        .unwrap();
        assert!(
            conn.execute(
                "INSERT INTO t_triples (item, name, value, unit, position) VALUES ('a', 'n', NULL, NULL, 1)",
                [],
            )
            .is_err()
        );
        conn.execute_batch(&generate_drop_sql("t_").unwrap()).unwrap();
    }
}
