use super::dialect::{DdlDialect, SqliteDialect};
use anyhow::{bail, Result};
use rusqlite::{params, Connection};

#[macro_export]
macro_rules! sqlite_column {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {
        {
            // Allow unused_mut because the variable is only mutated when optional
            // field assignments are passed to the macro (e.g., `non_null = true`)
            #[allow(unused_mut)]
            let mut column = $crate::sqlite_persistence::Column {
                name: $name,
                sql_type: $sql_type,
                is_primary_key: false,
                non_null: false,
                default_value: None,
            };
            $(
                column.$field = $value;
            )*
            column
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
    BigInt,
    Double,
    DateTime,
}

#[derive(Debug)]
pub struct Column {
    pub name: &'static str,
    pub sql_type: SqlType,
    /// Single-column primary key, rendered inline.
    pub is_primary_key: bool,
    pub non_null: bool,
    /// Raw SQL default expression, e.g. `0` or `'0000-00-00 00:00:00'`.
    pub default_value: Option<&'static str>,
}

/// Static description of one table.
///
/// `primary_key` lists the columns of a table-level (possibly composite) key.
/// When it is empty, columns flagged with `is_primary_key` are used instead.
#[derive(Debug)]
pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column],
    pub primary_key: &'static [&'static str],
}

impl Table {
    pub fn primary_key_columns(&self) -> Vec<&'static str> {
        if !self.primary_key.is_empty() {
            return self.primary_key.to_vec();
        }
        self.columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name)
            .collect()
    }

    pub fn create(&self, conn: &Connection) -> Result<()> {
        let create_sql = SqliteDialect.create_table_sql(self.name, self);
        conn.execute(&create_sql, params![])?;
        Ok(())
    }

    /// Checks the live table against this definition: column names and
    /// order, declared types, nullability, defaults and primary key.
    pub fn validate(&self, conn: &Connection) -> Result<()> {
        struct ActualColumn {
            name: String,
            declared_type: String,
            non_null: bool,
            default_value: Option<String>,
            pk_position: i32,
        }

        let mut stmt = conn.prepare(&format!(
            "PRAGMA table_info({});",
            SqliteDialect.quote_identifier(self.name)
        ))?;
        let actual_columns: Vec<ActualColumn> = stmt
            .query_map(params![], |row| {
                Ok(ActualColumn {
                    name: row.get(1)?,
                    declared_type: row.get(2)?,
                    non_null: row.get::<_, i32>(3)? == 1,
                    default_value: row.get(4)?,
                    pk_position: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        if actual_columns.is_empty() {
            bail!("Table {} does not exist", self.name);
        }

        if actual_columns.len() != self.columns.len() {
            bail!(
                "Table {} has {} columns, expected {}. Found column names: {}, expected: {}",
                self.name,
                actual_columns.len(),
                self.columns.len(),
                actual_columns
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                self.columns
                    .iter()
                    .map(|c| c.name)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        let primary_key = self.primary_key_columns();
        for (actual_column, expected_column) in actual_columns.iter().zip(self.columns.iter()) {
            if actual_column.name != expected_column.name {
                bail!(
                    "Table {} Column name mismatch: expected {}, got {}",
                    self.name,
                    expected_column.name,
                    actual_column.name
                );
            }
            let expected_type = SqliteDialect.type_name(expected_column.sql_type);
            if !actual_column.declared_type.eq_ignore_ascii_case(expected_type) {
                bail!(
                    "Table {} Column {} type mismatch: expected {}, got {}",
                    self.name,
                    expected_column.name,
                    expected_type,
                    actual_column.declared_type
                );
            }
            if actual_column.non_null != expected_column.non_null {
                bail!(
                    "Table {} Column {} non-null mismatch: expected {}, got {}",
                    self.name,
                    expected_column.name,
                    expected_column.non_null,
                    actual_column.non_null
                );
            }

            // Default values might be wrapped in parentheses, so we strip them before comparing
            if actual_column
                .default_value
                .as_ref()
                .map(strip_leading_and_trailing_parentheses)
                != expected_column
                    .default_value
                    .map(strip_leading_and_trailing_parentheses)
            {
                bail!(
                    "Table {} Column {} default value mismatch: expected {:?}, got {:?}",
                    self.name,
                    expected_column.name,
                    expected_column.default_value,
                    actual_column.default_value
                );
            }

            let expected_in_key = primary_key.contains(&expected_column.name);
            if (actual_column.pk_position > 0) != expected_in_key {
                bail!(
                    "Table {} Column {} primary key mismatch: expected {}, got {}",
                    self.name,
                    expected_column.name,
                    expected_in_key,
                    actual_column.pk_position > 0
                );
            }
        }
        Ok(())
    }
}

fn strip_leading_and_trailing_parentheses<S: AsRef<str>>(s: S) -> String {
    let s = s.as_ref();
    if s.starts_with('(') && s.ends_with(')') {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}

pub struct VersionedSchema {
    pub version: usize,
    pub tables: &'static [Table],
}

impl VersionedSchema {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            table.create(conn)?;
        }
        conn.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + self.version),
            [],
        )?;
        Ok(())
    }

    pub fn validate(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            table.validate(conn)?;
        }
        Ok(())
    }
}

pub const BASE_DB_VERSION: usize = 99999;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite_column;

    const TEST_TABLE: Table = Table {
        name: "test_table",
        columns: &[
            sqlite_column!("id", SqlType::Integer, is_primary_key = true),
            sqlite_column!("name", SqlType::Text, non_null = true),
            sqlite_column!(
                "amount",
                SqlType::Double,
                non_null = true,
                default_value = Some("0")
            ),
        ],
        primary_key: &[],
    };

    const COMPOSITE_TABLE: Table = Table {
        name: "composite_table",
        columns: &[
            sqlite_column!("left_id", SqlType::BigInt, non_null = true),
            sqlite_column!("right_id", SqlType::BigInt, non_null = true),
            sqlite_column!("created", SqlType::DateTime),
        ],
        primary_key: &["left_id", "right_id"],
    };

    #[test]
    fn test_created_table_validates() {
        let conn = Connection::open_in_memory().unwrap();
        TEST_TABLE.create(&conn).unwrap();
        TEST_TABLE.validate(&conn).unwrap();
    }

    #[test]
    fn test_composite_primary_key_validates() {
        let conn = Connection::open_in_memory().unwrap();
        COMPOSITE_TABLE.create(&conn).unwrap();
        COMPOSITE_TABLE.validate(&conn).unwrap();
        assert_eq!(
            COMPOSITE_TABLE.primary_key_columns(),
            vec!["left_id", "right_id"]
        );
    }

    #[test]
    fn test_validate_detects_missing_table() {
        let conn = Connection::open_in_memory().unwrap();
        let err_msg = TEST_TABLE.validate(&conn).unwrap_err().to_string();
        assert!(err_msg.contains("does not exist"));
    }

    #[test]
    fn test_validate_detects_missing_column() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE test_table (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
            [],
        )
        .unwrap();

        let err_msg = TEST_TABLE.validate(&conn).unwrap_err().to_string();
        assert!(err_msg.contains("has 2 columns, expected 3"));
    }

    #[test]
    fn test_validate_detects_type_mismatch() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE test_table (id INTEGER PRIMARY KEY, name TEXT NOT NULL, amount TEXT NOT NULL DEFAULT 0)",
            [],
        )
        .unwrap();

        let err_msg = TEST_TABLE.validate(&conn).unwrap_err().to_string();
        assert!(err_msg.contains("type mismatch"));
        assert!(err_msg.contains("amount"));
    }

    #[test]
    fn test_validate_detects_partial_primary_key() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE composite_table (left_id BIGINT NOT NULL PRIMARY KEY, right_id BIGINT NOT NULL, created DATETIME)",
            [],
        )
        .unwrap();

        let err_msg = COMPOSITE_TABLE.validate(&conn).unwrap_err().to_string();
        assert!(err_msg.contains("primary key mismatch"));
        assert!(err_msg.contains("right_id"));
    }

    #[test]
    fn test_versioned_schema_sets_user_version() {
        let conn = Connection::open_in_memory().unwrap();
        let schema = VersionedSchema {
            version: 3,
            tables: &[TEST_TABLE],
        };
        schema.create(&conn).unwrap();
        schema.validate(&conn).unwrap();

        let db_version: i64 = conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(db_version, BASE_DB_VERSION as i64 + 3);
    }
}
