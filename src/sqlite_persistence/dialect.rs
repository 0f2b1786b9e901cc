//! Driver-specific DDL rendering for [`Table`] definitions.
//!
//! Identifiers always go through [`DdlDialect::quote_identifier`], so table
//! and column names never reach the statement unescaped.

use super::versioned_schema::{SqlType, Table};

pub trait DdlDialect {
    fn quote_identifier(&self, identifier: &str) -> String;

    fn type_name(&self, sql_type: SqlType) -> &'static str;

    /// Trailing table options appended after the closing parenthesis.
    fn table_options(&self) -> Option<String> {
        None
    }

    fn create_table_sql(&self, table_name: &str, table: &Table) -> String {
        let composite_key = !table.primary_key.is_empty();
        let mut create_sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (",
            self.quote_identifier(table_name)
        );
        for (column_index, column) in table.columns.iter().enumerate() {
            if column_index > 0 {
                create_sql.push_str(", ");
            }
            create_sql.push_str(&format!(
                "{} {}",
                self.quote_identifier(column.name),
                self.type_name(column.sql_type)
            ));
            if column.is_primary_key && !composite_key {
                create_sql.push_str(" PRIMARY KEY");
            }
            if column.non_null {
                create_sql.push_str(" NOT NULL");
            }
            if let Some(default_value) = column.default_value {
                create_sql.push_str(&format!(" DEFAULT {}", default_value));
            }
        }
        if composite_key {
            let key_columns = table
                .primary_key
                .iter()
                .map(|c| self.quote_identifier(c))
                .collect::<Vec<_>>()
                .join(", ");
            create_sql.push_str(&format!(", PRIMARY KEY ({})", key_columns));
        }
        create_sql.push(')');
        if let Some(options) = self.table_options() {
            create_sql.push(' ');
            create_sql.push_str(&options);
        }
        create_sql.push(';');
        create_sql
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl DdlDialect for SqliteDialect {
    fn quote_identifier(&self, identifier: &str) -> String {
        format!("\"{}\"", identifier.replace('"', "\"\""))
    }

    // SQLite keeps the declared name and derives the column affinity from it.
    fn type_name(&self, sql_type: SqlType) -> &'static str {
        match sql_type {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
            SqlType::BigInt => "BIGINT",
            SqlType::Double => "DOUBLE",
            SqlType::DateTime => "DATETIME",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MySqlDialect {
    /// e.g. `DEFAULT CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci`
    pub charset_collate: Option<String>,
}

impl DdlDialect for MySqlDialect {
    fn quote_identifier(&self, identifier: &str) -> String {
        format!("`{}`", identifier.replace('`', "``"))
    }

    fn type_name(&self, sql_type: SqlType) -> &'static str {
        match sql_type {
            SqlType::Text => "longtext",
            SqlType::Integer => "int(11)",
            SqlType::BigInt => "bigint(20)",
            SqlType::Double => "double",
            SqlType::DateTime => "datetime",
        }
    }

    fn table_options(&self) -> Option<String> {
        self.charset_collate
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}
