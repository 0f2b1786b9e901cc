mod sqlite_database;

pub use sqlite_database::SqliteDatabase;

use crate::sqlite_persistence::Table;
use anyhow::Result;
use serde::Serialize;

/// Connection facts the host exposes for diagnostics and table naming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseInfo {
    pub user: String,
    pub name: String,
    pub table_prefix: String,
}

impl DatabaseInfo {
    pub fn table_name(&self, table: &Table) -> String {
        format!("{}{}", self.table_prefix, table.name).to_lowercase()
    }
}

/// Table existence checks and DDL execution against the host database.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
pub trait SchemaExecutor: Send + Sync {
    fn info(&self) -> DatabaseInfo;

    /// Names of all tables currently present, as the engine reports them.
    fn table_names(&self) -> Result<Vec<String>>;

    /// Issue a create-if-not-exists statement for `table` under `table_name`.
    fn create_table(&self, table_name: &str, table: &Table) -> Result<()>;

    /// Toggle engine-level error logging. Returns the previous setting.
    fn set_show_errors(&self, show: bool) -> bool;
}

/// Case-insensitive existence check against the live table list.
///
/// Engines disagree on table-name casing, so both sides are lower-cased.
pub fn table_exists(executor: &dyn SchemaExecutor, table_name: &str) -> Result<bool> {
    let wanted = table_name.to_lowercase();
    Ok(executor
        .table_names()?
        .iter()
        .any(|name| name.to_lowercase() == wanted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RESERVED_STOCK_TABLE;

    #[test]
    fn test_table_name_is_prefixed_and_lowercased() {
        let info = DatabaseInfo {
            user: "u".to_string(),
            name: "d".to_string(),
            table_prefix: "WP_".to_string(),
        };
        assert_eq!(info.table_name(&RESERVED_STOCK_TABLE), "wp_wc_reserved_stock");
    }

    #[test]
    fn test_table_exists_ignores_case() {
        let mut executor = MockSchemaExecutor::new();
        executor
            .expect_table_names()
            .returning(|| Ok(vec!["WP_WC_Reserved_Stock".to_string(), "wp_options".to_string()]));

        assert!(table_exists(&executor, "wp_wc_reserved_stock").unwrap());
        assert!(table_exists(&executor, "WP_OPTIONS").unwrap());
        assert!(!table_exists(&executor, "wp_posts").unwrap());
    }
}
