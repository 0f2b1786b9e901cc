//! SQLite schema definitions for the host store.
//!
//! The host store keeps the settings key-value table and the registry of
//! recurring jobs.

use crate::sqlite_column;
use crate::sqlite_persistence::{SqlType, Table, VersionedSchema};

// =============================================================================
// Version 1 - Options and scheduled actions
// =============================================================================

/// Options table - key-value settings store
const OPTIONS_TABLE_V1: Table = Table {
    name: "options",
    columns: &[
        sqlite_column!("name", SqlType::Text, is_primary_key = true),
        sqlite_column!("value", SqlType::Text, non_null = true),
        sqlite_column!(
            "updated_at",
            SqlType::Text,
            non_null = true,
            default_value = Some("(datetime('now'))")
        ),
    ],
    primary_key: &[],
};

/// Scheduled actions table - one row per recurring job name
const SCHEDULED_ACTIONS_TABLE_V1: Table = Table {
    name: "scheduled_actions",
    columns: &[
        sqlite_column!("job_name", SqlType::Text, is_primary_key = true),
        sqlite_column!("next_run_at", SqlType::Text, non_null = true), // RFC 3339
        sqlite_column!("interval_secs", SqlType::Integer, non_null = true),
        sqlite_column!("created_at", SqlType::Text, non_null = true),
    ],
    primary_key: &[],
};

/// All versioned schemas for the host database.
///
/// Version 1: Options and scheduled actions tables
pub const HOST_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[OPTIONS_TABLE_V1, SCHEDULED_ACTIONS_TABLE_V1],
}];

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_v1_schema_creates_successfully() {
        let conn = Connection::open_in_memory().unwrap();
        let schema = &HOST_VERSIONED_SCHEMAS[0];
        schema.create(&conn).unwrap();
        schema.validate(&conn).unwrap();
    }

    #[test]
    fn test_options_updated_at_default() {
        let conn = Connection::open_in_memory().unwrap();
        HOST_VERSIONED_SCHEMAS[0].create(&conn).unwrap();

        conn.execute(
            "INSERT INTO options (name, value) VALUES ('k', 'v')",
            [],
        )
        .unwrap();
        let updated_at: String = conn
            .query_row("SELECT updated_at FROM options WHERE name = 'k'", [], |r| {
                r.get(0)
            })
            .unwrap();
        assert!(!updated_at.is_empty());
    }
}
