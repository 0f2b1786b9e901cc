//! Compiled-in definitions the installer provisions.
//!
//! `SCHEMA_VERSION` must be bumped whenever `RESERVED_STOCK_TABLE` changes.

use crate::sqlite_column;
use crate::sqlite_persistence::{SqlType, Table};
use std::time::Duration;

/// Target schema version for this release.
pub const SCHEMA_VERSION: i64 = 260;

/// Settings key holding the last verified schema version.
pub const SCHEMA_VERSION_OPTION: &str = "schema_version";

/// Zero-date default used by both timestamp columns.
pub const ZERO_DATETIME: &str = "'0000-00-00 00:00:00'";

/// Reserved stock table - one row per (order, product) stock hold.
///
/// The live name is the host table prefix followed by `name`.
pub const RESERVED_STOCK_TABLE: Table = Table {
    name: "wc_reserved_stock",
    columns: &[
        sqlite_column!("order_id", SqlType::BigInt, non_null = true),
        sqlite_column!("product_id", SqlType::BigInt, non_null = true),
        sqlite_column!(
            "stock_quantity",
            SqlType::Double,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "timestamp",
            SqlType::DateTime,
            non_null = true,
            default_value = Some(ZERO_DATETIME)
        ),
        sqlite_column!(
            "expires",
            SqlType::DateTime,
            non_null = true,
            default_value = Some(ZERO_DATETIME)
        ),
    ],
    primary_key: &["order_id", "product_id"],
};

/// Recurring job that purges abandoned draft orders.
pub const CLEANUP_DRAFT_ORDERS_JOB: &str = "cleanup-draft-orders";

pub const CLEANUP_DRAFT_ORDERS_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
