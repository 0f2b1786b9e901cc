mod dialect;
mod versioned_schema;

pub use dialect::{DdlDialect, MySqlDialect, SqliteDialect};
pub use versioned_schema::{Column, SqlType, Table, VersionedSchema, BASE_DB_VERSION};
