mod schema;
mod sqlite_host_store;

pub use schema::HOST_VERSIONED_SCHEMAS;
pub use sqlite_host_store::SqliteHostStore;

use anyhow::Result;

/// Key-value settings owned by the host.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
pub trait SettingsStore: Send + Sync {
    fn get_option(&self, name: &str) -> Result<Option<String>>;
    fn set_option(&self, name: &str, value: &str) -> Result<()>;
    fn delete_option(&self, name: &str) -> Result<()>;
}
