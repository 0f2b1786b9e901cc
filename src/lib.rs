//! Reserved Stock Installer Library
//!
//! Idempotent provisioning of the reserved stock table and the recurring
//! draft order cleanup job, with the host's collaborators injected.

pub mod config;
pub mod database;
pub mod host_store;
pub mod installer;
pub mod notices;
pub mod scheduler;
pub mod schema;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use database::{DatabaseInfo, SchemaExecutor, SqliteDatabase};
pub use host_store::{SettingsStore, SqliteHostStore};
pub use installer::{Installer, JobOutcome, ProvisionReport, TableOutcome};
pub use notices::{AdminNotice, NoticeQueue, NoticeSink};
pub use scheduler::{Clock, JobScheduler, SystemClock};
