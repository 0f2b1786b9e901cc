//! End-to-end provisioning against on-disk SQLite databases.

use chrono::{DateTime, Utc};
use reserved_stock_installer::schema::{
    CLEANUP_DRAFT_ORDERS_JOB, RESERVED_STOCK_TABLE, SCHEMA_VERSION, SCHEMA_VERSION_OPTION,
};
use reserved_stock_installer::{
    Clock, DatabaseInfo, Installer, JobOutcome, JobScheduler, NoticeQueue, SettingsStore,
    SqliteDatabase, SqliteHostStore, TableOutcome,
};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

const TABLE_NAME: &str = "wp_wc_reserved_stock";

struct FixedClock(DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Settings store whose first read fails, as under a locked database.
struct LockedOnceSettings {
    inner: Arc<SqliteHostStore>,
    failed: AtomicBool,
}

impl SettingsStore for LockedOnceSettings {
    fn get_option(&self, name: &str) -> anyhow::Result<Option<String>> {
        if !self.failed.swap(true, Ordering::SeqCst) {
            anyhow::bail!("database is locked");
        }
        self.inner.get_option(name)
    }

    fn set_option(&self, name: &str, value: &str) -> anyhow::Result<()> {
        self.inner.set_option(name, value)
    }

    fn delete_option(&self, name: &str) -> anyhow::Result<()> {
        self.inner.delete_option(name)
    }
}

struct TestHost {
    db_path: PathBuf,
    host_store: Arc<SqliteHostStore>,
    notices: Arc<NoticeQueue>,
    _temp_dir: TempDir, // Keep temp dir alive
}

fn utc(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

fn db_info() -> DatabaseInfo {
    DatabaseInfo {
        user: "shop_user".to_string(),
        name: "shop".to_string(),
        table_prefix: "wp_".to_string(),
    }
}

fn create_test_host() -> TestHost {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("shop.db");
    let host_store = Arc::new(SqliteHostStore::new(&db_path).unwrap());
    TestHost {
        db_path,
        host_store,
        notices: Arc::new(NoticeQueue::new()),
        _temp_dir: temp_dir,
    }
}

fn installer_for(host: &TestHost, read_only: bool) -> Installer {
    let database = Arc::new(SqliteDatabase::open(&host.db_path, db_info(), read_only).unwrap());
    Installer::new(host.host_store.clone(), database, host.notices.clone())
        .with_scheduler(host.host_store.clone())
        .with_clock(Arc::new(FixedClock(utc("2024-11-20T09:15:00Z"))))
}

fn stored_version(host: &TestHost) -> Option<String> {
    host.host_store.get_option(SCHEMA_VERSION_OPTION).unwrap()
}

fn table_count(db_path: &Path, name: &str) -> i64 {
    Connection::open(db_path)
        .unwrap()
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND lower(name) = lower(?1)",
            [name],
            |r| r.get(0),
        )
        .unwrap()
}

#[test]
fn test_fresh_database_is_fully_provisioned() {
    let host = create_test_host();
    let installer = installer_for(&host, false);

    let report = installer.ensure_provisioned();

    assert_eq!(
        report.table,
        TableOutcome::Verified {
            table_name: TABLE_NAME.to_string(),
            created: true,
            version_recorded: true,
        }
    );
    assert_eq!(
        report.job,
        JobOutcome::Scheduled {
            job_name: CLEANUP_DRAFT_ORDERS_JOB.to_string(),
            first_run_at: utc("2024-11-21T00:00:00Z"),
            interval_secs: 86_400,
        }
    );
    assert!(report.is_provisioned());
    assert_eq!(stored_version(&host), Some(SCHEMA_VERSION.to_string()));
    assert_eq!(table_count(&host.db_path, TABLE_NAME), 1);
    assert!(host.notices.is_empty());

    // The created table matches the definition
    let conn = Connection::open(&host.db_path).unwrap();
    let mut check_table = RESERVED_STOCK_TABLE;
    check_table.name = TABLE_NAME;
    check_table.validate(&conn).unwrap();
}

#[test]
fn test_second_run_is_a_no_op() {
    let host = create_test_host();
    let installer = installer_for(&host, false);

    installer.ensure_provisioned();
    let second = installer.ensure_provisioned();

    assert_eq!(
        second.table,
        TableOutcome::Verified {
            table_name: TABLE_NAME.to_string(),
            created: false,
            version_recorded: true,
        }
    );
    assert_eq!(
        second.job,
        JobOutcome::AlreadyScheduled {
            job_name: CLEANUP_DRAFT_ORDERS_JOB.to_string(),
            next_run_at: utc("2024-11-21T00:00:00Z"),
        }
    );
    assert_eq!(stored_version(&host), Some(SCHEMA_VERSION.to_string()));
    assert_eq!(table_count(&host.db_path, TABLE_NAME), 1);
    assert!(host.notices.is_empty());
}

#[test]
fn test_denied_create_keeps_version_and_notifies_every_run() {
    let host = create_test_host();
    host.host_store
        .set_option(SCHEMA_VERSION_OPTION, "250")
        .unwrap();
    let installer = installer_for(&host, true);

    for _ in 0..2 {
        let report = installer.ensure_provisioned();
        assert_eq!(
            report.table,
            TableOutcome::CreationFailed {
                table_name: TABLE_NAME.to_string()
            }
        );
        assert_eq!(stored_version(&host), Some("250".to_string()));

        let notices = host.notices.drain();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].message.contains(TABLE_NAME));
        assert!(notices[0].message.contains("shop_user"));
    }
    assert_eq!(table_count(&host.db_path, TABLE_NAME), 0);

    // Once privileges are back, the next run succeeds
    let report = installer_for(&host, false).ensure_provisioned();
    assert!(matches!(
        report.table,
        TableOutcome::Verified { created: true, .. }
    ));
    assert_eq!(stored_version(&host), Some(SCHEMA_VERSION.to_string()));
}

#[test]
fn test_pre_existing_table_with_other_casing_advances_version() {
    let host = create_test_host();
    Connection::open(&host.db_path)
        .unwrap()
        .execute(
            "CREATE TABLE WP_WC_Reserved_Stock (order_id BIGINT NOT NULL, product_id BIGINT NOT NULL)",
            [],
        )
        .unwrap();

    let report = installer_for(&host, false).ensure_provisioned();

    assert!(matches!(
        report.table,
        TableOutcome::Verified {
            created: false,
            version_recorded: true,
            ..
        }
    ));
    assert_eq!(stored_version(&host), Some(SCHEMA_VERSION.to_string()));
    assert_eq!(table_count(&host.db_path, TABLE_NAME), 1);
}

#[test]
fn test_newer_schema_version_is_left_alone() {
    let host = create_test_host();
    host.host_store
        .set_option(SCHEMA_VERSION_OPTION, "300")
        .unwrap();

    let report = installer_for(&host, false).ensure_provisioned();

    assert_eq!(
        report.table,
        TableOutcome::SkippedNewerSchema {
            stored: 300,
            target: SCHEMA_VERSION
        }
    );
    assert_eq!(stored_version(&host), Some("300".to_string()));
    assert_eq!(table_count(&host.db_path, TABLE_NAME), 0);
    // The job path is independent of the table path
    assert!(matches!(report.job, JobOutcome::Scheduled { .. }));
}

#[test]
fn test_newer_decimal_version_is_left_alone() {
    let host = create_test_host();
    host.host_store
        .set_option(SCHEMA_VERSION_OPTION, "300.0")
        .unwrap();

    let report = installer_for(&host, false).ensure_provisioned();

    assert_eq!(
        report.table,
        TableOutcome::SkippedNewerSchema {
            stored: 300,
            target: SCHEMA_VERSION
        }
    );
    assert_eq!(stored_version(&host), Some("300.0".to_string()));
}

#[test]
fn test_failed_version_read_never_downgrades_stored_version() {
    let host = create_test_host();
    host.host_store
        .set_option(SCHEMA_VERSION_OPTION, "300")
        .unwrap();
    Connection::open(&host.db_path)
        .unwrap()
        .execute(
            "CREATE TABLE wp_wc_reserved_stock (order_id BIGINT NOT NULL, product_id BIGINT NOT NULL)",
            [],
        )
        .unwrap();

    let settings = Arc::new(LockedOnceSettings {
        inner: host.host_store.clone(),
        failed: AtomicBool::new(false),
    });
    let database = Arc::new(SqliteDatabase::open(&host.db_path, db_info(), false).unwrap());
    let installer = Installer::new(settings, database, host.notices.clone());

    assert!(matches!(
        installer.ensure_table(),
        TableOutcome::VersionUnreadable { .. }
    ));
    assert_eq!(stored_version(&host), Some("300".to_string()));

    // Once the store answers again, the newer version is respected
    assert!(matches!(
        installer.ensure_table(),
        TableOutcome::SkippedNewerSchema { stored: 300, .. }
    ));
    assert_eq!(stored_version(&host), Some("300".to_string()));
}

#[test]
fn test_existing_job_is_not_rescheduled() {
    let host = create_test_host();
    let earlier = utc("2024-11-15T00:00:00Z");
    host.host_store
        .schedule_recurring(
            earlier,
            std::time::Duration::from_secs(86_400),
            CLEANUP_DRAFT_ORDERS_JOB,
        )
        .unwrap();

    let report = installer_for(&host, false).ensure_provisioned();

    assert_eq!(
        report.job,
        JobOutcome::AlreadyScheduled {
            job_name: CLEANUP_DRAFT_ORDERS_JOB.to_string(),
            next_run_at: earlier,
        }
    );
}

#[test]
fn test_without_scheduler_job_is_skipped() {
    let host = create_test_host();
    let database = Arc::new(SqliteDatabase::open(&host.db_path, db_info(), false).unwrap());
    let installer = Installer::new(host.host_store.clone(), database, host.notices.clone());

    let report = installer.ensure_provisioned();

    assert_eq!(report.job, JobOutcome::SchedulerUnavailable);
    assert!(host
        .host_store
        .next_scheduled(CLEANUP_DRAFT_ORDERS_JOB)
        .unwrap()
        .is_none());
}
