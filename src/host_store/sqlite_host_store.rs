use super::schema::HOST_VERSIONED_SCHEMAS;
use super::SettingsStore;
use crate::scheduler::JobScheduler;
use crate::sqlite_persistence::BASE_DB_VERSION;
use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

/// Settings and job registry backed by a SQLite database.
pub struct SqliteHostStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteHostStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        let conn = Connection::open(path).context("Failed to open host database")?;
        Self::init(&conn).with_context(|| format!("Failed to initialize host database {:?}", path))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init(conn: &Connection) -> Result<()> {
        let latest = HOST_VERSIONED_SCHEMAS
            .last()
            .ok_or_else(|| anyhow!("No host schema versions defined"))?;

        let raw_version: i64 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        if raw_version == 0 {
            // Fresh database - create with latest schema
            info!("Creating host store tables (version {})", latest.version);
            latest.create(conn)?;
            return Ok(());
        }

        let db_version = raw_version - BASE_DB_VERSION as i64;
        if db_version < 1 {
            bail!(
                "Host database version {} is invalid (expected >= 1)",
                db_version
            );
        }
        if db_version > latest.version as i64 {
            bail!(
                "Host database version {} is newer than supported version {}",
                db_version,
                latest.version
            );
        }

        let schema = HOST_VERSIONED_SCHEMAS
            .iter()
            .find(|s| s.version == db_version as usize)
            .with_context(|| format!("Unknown host database version {}", db_version))?;
        schema.validate(conn).with_context(|| {
            format!(
                "Host database schema validation failed for version {}",
                db_version
            )
        })?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Host database lock poisoned"))
    }

    fn format_datetime(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339()
    }
}

impl SettingsStore for SqliteHostStore {
    fn get_option(&self, name: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT value FROM options WHERE name = ?1")?;

        let value: Option<String> = stmt.query_row(params![name], |row| row.get(0)).optional()?;

        Ok(value)
    }

    fn set_option(&self, name: &str, value: &str) -> Result<()> {
        let conn = self.lock()?;
        let now = Self::format_datetime(&Utc::now());

        conn.execute(
            "INSERT INTO options (name, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO UPDATE SET value = ?2, updated_at = ?3",
            params![name, value, now],
        )?;

        Ok(())
    }

    fn delete_option(&self, name: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM options WHERE name = ?1", params![name])?;
        Ok(())
    }
}

impl JobScheduler for SqliteHostStore {
    fn next_scheduled(&self, job_name: &str) -> Result<Option<DateTime<Utc>>> {
        let conn = self.lock()?;
        let next_run_at: Option<String> = conn
            .query_row(
                "SELECT next_run_at FROM scheduled_actions WHERE job_name = ?1",
                params![job_name],
                |row| row.get(0),
            )
            .optional()?;

        next_run_at
            .map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .with_context(|| format!("Invalid next_run_at for job {}: {}", job_name, s))
            })
            .transpose()
    }

    fn schedule_recurring(
        &self,
        start: DateTime<Utc>,
        interval: Duration,
        job_name: &str,
    ) -> Result<()> {
        let conn = self.lock()?;
        let interval_secs = i64::try_from(interval.as_secs())
            .with_context(|| format!("Interval too large for job {}", job_name))?;

        // The job name is the key, so a racing registration is a no-op
        let inserted = conn.execute(
            "INSERT INTO scheduled_actions (job_name, next_run_at, interval_secs, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(job_name) DO NOTHING",
            params![
                job_name,
                Self::format_datetime(&start),
                interval_secs,
                Self::format_datetime(&Utc::now())
            ],
        )?;
        if inserted == 0 {
            debug!("Job {} was already registered", job_name);
        }

        Ok(())
    }
}
