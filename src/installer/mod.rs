//! Idempotent provisioning of the reserved stock table and the draft order
//! cleanup job.
//!
//! The host calls [`Installer::ensure_provisioned`] on every admin
//! initialization. Once provisioned, a run costs one option read, one table
//! listing and one scheduler lookup. Nothing here ever fails the host: every
//! problem degrades to "try again next run", reported in the returned
//! [`ProvisionReport`] and, for a missing table, as an admin notice.

mod report;

pub use report::{JobOutcome, ProvisionReport, TableOutcome};

use crate::database::{table_exists, SchemaExecutor};
use crate::host_store::SettingsStore;
use crate::notices::{AdminNotice, NoticeSink};
use crate::scheduler::{next_midnight, Clock, JobScheduler, ScheduledJob, SystemClock};
use crate::schema::{
    CLEANUP_DRAFT_ORDERS_INTERVAL, CLEANUP_DRAFT_ORDERS_JOB, RESERVED_STOCK_TABLE,
    SCHEMA_VERSION, SCHEMA_VERSION_OPTION,
};
use crate::sqlite_persistence::Table;
use chrono_tz::Tz;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Settings store error: {0:#}")]
    Settings(anyhow::Error),

    #[error("Scheduler error: {0:#}")]
    Scheduler(anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableState {
    PreExisting,
    Created,
    Missing,
}

pub struct Installer {
    settings: Arc<dyn SettingsStore>,
    database: Arc<dyn SchemaExecutor>,
    scheduler: Option<Arc<dyn JobScheduler>>,
    notices: Arc<dyn NoticeSink>,
    clock: Arc<dyn Clock>,
    timezone: Tz,
    table: &'static Table,
    schema_version: i64,
    job: ScheduledJob,
}

impl Installer {
    /// Create an installer without a job scheduler.
    ///
    /// Construction has no side effects; nothing runs until the host calls
    /// [`Installer::ensure_provisioned`].
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        database: Arc<dyn SchemaExecutor>,
        notices: Arc<dyn NoticeSink>,
    ) -> Self {
        Self {
            settings,
            database,
            scheduler: None,
            notices,
            clock: Arc::new(SystemClock),
            timezone: Tz::UTC,
            table: &RESERVED_STOCK_TABLE,
            schema_version: SCHEMA_VERSION,
            job: ScheduledJob {
                name: CLEANUP_DRAFT_ORDERS_JOB,
                interval: CLEANUP_DRAFT_ORDERS_INTERVAL,
            },
        }
    }

    /// Provide the job scheduler. Without one, job registration is skipped.
    pub fn with_scheduler(mut self, scheduler: Arc<dyn JobScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Timezone whose midnight anchors the first job run.
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn schema_version(&self) -> i64 {
        self.schema_version
    }

    /// Run both provisioning checks. Cheap once everything is in place.
    pub fn ensure_provisioned(&self) -> ProvisionReport {
        let report = ProvisionReport {
            table: self.ensure_table(),
            job: self.ensure_recurring_job(),
        };
        debug!("Provisioning finished: {:?}", report);
        report
    }

    /// Make sure the table exists for the current schema version and record
    /// the version once it is verified.
    pub fn ensure_table(&self) -> TableOutcome {
        // An unknown stored version may be ahead of ours, so nothing is touched.
        let stored = match self.stored_schema_version() {
            Ok(version) => version,
            Err(e) => {
                warn!("Could not read stored schema version, leaving schema alone: {}", e);
                return TableOutcome::VersionUnreadable {
                    error: e.to_string(),
                };
            }
        };

        if stored > self.schema_version {
            debug!(
                "Stored schema version {} is newer than {}, leaving schema alone",
                stored, self.schema_version
            );
            return TableOutcome::SkippedNewerSchema {
                stored,
                target: self.schema_version,
            };
        }

        let info = self.database.info();
        let table_name = info.table_name(self.table);

        let show_errors = self.database.set_show_errors(false);
        let state = self.maybe_create_table(&table_name);
        if show_errors {
            self.database.set_show_errors(true);
        }

        if state == TableState::Missing {
            warn!(
                "Table {} is missing after create attempt; schema version stays at {}",
                table_name, stored
            );
            self.notices.add_notice(AdminNotice::table_creation_failed(
                &table_name,
                &info.user,
                &info.name,
            ));
            return TableOutcome::CreationFailed { table_name };
        }

        // Only advanced once the table is verified, pre-existing or not.
        let version_recorded = match self.record_schema_version() {
            Ok(()) => {
                if stored != self.schema_version {
                    info!(
                        "Schema version advanced from {} to {}",
                        stored, self.schema_version
                    );
                }
                true
            }
            Err(e) => {
                error!("Table {} verified but {}", table_name, e);
                false
            }
        };

        TableOutcome::Verified {
            table_name,
            created: state == TableState::Created,
            version_recorded,
        }
    }

    /// Register the recurring job unless the scheduler already knows it.
    pub fn ensure_recurring_job(&self) -> JobOutcome {
        let Some(scheduler) = self.scheduler.as_deref() else {
            return JobOutcome::SchedulerUnavailable;
        };

        match self.register_job(scheduler) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Could not ensure job {}: {}", self.job.name, e);
                JobOutcome::Failed {
                    job_name: self.job.name.to_string(),
                    error: e.to_string(),
                }
            }
        }
    }

    fn stored_schema_version(&self) -> Result<i64, ProvisionError> {
        let raw = self
            .settings
            .get_option(SCHEMA_VERSION_OPTION)
            .map_err(ProvisionError::Settings)?;
        Ok(raw.as_deref().map(leading_integer).unwrap_or(0))
    }

    fn record_schema_version(&self) -> Result<(), ProvisionError> {
        self.settings
            .set_option(SCHEMA_VERSION_OPTION, &self.schema_version.to_string())
            .map_err(ProvisionError::Settings)
    }

    /// The statement's own result is not trusted; only the re-check after
    /// the attempt decides whether the table exists.
    fn maybe_create_table(&self, table_name: &str) -> TableState {
        if self.table_present(table_name) {
            return TableState::PreExisting;
        }

        info!("Creating table {}", table_name);
        if let Err(e) = self.database.create_table(table_name, self.table) {
            debug!("Create statement for {} failed: {:#}", table_name, e);
        }

        if self.table_present(table_name) {
            TableState::Created
        } else {
            TableState::Missing
        }
    }

    fn table_present(&self, table_name: &str) -> bool {
        table_exists(self.database.as_ref(), table_name).unwrap_or_else(|e| {
            warn!("Could not list tables while looking for {}: {:#}", table_name, e);
            false
        })
    }

    fn register_job(&self, scheduler: &dyn JobScheduler) -> Result<JobOutcome, ProvisionError> {
        let job_name = self.job.name;
        if let Some(next_run_at) = scheduler
            .next_scheduled(job_name)
            .map_err(ProvisionError::Scheduler)?
        {
            return Ok(JobOutcome::AlreadyScheduled {
                job_name: job_name.to_string(),
                next_run_at,
            });
        }

        let first_run_at = next_midnight(self.clock.now(), &self.timezone);
        scheduler
            .schedule_recurring(first_run_at, self.job.interval, job_name)
            .map_err(ProvisionError::Scheduler)?;
        info!(
            "Scheduled recurring job {} every {:?}, first run at {}",
            job_name, self.job.interval, first_run_at
        );

        Ok(JobOutcome::Scheduled {
            job_name: job_name.to_string(),
            first_run_at,
            interval_secs: self.job.interval.as_secs(),
        })
    }
}

/// Integer prefix of a stored option value: leading whitespace and an
/// optional sign, then digits up to the first non-digit. `"300.0"` is 300,
/// a value without leading digits is 0. Saturates instead of overflowing.
fn leading_integer(value: &str) -> i64 {
    let value = value.trim_start();
    let (negative, digits) = match value.as_bytes().first() {
        Some(b'-') => (true, &value[1..]),
        Some(b'+') => (false, &value[1..]),
        _ => (false, value),
    };
    let magnitude = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, d| {
            acc.saturating_mul(10).saturating_add(i64::from(d - b'0'))
        });
    if negative {
        -magnitude
    } else {
        magnitude
    }
}
