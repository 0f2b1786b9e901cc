use chrono::{DateTime, Utc};
use serde::Serialize;

/// What happened on the table path of one installer run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TableOutcome {
    /// The stored version is ahead of this release; nothing was touched.
    SkippedNewerSchema { stored: i64, target: i64 },
    /// The stored version could not be read; nothing was touched this run.
    VersionUnreadable { error: String },
    /// The table exists. `created` tells whether this run created it;
    /// `version_recorded` is false when persisting the version failed.
    Verified {
        table_name: String,
        created: bool,
        version_recorded: bool,
    },
    /// The table is still missing after the create attempt.
    CreationFailed { table_name: String },
}

/// What happened on the recurring-job path of one installer run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    SchedulerUnavailable,
    AlreadyScheduled {
        job_name: String,
        next_run_at: DateTime<Utc>,
    },
    Scheduled {
        job_name: String,
        first_run_at: DateTime<Utc>,
        interval_secs: u64,
    },
    Failed { job_name: String, error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvisionReport {
    pub table: TableOutcome,
    pub job: JobOutcome,
}

impl ProvisionReport {
    /// True when both paths reached their desired state.
    pub fn is_provisioned(&self) -> bool {
        let table_ok = matches!(
            self.table,
            TableOutcome::Verified {
                version_recorded: true,
                ..
            } | TableOutcome::SkippedNewerSchema { .. }
        );
        let job_ok = !matches!(self.job, JobOutcome::Failed { .. });
        table_ok && job_ok
    }
}
