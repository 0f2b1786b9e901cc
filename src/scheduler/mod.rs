//! Recurring job registration.
//!
//! The installer only asks whether a job is already scheduled and registers
//! it when it is not; running the jobs is left to whatever drives the
//! scheduler.

mod clock;

pub use clock::{next_midnight, Clock, SystemClock};
#[cfg(any(test, feature = "mock"))]
pub use clock::MockClock;

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// External job scheduler.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
pub trait JobScheduler: Send + Sync {
    /// Next run time of the job with this name, if it is scheduled at all.
    fn next_scheduled(&self, job_name: &str) -> Result<Option<DateTime<Utc>>>;

    /// Register a job that first runs at `start` and then every `interval`.
    fn schedule_recurring(
        &self,
        start: DateTime<Utc>,
        interval: Duration,
        job_name: &str,
    ) -> Result<()>;
}

/// A recurring job the installer makes sure exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledJob {
    pub name: &'static str,
    pub interval: Duration,
}
