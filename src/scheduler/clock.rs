use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};

#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// The upcoming midnight in `tz`, i.e. the start of the local day after `now`.
///
/// When a DST transition skips local midnight, the first valid hour of that
/// day is used instead.
pub fn next_midnight<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
    let today = now.with_timezone(tz).date_naive();
    today
        .succ_opt()
        .and_then(|tomorrow| start_of_day(tomorrow, tz))
        .unwrap_or(now)
}

fn start_of_day<Tz: TimeZone>(day: NaiveDate, tz: &Tz) -> Option<DateTime<Utc>> {
    (0..24)
        .find_map(|hour| {
            let time = NaiveTime::from_hms_opt(hour, 0, 0)?;
            tz.from_local_datetime(&day.and_time(time)).earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
}
