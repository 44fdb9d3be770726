//! Daily refresh scheduler.
//!
//! Supports the cron subset the refresh job needs: a fixed minute and hour,
//! every day (`M H * * *`), evaluated at a fixed UTC offset.

use crate::backend::CacheBackend;
use crate::error::{Error, Result};
use crate::refresh::RefreshJob;
use crate::repository::CountryRepository;
use crate::upstream::UpstreamSource;
use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Utc};
use std::fmt;
use tokio::task::JoinHandle;

/// Default trigger: midnight.
pub const DEFAULT_CRON: &str = "0 0 * * *";
/// Default offset: West Africa Time.
pub const DEFAULT_UTC_OFFSET: &str = "+01:00";

/// A once-a-day trigger time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DailySchedule {
    time: NaiveTime,
    offset: FixedOffset,
}

impl DailySchedule {
    /// Build from a five-field cron expression and a `±HH:MM` offset.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when the expression is not `M H * * *` with
    /// numeric minute and hour, or the offset is malformed.
    pub fn parse(cron: &str, utc_offset: &str) -> Result<Self> {
        let fields: Vec<&str> = cron.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(Error::Config(format!(
                "cron expression '{}' must have 5 fields",
                cron
            )));
        }
        if fields[2..].iter().any(|f| *f != "*") {
            return Err(Error::Config(format!(
                "cron expression '{}' must run every day (day, month and weekday '*')",
                cron
            )));
        }

        let minute = numeric_field(cron, "minute", fields[0], 59)?;
        let hour = numeric_field(cron, "hour", fields[1], 23)?;
        let time = NaiveTime::from_hms_opt(hour, minute, 0)
            .ok_or_else(|| Error::Config(format!("invalid time in '{}'", cron)))?;

        Ok(Self {
            time,
            offset: parse_offset(utc_offset)?,
        })
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// First trigger strictly after `now`.
    pub fn next_run_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let local = now.with_timezone(&self.offset).naive_local();
        let mut candidate = local.date().and_time(self.time);
        if candidate <= local {
            candidate += Duration::days(1);
        }

        let utc = candidate - Duration::seconds(i64::from(self.offset.local_minus_utc()));
        DateTime::from_naive_utc_and_offset(utc, Utc)
    }

    /// Run `job` at every trigger until the task is aborted.
    ///
    /// Failures are logged and not retried; the next attempt is the next
    /// trigger.
    pub fn spawn<B, R, U>(self, job: RefreshJob<B, R, U>) -> JoinHandle<()>
    where
        B: CacheBackend,
        R: CountryRepository,
        U: UpstreamSource,
    {
        tokio::spawn(async move {
            loop {
                let now = Utc::now();
                let next = self.next_run_after(now);
                info!("Next country refresh scheduled at {}", next.with_timezone(&self.offset));

                tokio::time::sleep(wait_until(now, next)).await;

                match job.refresh_all().await {
                    Ok(inserted) => info!("Scheduled refresh stored {} countries", inserted.len()),
                    Err(e) => error!("Scheduled refresh failed: {}", e),
                }
            }
        })
    }
}

impl fmt::Display for DailySchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "daily at {} ({})", self.time.format("%H:%M"), self.offset)
    }
}

/// Time left until `next`, zero if it is already due.
fn wait_until(now: DateTime<Utc>, next: DateTime<Utc>) -> std::time::Duration {
    match (next - now).to_std() {
        Ok(wait) => wait,
        Err(_) => {
            debug!("Refresh due at {} is already past, running now", next);
            std::time::Duration::ZERO
        }
    }
}

fn numeric_field(cron: &str, name: &str, field: &str, max: u32) -> Result<u32> {
    field
        .parse::<u32>()
        .ok()
        .filter(|v| *v <= max)
        .ok_or_else(|| {
            Error::Config(format!(
                "cron expression '{}': {} must be a number between 0 and {}, got '{}'",
                cron, name, max, field
            ))
        })
}

/// Parse `Z`, `UTC`, `+HH:MM`, `-HH:MM` or `+HHMM`.
fn parse_offset(raw: &str) -> Result<FixedOffset> {
    let invalid = || Error::Config(format!("invalid UTC offset '{}'", raw));
    let raw = raw.trim();

    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }

    let (sign, rest) = if let Some(rest) = raw.strip_prefix('+') {
        (1, rest)
    } else if let Some(rest) = raw.strip_prefix('-') {
        (-1, rest)
    } else {
        return Err(invalid());
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let hours: i32 = digits[..2].parse().map_err(|_| invalid())?;
    let minutes: i32 = digits[2..].parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}
