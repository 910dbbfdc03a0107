//! Recurring jobs via cron-style schedule expressions (§4.2.4).
//!
//! The evaluation engine is kept behind [`ScheduleExpression`] so the
//! default 5-field parser (backed by the `cron` crate) can be swapped for
//! a different one without touching the scheduler loop.

use aegis_core::{Error, ErrorKind};
use chrono::{DateTime, Utc};
use cron::Schedule as CronInner;
use std::str::FromStr;

/// A schedule that can answer "when does this next fire at or after `after`".
pub trait ScheduleExpression: Send + Sync {
    fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>>;
}

/// A standard five-field cron expression (minute hour day-of-month month
/// day-of-week). The `cron` crate's parser is six-field (leading seconds),
/// so a `"0 "` seconds field is prepended transparently.
pub struct CronSchedule {
    inner: CronInner,
}

impl CronSchedule {
    pub fn parse(expression: &str) -> Result<Self, Error> {
        let fields: Vec<&str> = expression.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(Error::invalid_argument(format!(
                "cron expression must have exactly 5 fields, got {}: '{expression}'",
                fields.len()
            )));
        }

        let six_field = format!("0 {expression}");
        let inner = CronInner::from_str(&six_field).map_err(|e| {
            Error::new(
                ErrorKind::InvalidArgument,
                format!("invalid cron expression '{expression}': {e}"),
            )
        })?;

        Ok(Self { inner })
    }
}

impl ScheduleExpression for CronSchedule {
    fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.inner.after(&after).next()
    }
}

/// A recurring job registered against a queue: a schedule plus the payload
/// and options to enqueue at each firing.
pub struct RecurringJob {
    pub name: String,
    pub queue: String,
    pub schedule: Box<dyn ScheduleExpression>,
    pub payload: serde_json::Value,
    pub options: crate::job::JobOptions,
    pub last_fired: Option<DateTime<Utc>>,
}

impl RecurringJob {
    /// Returns `Some((fire_time, missed))` if a firing at or before `now`
    /// is due and hasn't been fired yet. A firing is `missed` when its due
    /// time is more than `grace` in the past (e.g. the process was down) —
    /// it still fires exactly once, never replayed per firing.
    pub fn due_firing(&self, now: DateTime<Utc>, grace: chrono::Duration) -> Option<(DateTime<Utc>, bool)> {
        let since = self.last_fired.unwrap_or(now - chrono::Duration::days(1));
        let next = self.schedule.next_after(since)?;
        if next > now {
            return None;
        }
        let missed = now - next > grace;
        Some((next, missed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_expressions_without_five_fields() {
        let err = CronSchedule::parse("* * *").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn parses_a_valid_five_field_expression() {
        let schedule = CronSchedule::parse("*/5 * * * *").unwrap();
        let now = Utc::now();
        let next = schedule.next_after(now);
        assert!(next.is_some());
        assert!(next.unwrap() >= now);
    }

    #[test]
    fn due_firing_is_none_when_nothing_is_due_yet() {
        let schedule = CronSchedule::parse("0 0 1 1 *").unwrap(); // once a year
        let job = RecurringJob {
            name: "yearly".to_string(),
            queue: "q".to_string(),
            schedule: Box::new(schedule),
            payload: serde_json::json!({}),
            options: crate::job::JobOptions::default(),
            last_fired: Some(Utc::now()),
        };
        assert!(job.due_firing(Utc::now(), chrono::Duration::seconds(1)).is_none());
    }
}
