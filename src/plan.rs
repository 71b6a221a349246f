use chrono::{DateTime, Days, NaiveDate, TimeDelta, TimeZone};
use serde::Deserialize;
use std::fmt::Display;

/// Order in which missing days are committed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Order {
    /// Today first, then walk back to the day after the last recorded date.
    #[default]
    NewestFirst,
    /// The day after the last recorded date first, ending with today.
    OldestFirst,
}

/// Every calendar day in `(last, today]`, in the requested order.
///
/// The length is always `(today - last)` in whole days; a `last` that is
/// today or later yields an empty list.
pub fn missing_days(last: NaiveDate, today: NaiveDate, order: Order) -> Vec<NaiveDate> {
    let count = today.signed_duration_since(last).num_days();
    if count <= 0 {
        return Vec::new();
    }

    let mut days: Vec<NaiveDate> = (0..count as u64)
        .filter_map(|i| today.checked_sub_days(Days::new(i)))
        .collect();
    if order == Order::OldestFirst {
        days.reverse();
    }
    days
}

/// The backdated instant used for a day's commit: `day` at the wall-clock
/// time of `now`, in `now`'s time zone.
///
/// A wall-clock time that does not exist on `day` (DST gap) is moved one
/// hour forward.
pub fn commit_timestamp<Tz: TimeZone>(day: NaiveDate, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    let naive = day.and_time(now.naive_local().time());
    let tz = now.timezone();
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + TimeDelta::hours(1))).earliest())
}

/// Format an instant in git's internal date format, `<unix seconds> <+hhmm>`.
pub fn git_date<Tz: TimeZone>(ts: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    format!("{} {}", ts.timestamp(), ts.format("%z"))
}
