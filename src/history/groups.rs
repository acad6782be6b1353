//! Date buckets for displaying history: Today, Yesterday, Last 7 days, Older.

use chrono::{DateTime, Duration, NaiveTime, TimeZone};

use super::RunHistoryEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateGroup {
    Today,
    Yesterday,
    Last7Days,
    Older,
}

impl DateGroup {
    /// Display order.
    pub const ORDER: [DateGroup; 4] = [
        DateGroup::Today,
        DateGroup::Yesterday,
        DateGroup::Last7Days,
        DateGroup::Older,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DateGroup::Today => "Today",
            DateGroup::Yesterday => "Yesterday",
            DateGroup::Last7Days => "Last 7 days",
            DateGroup::Older => "Older",
        }
    }
}

fn start_of_day<Tz: TimeZone>(day: DateTime<Tz>) -> Option<DateTime<Tz>> {
    day.timezone()
        .from_local_datetime(&day.date_naive().and_time(NaiveTime::MIN))
        .earliest()
}

/// Bucket a timestamp relative to `now`, using `now`'s time zone for day boundaries.
///
/// "Last 7 days" is a rolling window from `now`, not a calendar boundary.
pub fn date_group<Tz: TimeZone>(ts: &DateTime<Tz>, now: &DateTime<Tz>) -> DateGroup {
    let start_today = start_of_day(now.clone());
    let start_yesterday = start_of_day(now.clone() - Duration::days(1));
    let seven_days_ago = now.clone() - Duration::days(7);

    if start_today.is_some_and(|start| *ts >= start) {
        DateGroup::Today
    } else if start_yesterday.is_some_and(|start| *ts >= start) {
        DateGroup::Yesterday
    } else if *ts >= seven_days_ago {
        DateGroup::Last7Days
    } else {
        DateGroup::Older
    }
}

/// Split entries into non-empty date groups in display order, keeping input
/// order inside each group.
pub fn group_by_date<Tz: TimeZone>(
    entries: &[RunHistoryEntry],
    now: &DateTime<Tz>,
) -> Vec<(DateGroup, Vec<RunHistoryEntry>)> {
    let tz = now.timezone();
    let mut groups: Vec<(DateGroup, Vec<RunHistoryEntry>)> =
        DateGroup::ORDER.iter().map(|g| (*g, Vec::new())).collect();

    for entry in entries {
        let group = date_group(&entry.timestamp.with_timezone(&tz), now);
        if let Some((_, bucket)) = groups.iter_mut().find(|(g, _)| *g == group) {
            bucket.push(entry.clone());
        }
    }

    groups.retain(|(_, bucket)| !bucket.is_empty());
    groups
}
