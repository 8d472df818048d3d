//! Focus-log aggregation into day/week/month windows.
//!
//! Calendar dates come from a time zone, not a fixed offset: each instant is
//! dated with the offset the zone has at that instant. Windows therefore reset
//! at local midnight on both sides of a DST change.

use std::error::Error;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, Local, NaiveDate, Offset, TimeZone};
use serde::Serialize;
use time::{Duration, OffsetDateTime, UtcOffset};

use crate::domain::focus::{format_timestamp, parse_timestamp};
use crate::domain::FocusEntry;

pub const RETENTION_DAYS: i64 = 120;
const WEEK_DAYS: i64 = 7;
const MONTH_DAYS: i64 = 30;
const PERIOD_DAYS: i64 = 7;
const RECENT_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Range {
    Day,
    Week,
    Month,
}

impl Range {
    pub const ALL: [Range; 3] = [Range::Day, Range::Week, Range::Month];

    pub fn as_str(self) -> &'static str {
        match self {
            Range::Day => "day",
            Range::Week => "week",
            Range::Month => "month",
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Range {
    type Err = ParseRangeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "day" | "today" => Ok(Range::Day),
            "week" => Ok(Range::Week),
            "month" => Ok(Range::Month),
            _ => Err(ParseRangeError {
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRangeError {
    value: String,
}

impl fmt::Display for ParseRangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid range '{}': expected one of {}",
            self.value,
            Range::ALL
                .iter()
                .map(|range| range.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl Error for ParseRangeError {}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DayBucket {
    pub date: String,
    pub seconds: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PeriodBucket {
    pub start: String,
    pub end: String,
    pub seconds: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RecentSession {
    pub timestamp: String,
    pub duration: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChartPoint {
    pub label: String,
    pub seconds: i64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FocusAnalytics {
    pub day_total: i64,
    pub week_total: i64,
    pub month_total: i64,
    pub week: Vec<DayBucket>,
    pub month: Vec<PeriodBucket>,
    pub recent: Vec<RecentSession>,
}

impl FocusAnalytics {
    pub fn total(&self, range: Range) -> i64 {
        match range {
            Range::Day => self.day_total,
            Range::Week => self.week_total,
            Range::Month => self.month_total,
        }
    }

    /// Chart-ready points for one window, oldest first.
    pub fn series(&self, range: Range) -> Vec<ChartPoint> {
        match range {
            Range::Day => self
                .recent
                .iter()
                .rev()
                .map(|session| ChartPoint {
                    label: clock_label(&session.timestamp),
                    seconds: session.duration,
                })
                .collect(),
            Range::Week => self
                .week
                .iter()
                .map(|bucket| ChartPoint {
                    label: weekday_label(&bucket.date),
                    seconds: bucket.seconds,
                })
                .collect(),
            Range::Month => self
                .month
                .iter()
                .map(|bucket| ChartPoint {
                    label: format!("{}-{}", short_date(&bucket.start), short_date(&bucket.end)),
                    seconds: bucket.seconds,
                })
                .collect(),
        }
    }
}

/// Oldest instant the focus query needs to return.
pub fn retention_cutoff(now: OffsetDateTime, retention_days: i64) -> OffsetDateTime {
    now.checked_sub(Duration::days(retention_days.max(0)))
        .unwrap_or(now)
}

/// Aggregates in the machine's time zone.
pub fn aggregate(entries: &[FocusEntry], now: OffsetDateTime) -> FocusAnalytics {
    aggregate_in(entries, now, &Local)
}

pub fn aggregate_in<Tz: TimeZone>(
    entries: &[FocusEntry],
    now: OffsetDateTime,
    zone: &Tz,
) -> FocusAnalytics {
    let Some((_, today)) = localize(now, zone) else {
        return FocusAnalytics::default();
    };
    let week_start = days_before(today, WEEK_DAYS - 1);
    let month_start = days_before(today, MONTH_DAYS - 1);

    let events: Vec<(OffsetDateTime, NaiveDate, &FocusEntry)> = entries
        .iter()
        .filter_map(|entry| {
            let (at, date) = localize(entry.occurred_at()?, zone)?;
            Some((at, date, entry))
        })
        .collect();

    // Local dates never decrease as instants advance, so "on or after the
    // first date" is the same as "at or after that date's local midnight".
    let sum_between = |first: NaiveDate, last: NaiveDate| -> i64 {
        events
            .iter()
            .filter(|(_, date, _)| *date >= first && *date <= last)
            .map(|(_, _, entry)| entry.duration)
            .sum()
    };

    let mut week = Vec::new();
    let mut cursor = Some(week_start);
    while let Some(date) = cursor.filter(|date| *date <= today) {
        week.push(DayBucket {
            date: date.to_string(),
            seconds: sum_between(date, date),
        });
        cursor = date.succ_opt();
    }

    let mut month = Vec::new();
    let mut cursor = Some(month_start);
    while let Some(start) = cursor.filter(|date| *date <= today) {
        let end = start
            .checked_add_days(Days::new((PERIOD_DAYS - 1) as u64))
            .map_or(today, |end| end.min(today));
        month.push(PeriodBucket {
            start: start.to_string(),
            end: end.to_string(),
            seconds: sum_between(start, end),
        });
        cursor = end.succ_opt();
    }

    let mut todays: Vec<&(OffsetDateTime, NaiveDate, &FocusEntry)> = events
        .iter()
        .filter(|(_, date, _)| *date >= today)
        .collect();
    todays.sort_by(|left, right| right.0.cmp(&left.0));
    let recent = todays
        .into_iter()
        .take(RECENT_LIMIT)
        .map(|(at, _, entry)| RecentSession {
            timestamp: format_timestamp(*at),
            duration: entry.duration,
        })
        .collect();

    FocusAnalytics {
        day_total: sum_between(today, NaiveDate::MAX),
        week_total: sum_between(week_start, NaiveDate::MAX),
        month_total: sum_between(month_start, NaiveDate::MAX),
        week,
        month,
        recent,
    }
}

/// The instant re-expressed in the zone's offset at that instant, with its
/// local calendar date.
fn localize<Tz: TimeZone>(
    at: OffsetDateTime,
    zone: &Tz,
) -> Option<(OffsetDateTime, NaiveDate)> {
    let local =
        DateTime::from_timestamp(at.unix_timestamp(), at.nanosecond())?.with_timezone(zone);
    let offset = UtcOffset::from_whole_seconds(local.offset().fix().local_minus_utc()).ok()?;
    Some((at.to_offset(offset), local.date_naive()))
}

fn days_before(date: NaiveDate, days: i64) -> NaiveDate {
    date.checked_sub_days(Days::new(days as u64)).unwrap_or(NaiveDate::MIN)
}

fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

fn weekday_label(raw: &str) -> String {
    parse_iso_date(raw)
        .map(|date| date.format("%a").to_string())
        .unwrap_or_else(|| raw.to_string())
}

fn short_date(raw: &str) -> String {
    parse_iso_date(raw)
        .map(|date| date.format("%m/%d").to_string())
        .unwrap_or_else(|| raw.to_string())
}

fn clock_label(timestamp: &str) -> String {
    parse_timestamp(timestamp)
        .map(|at| format!("{:02}:{:02}", at.hour(), at.minute()))
        .unwrap_or_else(|| timestamp.to_string())
}
