use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::trace;

lazy_static! {
    static ref HOUR_MINUTE: Regex = Regex::new(r"^\d{2}:\d{2}$").unwrap();
    static ref ISO_DATE: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap();
}

/// Parses a strict `HH:MM` wall-clock time. Anything else counts as absent.
pub fn parse_hour_minute(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();

    if !HOUR_MINUTE.is_match(raw) {
        return None;
    }

    NaiveTime::parse_from_str(raw, "%H:%M").ok()
}

/// Parses a strict `YYYY-MM-DD` calendar date.
pub fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();

    if !ISO_DATE.is_match(raw) {
        return None;
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeSlot {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Both sides must be valid `HH:MM`, otherwise the slot does not resolve.
    pub fn parse(start: &str, end: &str) -> Option<Self> {
        Some(Self::new(parse_hour_minute(start)?, parse_hour_minute(end)?))
    }
}

/// Recurring opening hours of a range event, as authored (`HH:MM` strings, possibly empty).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRules {
    #[serde(default)]
    pub weekday_start: String,
    #[serde(default)]
    pub weekday_end: String,
    #[serde(default)]
    pub weekend_start: String,
    #[serde(default)]
    pub weekend_end: String,
}

impl ScheduleRules {
    pub fn weekday(&self) -> Option<TimeSlot> {
        TimeSlot::parse(&self.weekday_start, &self.weekday_end)
    }

    pub fn weekend(&self) -> Option<TimeSlot> {
        TimeSlot::parse(&self.weekend_start, &self.weekend_end)
    }
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Raw exception row as stored on a manual event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionRow {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
}

/// Date-specific opening hours. Always win over the weekday/weekend rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exceptions(BTreeMap<NaiveDate, TimeSlot>);

impl Exceptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows with an invalid date or time are dropped; a later row for the same date wins.
    pub fn from_rows(rows: &[ExceptionRow]) -> Self {
        rows.iter()
            .filter_map(|row| {
                let parsed = parse_iso_date(&row.date)
                    .zip(TimeSlot::parse(&row.start, &row.end));

                if parsed.is_none() {
                    trace!("Ignoring malformed exception row {:?}", row);
                }

                parsed
            })
            .collect()
    }

    pub fn insert(&mut self, date: NaiveDate, slot: TimeSlot) {
        self.0.insert(date, slot);
    }

    pub fn get(&self, date: &NaiveDate) -> Option<&TimeSlot> {
        self.0.get(date)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(NaiveDate, TimeSlot)> for Exceptions {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, TimeSlot)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// External query bound. The lower bound is the start of its day and the upper bound is
/// `23:59:59` of its day, both inclusive, compared against a session's local start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl SessionWindow {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn lower_bound(&self) -> Option<NaiveDateTime> {
        self.start.map(|date| date.and_time(NaiveTime::MIN))
    }

    pub fn upper_bound(&self) -> Option<NaiveDateTime> {
        self.end
            .and_then(|date| date.and_hms_opt(23, 59, 59))
    }

    pub fn contains(&self, local_start: NaiveDateTime) -> bool {
        let after_start = self
            .lower_bound()
            .map_or(true, |bound| local_start >= bound);
        let before_end = self
            .upper_bound()
            .map_or(true, |bound| local_start <= bound);

        after_start && before_end
    }
}

/// One materialized day of a range event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInstance {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl SessionInstance {
    pub fn start_iso(&self) -> String {
        super::timezone::format_iso(&self.start)
    }

    pub fn end_iso(&self) -> String {
        super::timezone::format_iso(&self.end)
    }
}
