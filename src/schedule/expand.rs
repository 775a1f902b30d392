use super::model::{is_weekend, Exceptions, ScheduleRules, SessionInstance, SessionWindow, TimeSlot};
use super::timezone::localize_date_time;
use chrono::NaiveDate;
use chrono_tz::Tz;

/// Finite, immutable description of the sessions a range event produces.
///
/// Nothing is computed until iterated, and every call to [`RangeExpansion::iter`] starts
/// over from the first day of the range.
#[derive(Debug, Clone)]
pub struct RangeExpansion {
    range_start: NaiveDate,
    range_end: NaiveDate,
    weekday: Option<TimeSlot>,
    weekend: Option<TimeSlot>,
    exceptions: Exceptions,
    window: SessionWindow,
    tz: Tz,
}

pub fn expand_range(
    range_start: NaiveDate,
    range_end: NaiveDate,
    rules: &ScheduleRules,
    exceptions: &Exceptions,
    window: SessionWindow,
    tz: Tz,
) -> RangeExpansion {
    RangeExpansion {
        range_start,
        range_end,
        weekday: rules.weekday(),
        weekend: rules.weekend(),
        exceptions: exceptions.clone(),
        window,
        tz,
    }
}

impl RangeExpansion {
    pub fn iter(&self) -> RangeIter<'_> {
        RangeIter {
            expansion: self,
            cursor: (self.range_start <= self.range_end).then_some(self.range_start),
        }
    }

    /// Slot that applies to a day, ignoring the window: exception first, then the
    /// weekend or weekday rule.
    pub fn slot_for(&self, date: NaiveDate) -> Option<TimeSlot> {
        if let Some(slot) = self.exceptions.get(&date) {
            return Some(*slot);
        }

        if is_weekend(date) {
            self.weekend
        } else {
            self.weekday
        }
    }

    fn instance_for(&self, date: NaiveDate) -> Option<SessionInstance> {
        let slot = self.slot_for(date)?;

        if !self.window.contains(date.and_time(slot.start)) {
            return None;
        }

        Some(SessionInstance {
            date,
            start_time: slot.start,
            end_time: slot.end,
            start: localize_date_time(&self.tz, date, slot.start),
            end: localize_date_time(&self.tz, date, slot.end),
        })
    }
}

impl<'a> IntoIterator for &'a RangeExpansion {
    type Item = SessionInstance;
    type IntoIter = RangeIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct RangeIter<'a> {
    expansion: &'a RangeExpansion,
    cursor: Option<NaiveDate>,
}

impl Iterator for RangeIter<'_> {
    type Item = SessionInstance;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let day = self.cursor?;

            if day > self.expansion.range_end {
                self.cursor = None;
                return None;
            }

            self.cursor = day.succ_opt();

            if let Some(instance) = self.expansion.instance_for(day) {
                return Some(instance);
            }
        }
    }
}
