//! Wall-clock to offset-aware conversion in the deployment timezone.

use chrono::{DateTime, Duration, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone};
use chrono_tz::Tz;
use std::str::FromStr;

pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Madrid;

pub fn parse_timezone(name: &str) -> Option<Tz> {
    Tz::from_str(name.trim()).ok()
}

/// Resolves a local wall-clock time to an instant with its real UTC offset.
///
/// Ambiguous times (DST fold) take the earlier offset. Times inside a DST gap are shifted
/// forward by the size of the gap.
pub fn localize(tz: &Tz, naive: NaiveDateTime) -> DateTime<FixedOffset> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.fixed_offset(),
        LocalResult::Ambiguous(earliest, _) => earliest.fixed_offset(),
        LocalResult::None => {
            let offset_before_gap = tz
                .offset_from_utc_datetime(&(naive - Duration::days(1)))
                .fix();
            let utc = naive - Duration::seconds(offset_before_gap.local_minus_utc() as i64);

            tz.from_utc_datetime(&utc).fixed_offset()
        }
    }
}

pub fn localize_date_time(tz: &Tz, date: NaiveDate, time: NaiveTime) -> DateTime<FixedOffset> {
    localize(tz, date.and_time(time))
}

/// `YYYY-MM-DDTHH:MM:SS+HH:MM`, never `Z`.
pub fn format_iso(dt: &DateTime<FixedOffset>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}

pub fn iso_from_local(tz: &Tz, date: NaiveDate, time: NaiveTime) -> String {
    format_iso(&localize_date_time(tz, date, time))
}
