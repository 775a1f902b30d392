use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Timelike, Weekday};
use chrono_tz::Tz;
use voca_rs::case::capitalize;

pub const MONTHS: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

/// Sunday first, like `num_days_from_sunday`.
pub const WEEKDAYS: [&str; 7] = [
    "domingo",
    "lunes",
    "martes",
    "miércoles",
    "jueves",
    "viernes",
    "sábado",
];

pub fn month_name(month: u32) -> &'static str {
    MONTHS[(month.clamp(1, 12) - 1) as usize]
}

pub fn weekday_name(weekday: Weekday) -> &'static str {
    WEEKDAYS[weekday.num_days_from_sunday() as usize]
}

pub fn capitalize_first(text: &str) -> String {
    capitalize(text, false)
}

/// `05 de enero de 2026`
pub fn format_full_date(date: NaiveDate) -> String {
    format!(
        "{:02} de {} de {}",
        date.day(),
        month_name(date.month()),
        date.year()
    )
}

/// Billboard date line: one date, or `Del <a> al <b>` when first and last fall on different
/// local days.
pub fn format_date_range(
    first: Option<&DateTime<FixedOffset>>,
    last: Option<&DateTime<FixedOffset>>,
    tz: &Tz,
) -> String {
    let local = |dt: &DateTime<FixedOffset>| dt.with_timezone(tz).date_naive();

    match (first.map(local), last.map(local)) {
        (None, None) => String::new(),
        (Some(day), None) | (None, Some(day)) => format_full_date(day),
        (Some(a), Some(b)) if a == b => format_full_date(a),
        (Some(a), Some(b)) => format!("Del {} al {}", format_full_date(a), format_full_date(b)),
    }
}

/// `Miércoles, 24 de diciembre, 20:00` in the given timezone.
pub fn format_session_date(dt: &DateTime<FixedOffset>, tz: &Tz) -> String {
    let local = dt.with_timezone(tz);

    capitalize_first(&format!(
        "{}, {:02} de {}, {:02}:{:02}",
        weekday_name(local.weekday()),
        local.day(),
        month_name(local.month()),
        local.hour(),
        local.minute()
    ))
}
