use super::extractors::extract_image;
use super::model::{NormalizedEvent, Surface};
use super::url::{resolve_purchase_url, UrlCandidate};
use crate::catalog::dto::{CatalogRecord, Localized};
use crate::category::classifier::resolve_category;
use crate::category::color::{pick_category_color, text_color_for};
use crate::config::model::EnvironmentConfig;
use crate::schedule::timezone::localize;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use chrono_tz::Tz;
use serde_json::Value;
use tracing::{debug, warn};

pub const UNTITLED: &str = "Sin título";
const MAX_CTA_CHARS: usize = 30;
const NAIVE_DATE_TIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"];

/// Parses catalog and manual timestamps. Values without an offset are local to `tz`.
pub fn parse_event_date(raw: &str, tz: &Tz) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();

    if raw.is_empty() {
        return None;
    }

    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date);
    }

    if let Ok(date) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(date);
    }

    if let Some(naive) = NAIVE_DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
    {
        return Some(localize(tz, naive));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|date| localize(tz, date.and_time(NaiveTime::MIN)))
}

fn spanish(texts: &Localized) -> Option<&str> {
    ["es-ES", "es"]
        .iter()
        .filter_map(|locale| texts.get(*locale))
        .map(|text| text.trim())
        .find(|text| !text.is_empty())
}

fn non_empty(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|text| !text.is_empty())
}

/// Events use `texts.title` then `name`. Sessions look at their parent event's title and
/// name before falling back to their own name.
pub fn resolve_title(record: &CatalogRecord) -> String {
    let parent = record.event.as_ref();

    spanish(&record.texts.title)
        .or_else(|| parent.and_then(|event| spanish(&event.texts.title)))
        .or_else(|| parent.and_then(|event| non_empty(event.name.as_deref())))
        .or_else(|| non_empty(record.name.as_deref()))
        .unwrap_or(UNTITLED)
        .to_string()
}

pub fn resolve_cta(record: &CatalogRecord, surface: Surface) -> String {
    let custom = record
        .is_manual()
        .then(|| non_empty(record.cloudari.cta_label.as_deref()))
        .flatten()
        .map(|label| label.chars().take(MAX_CTA_CHARS).collect::<String>())
        .map(|label| label.trim_end().to_string());

    custom.unwrap_or_else(|| surface.default_cta().to_string())
}

fn resolve_price(record: &CatalogRecord) -> Option<String> {
    match &record.price.as_ref()?.min.value {
        Value::Number(value) => Some(value.to_string()),
        Value::String(value) => non_empty(Some(value)).map(str::to_string),
        _ => None,
    }
}

fn resolve_venue(record: &CatalogRecord, env: &EnvironmentConfig) -> Option<String> {
    record
        .venue
        .as_ref()
        .and_then(|venue| non_empty(venue.name.as_deref()))
        .map(str::to_string)
        .or_else(|| env.venue_name.clone())
}

/// `HH:MM`, or `HH:MM - HH:MM` for manual sessions with a distinct end.
pub fn display_time(
    first_date: Option<&DateTime<FixedOffset>>,
    end: Option<&DateTime<FixedOffset>>,
    is_manual: bool,
    tz: &Tz,
) -> Option<String> {
    let start = first_date?.with_timezone(tz).format("%H:%M").to_string();

    let end = end
        .filter(|_| is_manual)
        .map(|end| end.with_timezone(tz).format("%H:%M").to_string())
        .filter(|end| *end != start);

    Some(match end {
        Some(end) => format!("{} - {}", start, end),
        None => start,
    })
}

/// Builds the shape every surface renders from. Records without a usable id are skipped.
pub fn normalize(
    record: &CatalogRecord,
    surface: Surface,
    env: &EnvironmentConfig,
) -> Option<NormalizedEvent> {
    let Some(id) = record.id.clone() else {
        debug!("Skipping record without id (name: {:?})", record.name);
        return None;
    };

    let tz = &env.timezone;
    let is_manual = record.is_manual();
    let base_id = record.base_id().unwrap_or_else(|| id.clone());
    let title = resolve_title(record);

    let url = resolve_purchase_url(
        UrlCandidate {
            explicit: record.explicit_url(),
            is_manual,
            event_id: &base_id,
        },
        env.overrides.redirect_for(&base_id),
        env.purchase_base.as_deref(),
        surface.override_policy(),
    );

    let first_date = record
        .date
        .start
        .as_deref()
        .and_then(|raw| parse_event_date(raw, tz));
    let end_date = record
        .date
        .end
        .as_deref()
        .and_then(|raw| parse_event_date(raw, tz));
    let last_date = match (first_date, end_date) {
        (Some(first), Some(end)) if end < first => Some(first),
        (first, None) => first,
        (_, end) => end,
    };

    let display_time = (surface == Surface::Calendar)
        .then(|| display_time(first_date.as_ref(), end_date.as_ref(), is_manual, tz))
        .flatten();

    let category_color = pick_category_color(record);
    let category_text_color = category_color.as_deref().and_then(text_color_for);

    Some(NormalizedEvent {
        title_lower: title.to_lowercase(),
        title,
        first_date,
        last_date,
        image: extract_image(record),
        url,
        cta_label: resolve_cta(record, surface),
        is_manual,
        category: resolve_category(record, &env.overrides),
        category_color,
        category_text_color,
        venue: resolve_venue(record, env),
        price: resolve_price(record),
        display_time,
        id,
    })
}

/// Same as [`normalize`] for a record still in raw JSON form.
pub fn normalize_value(
    raw: &Value,
    surface: Surface,
    env: &EnvironmentConfig,
) -> Option<NormalizedEvent> {
    if !raw.is_object() {
        warn!("Skipping non-object record: {}", raw);
        return None;
    }

    match serde_json::from_value::<CatalogRecord>(raw.clone()) {
        Ok(record) => normalize(&record, surface, env),
        Err(err) => {
            warn!("Skipping unreadable record: {}", err);
            None
        }
    }
}
