use crate::category::color::normalize_hex_color;
use crate::category::model::CanonicalCategory;
use crate::schedule::model::{parse_hour_minute, parse_iso_date, ExceptionRow, Exceptions, ScheduleRules};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

const MAX_CTA_CHARS: usize = 30;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum ManualMode {
    #[default]
    Sessions,
    Range,
}

impl<'de> Deserialize<'de> for ManualMode {
    /// Anything but `range` is a sessions event.
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(d)? {
            Value::String(mode) if mode.trim() == "range" => ManualMode::Range,
            _ => ManualMode::Sessions,
        })
    }
}

/// Taxonomy term a manual event is filed under.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CategoryTerm {
    pub id: u64,
    pub slug: String,
    pub name: String,
    pub color: String,
}

impl CategoryTerm {
    /// Term used when an event has none.
    pub fn fallback() -> Self {
        let teatro = CanonicalCategory::DEFAULT;

        Self {
            id: 0,
            slug: teatro.key().to_string(),
            name: teatro.label().to_string(),
            color: teatro.default_color().to_string(),
        }
    }

    pub fn color(&self) -> Option<String> {
        normalize_hex_color(&self.color)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ManualSession {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
}

impl ManualSession {
    pub fn date(&self) -> Option<NaiveDate> {
        parse_iso_date(&self.date)
    }

    /// Missing or malformed start times mean midnight.
    pub fn start_time(&self) -> NaiveTime {
        parse_hour_minute(&self.start_time).unwrap_or(NaiveTime::MIN)
    }

    pub fn end_time(&self) -> Option<NaiveTime> {
        parse_hour_minute(&self.end_time)
    }
}

/// A locally authored event, as stored by the admin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ManualEventDefinition {
    pub id: u64,
    pub title: String,
    pub url: String,
    pub cta_label: String,
    pub image_url: String,
    pub mode: ManualMode,
    pub category: Option<CategoryTerm>,
    pub sessions: Vec<ManualSession>,
    pub range_start: String,
    pub range_end: String,
    pub schedule_rules: ScheduleRules,
    pub exceptions: Vec<ExceptionRow>,
}

impl ManualEventDefinition {
    /// Trimmed and capped so a pasted paragraph never becomes a button.
    pub fn cta_label(&self) -> Option<String> {
        let label: String = self.cta_label.trim().chars().take(MAX_CTA_CHARS).collect();
        let label = label.trim();

        (!label.is_empty()).then(|| label.to_string())
    }

    pub fn url(&self) -> Option<String> {
        Some(self.url.trim().to_string()).filter(|url| !url.is_empty())
    }

    /// Both ends must be valid `YYYY-MM-DD` dates.
    pub fn range_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        parse_iso_date(&self.range_start).zip(parse_iso_date(&self.range_end))
    }

    pub fn exceptions(&self) -> Exceptions {
        Exceptions::from_rows(&self.exceptions)
    }

    pub fn term(&self) -> CategoryTerm {
        self.category.clone().unwrap_or_else(CategoryTerm::fallback)
    }
}
