use crate::category::model::ResolvedCategory;
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::cmp::Ordering;

/// Where a normalized event is going to be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Surface {
    Billboard,
    Calendar,
    Countdown,
}

/// How a surface combines an admin redirect with the record's own url.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverridePolicy {
    /// The redirect replaces whatever url was resolved, manual or not.
    Uniform,
    /// A manual record's own url is final, the redirect only applies otherwise.
    ManualExplicitFirst,
}

impl Surface {
    pub fn default_cta(&self) -> &'static str {
        match self {
            Surface::Billboard | Surface::Countdown => "Entradas",
            Surface::Calendar => "Tickets",
        }
    }

    pub fn override_policy(&self) -> OverridePolicy {
        match self {
            Surface::Billboard => OverridePolicy::Uniform,
            Surface::Calendar | Surface::Countdown => OverridePolicy::ManualExplicitFirst,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedEvent {
    pub id: String,
    pub title: String,
    pub title_lower: String,
    pub first_date: Option<DateTime<FixedOffset>>,
    pub last_date: Option<DateTime<FixedOffset>>,
    pub image: String,
    pub url: String,
    pub cta_label: String,
    pub is_manual: bool,
    pub category: ResolvedCategory,
    pub category_color: Option<String>,
    pub category_text_color: Option<&'static str>,
    pub venue: Option<String>,
    /// Minimum price as sent by the catalog, without currency.
    pub price: Option<String>,
    /// `HH:MM` or `HH:MM - HH:MM`, only filled for the calendar.
    pub display_time: Option<String>,
}

impl NormalizedEvent {
    /// Ascending by first date, undated events last.
    pub fn cmp_by_first_date(&self, other: &Self) -> Ordering {
        match (&self.first_date, &other.first_date) {
            (Some(a), Some(b)) => a.cmp(b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}
