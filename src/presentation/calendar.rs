use crate::aggregator::merge::{aggregate, group_by_day};
use crate::aggregator::sessions::RangeSessions;
use crate::catalog::dto::CatalogRecord;
use crate::config::model::EnvironmentConfig;
use crate::event::extractors::IMG_PLACEHOLDER;
use crate::event::model::{NormalizedEvent, Surface};
use crate::presentation::locale::{capitalize_first, month_name, weekday_name};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub const DESKTOP_DAY_HEADERS: [&str; 7] = ["Do", "Lu", "Ma", "Mi", "Ju", "Vi", "Sa"];
pub const MOBILE_DAY_HEADERS: [&str; 7] = ["Lu", "Ma", "Mi", "Ju", "Vi", "Sa", "Do"];
pub const NO_VENUE: &str = "Sin ubicación";
pub const NO_PRICE: &str = "Precio no disponible";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarLayout {
    /// One column per day of the month.
    Desktop,
    /// Monday-first weeks.
    Mobile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    pub fn last_day(&self) -> Option<NaiveDate> {
        self.next().first_day().map(|first| first - Duration::days(1))
    }

    pub fn next(&self) -> Self {
        match self.month {
            12 => Self {
                year: self.year + 1,
                month: 1,
            },
            month => Self {
                year: self.year,
                month: month + 1,
            },
        }
    }

    pub fn prev(&self) -> Self {
        match self.month {
            1 => Self {
                year: self.year - 1,
                month: 12,
            },
            month => Self {
                year: self.year,
                month: month - 1,
            },
        }
    }

    /// `DICIEMBRE 2025`
    pub fn title(&self) -> String {
        format!("{} {}", month_name(self.month).to_uppercase(), self.year)
    }
}

/// One line of a day popover.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarEntry {
    pub id: String,
    pub time: String,
    pub title: String,
    pub venue: String,
    pub price: String,
    /// Empty when the session has no real image.
    pub image: String,
    pub url: String,
    pub is_manual: bool,
    pub cta_label: String,
}

impl From<&NormalizedEvent> for CalendarEntry {
    fn from(event: &NormalizedEvent) -> Self {
        Self {
            id: event.id.clone(),
            time: event.display_time.clone().unwrap_or_default(),
            title: event.title.clone(),
            venue: event.venue.clone().unwrap_or_else(|| NO_VENUE.to_string()),
            price: event
                .price
                .as_ref()
                .map(|value| format!("{}€", value))
                .unwrap_or_else(|| NO_PRICE.to_string()),
            image: if event.image == IMG_PLACEHOLDER {
                String::new()
            } else {
                event.image.clone()
            },
            url: event.url.clone(),
            is_manual: event.is_manual,
            cta_label: event.cta_label.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayCell {
    pub date: NaiveDate,
    pub is_today: bool,
    pub is_past: bool,
    /// `Miércoles 24 de Diciembre`
    pub header: String,
    pub entries: Vec<CalendarEntry>,
}

impl DayCell {
    pub fn has_events(&self) -> bool {
        !self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthView {
    pub month: YearMonth,
    pub title: String,
    pub prev_disabled: bool,
    pub days: Vec<DayCell>,
}

impl MonthView {
    pub fn headers(&self, layout: CalendarLayout) -> Vec<&'static str> {
        match layout {
            CalendarLayout::Desktop => self
                .days
                .iter()
                .map(|day| DESKTOP_DAY_HEADERS[day.date.weekday().num_days_from_sunday() as usize])
                .collect(),
            CalendarLayout::Mobile => MOBILE_DAY_HEADERS.to_vec(),
        }
    }

    /// Empty cells before the 1st.
    pub fn leading_blanks(&self, layout: CalendarLayout) -> usize {
        match layout {
            CalendarLayout::Desktop => 0,
            CalendarLayout::Mobile => self
                .days
                .first()
                .map(|day| day.date.weekday().num_days_from_monday() as usize)
                .unwrap_or(0),
        }
    }
}

impl Serialize for YearMonth {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&format!("{}-{:02}", self.year, self.month))
    }
}

pub fn is_past_month(month: YearMonth, today: NaiveDate) -> bool {
    month < YearMonth::of(today)
}

fn day_header(date: NaiveDate) -> String {
    format!(
        "{} {} de {}",
        capitalize_first(weekday_name(date.weekday())),
        date.day(),
        capitalize_first(month_name(date.month()))
    )
}

/// Lays out a month with the events of each local day, in start order.
pub fn month_view(
    month: YearMonth,
    events: &[NormalizedEvent],
    today: NaiveDate,
    env: &EnvironmentConfig,
) -> Option<MonthView> {
    let first = month.first_day()?;
    let last = month.last_day()?;
    let mut by_day = group_by_day(events, &env.timezone);

    let days = first
        .iter_days()
        .take_while(|date| *date <= last)
        .map(|date| DayCell {
            date,
            is_today: date == today,
            is_past: date < today,
            header: day_header(date),
            entries: by_day
                .remove(&date)
                .unwrap_or_default()
                .iter()
                .map(CalendarEntry::from)
                .collect(),
        })
        .collect();

    Some(MonthView {
        month,
        title: month.title(),
        prev_disabled: is_past_month(month.prev(), today),
        days,
    })
}

/// Month views backed by the range sessions service, each month fetched once.
pub struct CalendarService {
    sessions: RangeSessions,
    env: EnvironmentConfig,
    loaded: Mutex<HashMap<YearMonth, Vec<CatalogRecord>>>,
}

impl CalendarService {
    pub fn new(sessions: RangeSessions, env: EnvironmentConfig) -> Self {
        Self {
            sessions,
            env,
            loaded: Mutex::new(HashMap::new()),
        }
    }

    /// `None` for months already over, which are never fetched.
    #[tracing::instrument(skip(self))]
    pub async fn month(&self, month: YearMonth, now: DateTime<Utc>) -> Option<MonthView> {
        let today = now.with_timezone(&self.env.timezone).date_naive();

        if is_past_month(month, today) {
            debug!("Refusing past month {}", month.title());
            return None;
        }

        let sessions = self.sessions_for(month, now).await?;
        let events = aggregate(&sessions, &[], Surface::Calendar, &self.env);

        month_view(month, &events, today, &self.env)
    }

    /// Fetches a month ahead of time so navigating to it is instant.
    pub async fn preload(&self, month: YearMonth, now: DateTime<Utc>) {
        let _ = self.sessions_for(month, now).await;
    }

    async fn sessions_for(&self, month: YearMonth, now: DateTime<Utc>) -> Option<Vec<CatalogRecord>> {
        if let Some(sessions) = self.loaded.lock().await.get(&month) {
            return Some(sessions.clone());
        }

        let outcome = self
            .sessions
            .fetch_at(month.first_day()?, month.last_day()?, now)
            .await;

        // Months whose catalog fetch failed are fetched again next time
        if outcome.catalog_error.is_none() {
            info!("Caching {} sessions for {}", outcome.total(), month.title());
            self.loaded
                .lock()
                .await
                .insert(month, outcome.sessions.clone());
        }

        Some(outcome.sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::model::{CanonicalCategory, ResolvedCategory};
    use crate::schedule::timezone::DEFAULT_TIMEZONE;

    fn env() -> EnvironmentConfig {
        EnvironmentConfig::new(Some("https://t.example"), DEFAULT_TIMEZONE)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn event(id: &str, start: &str) -> NormalizedEvent {
        let first = DateTime::parse_from_rfc3339(start).unwrap();

        NormalizedEvent {
            id: id.to_string(),
            title: "Cascanueces".to_string(),
            title_lower: "cascanueces".to_string(),
            first_date: Some(first),
            last_date: Some(first),
            image: IMG_PLACEHOLDER.to_string(),
            url: "https://t.example/1".to_string(),
            cta_label: "Tickets".to_string(),
            is_manual: false,
            category: ResolvedCategory::from(CanonicalCategory::Teatro),
            category_color: None,
            category_text_color: None,
            venue: None,
            price: Some("18.5".to_string()),
            display_time: Some("20:00".to_string()),
        }
    }

    #[test_log::test]
    fn should_walk_months() {
        let december = YearMonth::new(2025, 12).unwrap();

        assert_eq!(december.next(), YearMonth::new(2026, 1).unwrap());
        assert_eq!(december.next().prev(), december);
        assert_eq!(december.last_day(), Some(date(2025, 12, 31)));
        assert_eq!(YearMonth::new(2024, 2).unwrap().last_day(), Some(date(2024, 2, 29)));
        assert_eq!(december.title(), "DICIEMBRE 2025");
        assert_eq!(YearMonth::new(2025, 13), None);
    }

    #[test_log::test]
    fn should_lay_out_month() {
        let december = YearMonth::new(2025, 12).unwrap();
        let events = vec![
            event("a", "2025-12-24T20:00:00+01:00"),
            event("b", "2025-11-30T20:00:00+01:00"),
        ];

        let view = month_view(december, &events, date(2025, 12, 10), &env()).unwrap();

        assert_eq!(view.days.len(), 31);
        assert!(view.prev_disabled);

        // 1 December 2025 is a Monday
        assert_eq!(view.leading_blanks(CalendarLayout::Mobile), 0);
        assert_eq!(view.leading_blanks(CalendarLayout::Desktop), 0);
        assert_eq!(view.headers(CalendarLayout::Desktop)[..3], ["Lu", "Ma", "Mi"]);
        assert_eq!(view.headers(CalendarLayout::Mobile), MOBILE_DAY_HEADERS.to_vec());

        assert!(view.days[8].is_past);
        assert!(view.days[9].is_today);
        assert!(!view.days[9].is_past);

        let christmas_eve = &view.days[23];
        assert_eq!(christmas_eve.header, "Miércoles 24 de Diciembre");
        assert_eq!(christmas_eve.entries.len(), 1);

        let entry = &christmas_eve.entries[0];
        assert_eq!(entry.venue, NO_VENUE);
        assert_eq!(entry.price, "18.5€");
        assert_eq!(entry.image, "");
        assert_eq!(entry.time, "20:00");

        assert_eq!(view.days.iter().filter(|d| d.has_events()).count(), 1);
    }

    #[test_log::test]
    fn mobile_layout_should_pad_to_monday() {
        // 1 February 2026 is a Sunday
        let february = YearMonth::new(2026, 2).unwrap();
        let view = month_view(february, &[], date(2025, 12, 10), &env()).unwrap();

        assert_eq!(view.leading_blanks(CalendarLayout::Mobile), 6);
        assert_eq!(view.headers(CalendarLayout::Desktop)[0], "Do");
        assert!(!view.prev_disabled);
    }

    #[test_log::test]
    fn missing_price_should_read_unavailable() {
        let mut source = event("a", "2025-12-24T20:00:00+01:00");
        source.price = None;
        source.venue = Some("Teatro Circo".to_string());

        let entry = CalendarEntry::from(&source);

        assert_eq!(entry.price, NO_PRICE);
        assert_eq!(entry.venue, "Teatro Circo");
    }

    #[test_log::test]
    fn should_detect_past_months() {
        let today = date(2025, 12, 10);

        assert!(is_past_month(YearMonth::new(2025, 11).unwrap(), today));
        assert!(!is_past_month(YearMonth::new(2025, 12).unwrap(), today));
        assert!(!is_past_month(YearMonth::new(2026, 1).unwrap(), today));
    }
}
