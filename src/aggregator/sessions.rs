use crate::catalog::api::CatalogSource;
use crate::catalog::dto::{non_blank, value_at, CatalogRecord};
use crate::catalog::error::FetchError;
use crate::config::model::EnvironmentConfig;
use crate::event::model::Surface;
use crate::event::normalizer::parse_event_date;
use crate::event::url::{resolve_purchase_url, UrlCandidate};
use crate::manual::repository::{calendar_sessions, ManualSource};
use crate::schedule::model::SessionWindow;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

const FALLBACK_TITLE: &str = "Evento";

/// Catalog and manual sessions for a date range. A failed catalog fetch still yields the
/// manual sessions, with the error kept for the caller to report.
#[derive(Debug, Default)]
pub struct RangeSessionsOutcome {
    pub sessions: Vec<CatalogRecord>,
    pub catalog_error: Option<FetchError>,
}

impl RangeSessionsOutcome {
    pub fn total(&self) -> usize {
        self.sessions.len()
    }
}

pub struct RangeSessions {
    catalog: Arc<dyn CatalogSource>,
    manual: Arc<dyn ManualSource>,
    env: EnvironmentConfig,
}

impl RangeSessions {
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        manual: Arc<dyn ManualSource>,
        env: EnvironmentConfig,
    ) -> Self {
        Self {
            catalog,
            manual,
            env,
        }
    }

    pub async fn fetch(&self, start: NaiveDate, end: NaiveDate) -> RangeSessionsOutcome {
        self.fetch_at(start, end, Utc::now()).await
    }

    /// Catalog sessions starting before `now`'s UTC day are dropped, manual ones are limited
    /// to the `[start, end]` window.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_at(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        now: DateTime<Utc>,
    ) -> RangeSessionsOutcome {
        let (catalog, manual) = futures::join!(
            self.catalog.fetch_sessions(start, end),
            self.manual.fetch_definitions()
        );

        let mut outcome = RangeSessionsOutcome::default();

        match catalog {
            Ok(sessions) => {
                outcome.sessions = drop_before_today(sessions, now, &self.env);
            }
            Err(err) => {
                error!("Catalog sessions {} to {} failed: {}", start, end, err);
                outcome.catalog_error = Some(err);
            }
        }

        match manual {
            Ok(definitions) => outcome.sessions.extend(calendar_sessions(
                &definitions,
                SessionWindow::between(start, end),
                &self.env,
            )),
            Err(err) => warn!("Manual sessions unavailable: {}", err),
        }

        info!("{} sessions between {} and {}", outcome.total(), start, end);

        outcome
    }
}

/// Sessions without a readable start are dropped too.
fn drop_before_today(
    sessions: Vec<CatalogRecord>,
    now: DateTime<Utc>,
    env: &EnvironmentConfig,
) -> Vec<CatalogRecord> {
    let today = now.date_naive().and_hms_opt(0, 0, 0).map(|midnight| midnight.and_utc());

    sessions
        .into_iter()
        .filter(|session| {
            let start = session
                .date
                .start
                .as_deref()
                .and_then(|raw| parse_event_date(raw, &env.timezone));

            match (start, today) {
                (Some(start), Some(today)) => start >= today,
                _ => false,
            }
        })
        .collect()
}

/// What the countdown needs to show the next session of an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextSessionBundle {
    pub date: DateTime<FixedOffset>,
    pub image: Option<String>,
    pub title: String,
    pub url: String,
}

/// The earliest session of `event_id` starting strictly after `now`.
pub fn next_session(
    sessions: &[CatalogRecord],
    event_id: &str,
    now: DateTime<Utc>,
    env: &EnvironmentConfig,
) -> Option<NextSessionBundle> {
    let (session, date) = sessions
        .iter()
        .filter(|session| {
            session
                .event
                .as_ref()
                .and_then(|event| event.id.as_deref())
                == Some(event_id)
        })
        .filter_map(|session| {
            let start = parse_event_date(session.date.start.as_deref()?, &env.timezone)?;

            Some((session, start))
        })
        .filter(|(_, start)| *start > now)
        .min_by_key(|(_, start)| *start)?;

    let base_id = session.base_id().unwrap_or_else(|| event_id.to_string());
    let url = resolve_purchase_url(
        UrlCandidate {
            explicit: session.explicit_url(),
            is_manual: session.is_manual(),
            event_id: &base_id,
        },
        env.overrides.redirect_for(&base_id),
        env.purchase_base.as_deref(),
        Surface::Countdown.override_policy(),
    );

    Some(NextSessionBundle {
        date,
        image: session_image(session),
        title: session_title(session),
        url,
    })
}

fn session_image(session: &CatalogRecord) -> Option<String> {
    let parent_images = session.event.as_ref().map(|event| &event.images);

    [
        value_at(&session.images, &["landscape", "0", "es-ES"]),
        value_at(&session.images, &["main", "es-ES"]),
        parent_images.and_then(|images| value_at(images, &["landscape", "0", "es-ES"])),
        parent_images.and_then(|images| value_at(images, &["main", "es-ES"])),
    ]
    .into_iter()
    .find_map(non_blank)
}

fn session_title(session: &CatalogRecord) -> String {
    let parent = session.event.as_ref();

    [
        parent.and_then(|event| event.texts.title.get("es-ES")),
        parent.and_then(|event| event.name.as_ref()),
        session.name.as_ref(),
    ]
    .into_iter()
    .flatten()
    .map(|title| title.trim())
    .find(|title| !title.is_empty())
    .unwrap_or(FALLBACK_TITLE)
    .to_string()
}
