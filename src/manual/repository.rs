use super::model::{ManualEventDefinition, ManualMode};
use crate::catalog::dto::{
    CatalogRecord, CategoryCustom, CategoryDto, CategoryParent, CloudariMeta, DateSpan,
    ParentEvent, PriceDto, PriceMin, Texts, VenueDto, MANUAL_ID_PREFIX,
};
use crate::config::model::EnvironmentConfig;
use crate::schedule::expand::expand_range;
use crate::schedule::model::SessionWindow;
use crate::schedule::timezone::{format_iso, localize_date_time};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveTime, Utc};
use serde_json::{json, Value};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ManualError {
    #[error("Could not read manual events: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid manual events document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Where manual event definitions come from.
#[async_trait]
pub trait ManualSource: Send + Sync {
    async fn fetch_definitions(&self) -> Result<Vec<ManualEventDefinition>, ManualError>;
}

/// JSON array of definitions on disk, read on every fetch.
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ManualSource for JsonFileSource {
    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    async fn fetch_definitions(&self) -> Result<Vec<ManualEventDefinition>, ManualError> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let definitions: Vec<ManualEventDefinition> = serde_json::from_str(&raw)?;

        info!("Loaded {} manual events", definitions.len());

        Ok(definitions)
    }
}

/// Fixed definitions kept in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticSource(pub Vec<ManualEventDefinition>);

#[async_trait]
impl ManualSource for StaticSource {
    async fn fetch_definitions(&self) -> Result<Vec<ManualEventDefinition>, ManualError> {
        Ok(self.0.clone())
    }
}

fn landscape_image(url: &str) -> Value {
    json!({ "landscape": [ { "es-ES": url } ] })
}

fn title_texts(title: &str) -> Texts {
    let mut texts = Texts::default();
    texts.title.insert("es-ES".to_string(), title.to_string());
    texts
}

fn cloudari(definition: &ManualEventDefinition) -> CloudariMeta {
    CloudariMeta {
        manual: true,
        mode: Some(<&str>::from(definition.mode).to_string()),
        cta_label: definition.cta_label(),
        ..Default::default()
    }
}

/// Shape shared by every calendar session of one definition.
fn session_record(
    definition: &ManualEventDefinition,
    id: String,
    date: DateSpan,
    env: &EnvironmentConfig,
) -> CatalogRecord {
    CatalogRecord {
        id: Some(id),
        name: Some(definition.title.clone()),
        event: Some(ParentEvent {
            id: Some(definition.id.to_string()),
            name: Some(definition.title.clone()),
            texts: title_texts(&definition.title),
            images: Value::Null,
        }),
        date,
        images: landscape_image(&definition.image_url),
        price: Some(PriceDto {
            min: PriceMin {
                value: Value::String(String::new()),
            },
        }),
        venue: Some(VenueDto {
            name: env.venue_name.clone(),
        }),
        url: definition.url(),
        cloudari: cloudari(definition),
        ..Default::default()
    }
}

fn calendar_sessions_for(
    definition: &ManualEventDefinition,
    window: SessionWindow,
    env: &EnvironmentConfig,
) -> Vec<CatalogRecord> {
    let tz = &env.timezone;

    match definition.mode {
        ManualMode::Range => {
            let Some((range_start, range_end)) = definition.range_bounds() else {
                debug!("Manual event {} has no valid range", definition.id);
                return Vec::new();
            };

            let expansion = expand_range(
                range_start,
                range_end,
                &definition.schedule_rules,
                &definition.exceptions(),
                window,
                *tz,
            );

            expansion
                .iter()
                .enumerate()
                .map(|(idx, instance)| {
                    let date = DateSpan {
                        start: Some(instance.start_iso()),
                        end: Some(instance.end_iso()),
                    };
                    let id = format!("{}{}-range-{}", MANUAL_ID_PREFIX, definition.id, idx);

                    session_record(definition, id, date, env)
                })
                .collect()
        }
        ManualMode::Sessions => definition
            .sessions
            .iter()
            .filter_map(|session| {
                let date = session.date()?;
                let start_time = session.start_time();

                window
                    .contains(date.and_time(start_time))
                    .then(|| DateSpan {
                        start: Some(format_iso(&localize_date_time(tz, date, start_time))),
                        end: session
                            .end_time()
                            .map(|end| format_iso(&localize_date_time(tz, date, end))),
                    })
            })
            .enumerate()
            .map(|(idx, date)| {
                let id = format!("{}{}-{}", MANUAL_ID_PREFIX, definition.id, idx);

                session_record(definition, id, date, env)
            })
            .collect(),
    }
}

/// Every manual session starting inside the window, shaped like catalog sessions.
pub fn calendar_sessions(
    definitions: &[ManualEventDefinition],
    window: SessionWindow,
    env: &EnvironmentConfig,
) -> Vec<CatalogRecord> {
    definitions
        .iter()
        .flat_map(|definition| calendar_sessions_for(definition, window, env))
        .collect()
}

/// Start and end of the whole event in local time.
fn event_span(
    definition: &ManualEventDefinition,
    env: &EnvironmentConfig,
) -> Option<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
    let tz = &env.timezone;

    match definition.mode {
        ManualMode::Range => {
            let (range_start, range_end) = definition.range_bounds()?;
            let end_of_day = NaiveTime::from_hms_opt(23, 59, 59)?;

            Some((
                localize_date_time(tz, range_start, NaiveTime::MIN),
                localize_date_time(tz, range_end, end_of_day),
            ))
        }
        ManualMode::Sessions => {
            let mut sessions: Vec<_> = definition
                .sessions
                .iter()
                .filter_map(|session| session.date().map(|date| (date, session)))
                .collect();
            sessions.sort_by_key(|(date, session)| (*date, session.start_time()));

            let (first_date, first) = sessions.first()?;
            let (last_date, last) = sessions.last()?;
            let last_time = last.end_time().unwrap_or_else(|| last.start_time());

            Some((
                localize_date_time(tz, *first_date, first.start_time()),
                localize_date_time(tz, *last_date, last_time),
            ))
        }
    }
}

fn billboard_item(
    definition: &ManualEventDefinition,
    now: DateTime<Utc>,
    env: &EnvironmentConfig,
) -> Option<CatalogRecord> {
    let Some((starts_at, ends_at)) = event_span(definition, env) else {
        debug!("Manual event {} has no usable dates", definition.id);
        return None;
    };

    if ends_at < now {
        debug!("Manual event {} already finished", definition.id);
        return None;
    }

    let term = definition.term();
    let code = term.slug.to_uppercase();
    let color = term.color();

    let category = CategoryDto {
        code: Some(code.clone()),
        slug: Some(term.slug.clone()),
        name: Some(term.name.clone()),
        color: None,
        custom: CategoryCustom {
            code: Some(code.clone()),
            color: color.clone(),
        },
        parent: CategoryParent { code: Some(code) },
    };

    Some(CatalogRecord {
        id: Some(format!("{}{}", MANUAL_ID_PREFIX, definition.id)),
        name: Some(definition.title.clone()),
        texts: title_texts(&definition.title),
        images: landscape_image(&definition.image_url),
        date: DateSpan {
            start: Some(format_iso(&starts_at)),
            end: Some(format_iso(&ends_at)),
        },
        url: definition.url(),
        category: Some(category),
        cloudari: CloudariMeta {
            category_color: color,
            ..cloudari(definition)
        },
        ..Default::default()
    })
}

/// One billboard item per manual event that has not finished yet.
pub fn billboard_items(
    definitions: &[ManualEventDefinition],
    now: DateTime<Utc>,
    env: &EnvironmentConfig,
) -> Vec<CatalogRecord> {
    let items: Vec<CatalogRecord> = definitions
        .iter()
        .filter_map(|definition| billboard_item(definition, now, env))
        .collect();

    debug!(
        "{} of {} manual events on the billboard",
        items.len(),
        definitions.len()
    );

    items
}
