use crate::aggregator::merge::aggregate;
use crate::aggregator::sources::BillboardSources;
use crate::cache::TimedCache;
use crate::catalog::dto::CatalogRecord;
use crate::catalog::error::FetchError;
use crate::event::model::{NormalizedEvent, Surface};
use crate::presentation::grid::Grid;
use chrono::{DateTime, Duration, Utc};
use tracing::{error, info, warn};

pub const BILLBOARD_CACHE_KEY: &str = "cartelera_billboard_v1";

pub fn billboard_ttl() -> Duration {
    Duration::hours(24)
}

/// Why a refresh left the grid without anything to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadFailure {
    Auth,
    Http,
    NoData,
}

impl LoadFailure {
    pub fn from_error(err: &FetchError) -> Self {
        if err.is_auth() {
            LoadFailure::Auth
        } else {
            LoadFailure::Http
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            LoadFailure::Auth => {
                "No autorizado: revisa las credenciales del catálogo en la página de ajustes."
            }
            LoadFailure::Http => "No se pudieron cargar eventos (error al consultar el catálogo).",
            LoadFailure::NoData => "No hay eventos disponibles en este momento.",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    Ready(Vec<NormalizedEvent>),
    /// Nothing usable came back but cached events are on screen.
    KeepCache,
    Failed(LoadFailure),
}

/// Stale-while-revalidate loading of the billboard.
pub struct BillboardLoader {
    sources: BillboardSources,
    cache: TimedCache<Vec<CatalogRecord>>,
}

impl BillboardLoader {
    pub fn new(sources: BillboardSources, cache: TimedCache<Vec<CatalogRecord>>) -> Self {
        Self { sources, cache }
    }

    /// Cached events, if any are still fresh.
    pub async fn cached(&self, now: DateTime<Utc>) -> Option<Vec<NormalizedEvent>> {
        let records = self
            .cache
            .read_at(BILLBOARD_CACHE_KEY, now)
            .await
            .filter(|records| !records.is_empty())?;

        Some(aggregate(&records, &[], Surface::Billboard, self.sources.env()))
    }

    /// Fetches both sources. The cache is only rewritten when the catalog answered.
    #[tracing::instrument(skip(self))]
    pub async fn refresh(&self, had_cache: bool, now: DateTime<Utc>) -> RefreshOutcome {
        let fetch = self.sources.fetch_at(now).await;

        let (catalog, failure) = match fetch.catalog {
            Ok(records) => (records, None),
            Err(err) => (Vec::new(), Some(LoadFailure::from_error(&err))),
        };

        if failure.is_none() {
            let combined: Vec<CatalogRecord> =
                catalog.iter().chain(&fetch.manual).cloned().collect();

            if let Err(err) = self.cache.write_at(BILLBOARD_CACHE_KEY, &combined, now).await {
                error!("Could not cache billboard: {}", err);
            }
        }

        let events = aggregate(&catalog, &fetch.manual, Surface::Billboard, self.sources.env());

        if events.is_empty() {
            if had_cache {
                warn!("Refresh returned nothing, keeping cached events");
                return RefreshOutcome::KeepCache;
            }

            return RefreshOutcome::Failed(failure.unwrap_or(LoadFailure::NoData));
        }

        if failure == Some(LoadFailure::Auth) && !fetch.manual.is_empty() {
            warn!("Only manual events loaded, the catalog rejected our credentials");
        }

        RefreshOutcome::Ready(events)
    }

    /// Paints the cache (or a skeleton), then the refreshed result.
    pub async fn load_into(&self, grid: &mut Grid) -> RefreshOutcome {
        self.load_into_at(grid, Utc::now()).await
    }

    pub async fn load_into_at(&self, grid: &mut Grid, now: DateTime<Utc>) -> RefreshOutcome {
        let had_cache = match self.cached(now).await {
            Some(events) => {
                info!("Showing {} cached events", events.len());
                let pass = grid.set_events(events);
                grid.drain(pass);
                true
            }
            None => {
                grid.show_skeleton();
                false
            }
        };

        let outcome = self.refresh(had_cache, now).await;

        match &outcome {
            RefreshOutcome::Ready(events) => {
                let pass = grid.set_events(events.clone());
                grid.drain(pass);
            }
            RefreshOutcome::KeepCache => {}
            RefreshOutcome::Failed(failure) => grid.show_message(failure.message()),
        }

        outcome
    }
}
