use crate::catalog::api::CatalogSource;
use crate::catalog::dto::CatalogRecord;
use crate::catalog::error::FetchError;
use crate::config::model::EnvironmentConfig;
use crate::manual::repository::{billboard_items, ManualSource};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

/// Both halves of a billboard refresh. The manual half is empty when its source failed.
#[derive(Debug)]
pub struct BillboardFetch {
    pub catalog: Result<Vec<CatalogRecord>, FetchError>,
    pub manual: Vec<CatalogRecord>,
}

/// Catalog events and manual billboard items, fetched concurrently.
pub struct BillboardSources {
    catalog: Arc<dyn CatalogSource>,
    manual: Arc<dyn ManualSource>,
    env: EnvironmentConfig,
}

impl BillboardSources {
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

    pub fn env(&self) -> &EnvironmentConfig {
        &self.env
    }

    pub async fn fetch(&self) -> BillboardFetch {
        self.fetch_at(Utc::now()).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn fetch_at(&self, now: DateTime<Utc>) -> BillboardFetch {
        let (catalog, manual) =
            futures::join!(self.catalog.fetch_events(), self.manual.fetch_definitions());

        let manual = match manual {
            Ok(definitions) => billboard_items(&definitions, now, &self.env),
            Err(err) => {
                warn!("Manual events unavailable: {}", err);
                Vec::new()
            }
        };

        if let Err(err) = &catalog {
            warn!("Catalog events unavailable: {}", err);
        }

        info!(
            "Billboard sources: {} catalog, {} manual",
            catalog.as_ref().map(Vec::len).unwrap_or(0),
            manual.len()
        );

        BillboardFetch { catalog, manual }
    }
}
