use super::api::{CatalogAPI, CatalogSettings, CatalogSource};
use super::auth::{StaticToken, TokenProvider};
use super::dto::CatalogRecord;
use super::error::FetchError;
use crate::config::model::{normalize_purchase_base, CatalogConfig};
use async_trait::async_trait;
use chrono::NaiveDate;
use futures::future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Every catalog account behind one source.
///
/// Billboard events are gathered from all of them. Sessions come from the first account
/// that can authenticate, the default one.
pub struct CatalogIntegrations {
    catalogs: Vec<CatalogAPI>,
}

impl CatalogIntegrations {
    pub fn new(catalogs: Vec<CatalogAPI>) -> Self {
        Self { catalogs }
    }

    pub fn from_config(config: &CatalogConfig) -> Self {
        let catalogs = config
            .integrations
            .iter()
            .filter(|integration| {
                let usable = integration.is_usable();
                if !usable {
                    warn!("Skipping integration '{}': no catalog url or token", integration.slug());
                }
                usable
            })
            .map(|integration| {
                let mut settings = CatalogSettings::new(&integration.api_url)
                    .with_integration(&integration.slug(), &integration.label);
                settings.timeout = config.timeout;
                settings.purchase_base = normalize_purchase_base(&integration.purchase_base);

                let tokens: Arc<dyn TokenProvider> =
                    Arc::new(StaticToken::new(integration.token.clone()));

                CatalogAPI::new(settings, tokens)
            })
            .collect();

        Self::new(catalogs)
    }

    pub fn len(&self) -> usize {
        self.catalogs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalogs.is_empty()
    }
}

#[async_trait]
impl CatalogSource for CatalogIntegrations {
    /// Concatenates every integration that answered. Fails only when none did,
    /// with the first real error, or `MissingToken` when no integration had credentials.
    #[tracing::instrument(skip(self), fields(integrations = self.catalogs.len()))]
    async fn fetch_events(&self) -> Result<Vec<CatalogRecord>, FetchError> {
        let results =
            future::join_all(self.catalogs.iter().map(|catalog| catalog.fetch_events())).await;

        let mut events = Vec::new();
        let mut answered = false;
        let mut first_error = None;

        for (catalog, result) in self.catalogs.iter().zip(results) {
            let slug = &catalog.settings().integration;

            match result {
                Ok(records) => {
                    debug!("Integration '{}' returned {} events", slug, records.len());
                    answered = true;
                    events.extend(records);
                }
                Err(FetchError::MissingToken) => {
                    warn!("Integration '{}' has no token, skipping it", slug);
                }
                Err(err) => {
                    warn!("Integration '{}' failed: {}", slug, err);
                    first_error.get_or_insert(err);
                }
            }
        }

        if !answered {
            return Err(first_error.unwrap_or(FetchError::MissingToken));
        }

        info!("Got {} events across integrations", events.len());

        Ok(events)
    }

    async fn fetch_sessions(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CatalogRecord>, FetchError> {
        for catalog in &self.catalogs {
            match catalog.fetch_sessions(start, end).await {
                Err(FetchError::MissingToken) => {
                    warn!(
                        "Integration '{}' has no token, trying the next one",
                        catalog.settings().integration
                    );
                }
                result => return result,
            }
        }

        Err(FetchError::MissingToken)
    }
}
