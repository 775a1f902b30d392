use super::auth::TokenProvider;
use super::dto::{CatalogPage, CatalogRecord};
use super::error::FetchError;
use async_trait::async_trait;
use chrono::{NaiveDate, SecondsFormat, Utc};
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::RetryTransientMiddleware;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const PAGE_LIMIT: u64 = 100;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_MAX_RETRIES: u32 = 2;
const EVENTS_RESOURCE: &str = "events";
const SESSIONS_RESOURCE: &str = "sessions";
const SESSION_TYPE: &str = "SESSION";
pub const DEFAULT_INTEGRATION: &str = "default";

/// `start` filter understood by the catalog for whole-day session ranges.
pub fn session_date_filter(start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "gte:{}T00:00:00Z,lte:{}T23:59:59Z",
        start.format("%Y-%m-%d"),
        end.format("%Y-%m-%d")
    )
}

/// Catalog-origin data as the aggregation layer consumes it.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Upcoming events on sale, for the billboard.
    async fn fetch_events(&self) -> Result<Vec<CatalogRecord>, FetchError>;

    /// Sessions starting between two dates (whole days, inclusive).
    async fn fetch_sessions(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CatalogRecord>, FetchError>;
}

#[derive(Debug, Clone)]
pub struct CatalogSettings {
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub purchase_base: Option<String>,
    /// Slug stamped on every billboard event fetched through these settings.
    pub integration: String,
    pub integration_label: Option<String>,
}

impl CatalogSettings {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            purchase_base: None,
            integration: DEFAULT_INTEGRATION.to_string(),
            integration_label: None,
        }
    }

    pub fn with_integration(mut self, slug: &str, label: &str) -> Self {
        self.integration = slug.to_string();
        self.integration_label = Some(label.trim().to_string()).filter(|label| !label.is_empty());
        self
    }
}

pub struct CatalogAPI {
    client: ClientWithMiddleware,
    settings: CatalogSettings,
    tokens: Arc<dyn TokenProvider>,
}

impl CatalogAPI {
    pub fn new(settings: CatalogSettings, tokens: Arc<dyn TokenProvider>) -> Self {
        let inner = Client::builder()
            .timeout(settings.timeout)
            .build()
            .unwrap_or_else(|err| {
                warn!("Could not apply client settings ({err}), using defaults");
                Client::new()
            });
        let client = ClientBuilder::new(inner)
            .with(RetryTransientMiddleware::new_with_policy(
                ExponentialBackoff::builder().build_with_max_retries(settings.max_retries),
            ))
            .build();

        Self {
            client,
            settings,
            tokens,
        }
    }

    pub fn settings(&self) -> &CatalogSettings {
        &self.settings
    }

    #[tracing::instrument(skip(self, query), fields(base_url = %self.settings.base_url))]
    pub async fn get_page(
        &self,
        resource: &str,
        query: &[(&str, String)],
    ) -> Result<CatalogPage, FetchError> {
        let token = self
            .tokens
            .bearer_token()
            .await
            .ok_or(FetchError::MissingToken)?;

        let request = async {
            let response = self
                .client
                .get(format!("{}/{}", self.settings.base_url, resource))
                .query(query)
                .bearer_auth(token)
                .header(reqwest::header::ACCEPT, "application/json")
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                error!("Catalog responded with {}", status);
                return Err(FetchError::from_status(status));
            }

            let body = response.text().await?;
            Ok::<_, FetchError>(body)
        };

        // Retries included, a page never takes longer than the client timeout
        let body = tokio::time::timeout(self.settings.timeout, request)
            .await
            .map_err(|_| {
                error!("Catalog page took longer than {:?}", self.settings.timeout);
                FetchError::Timeout
            })??;

        serde_json::from_str::<CatalogPage>(&body).map_err(|e| {
            error!("Response parse failed: {:?}", e);
            FetchError::Parse(e.to_string())
        })
    }

    /// Follows `offset` until the reported total is reached or a page comes back empty.
    async fn get_all(
        &self,
        resource: &str,
        base_query: Vec<(&str, String)>,
    ) -> Result<Vec<CatalogRecord>, FetchError> {
        let mut records = Vec::new();
        let mut offset = 0;

        loop {
            let mut query = base_query.clone();
            query.push(("limit", PAGE_LIMIT.to_string()));
            query.push(("offset", offset.to_string()));

            let page = self.get_page(resource, &query).await?;
            let received = page.data.len();
            let total = page.metadata.total;

            debug!(
                "Got {} {} (offset {}, total {})",
                received, resource, offset, total
            );

            records.extend(page.data);

            offset += PAGE_LIMIT;
            if total == 0 || received == 0 || offset >= total {
                break;
            }
        }

        Ok(records)
    }

    fn apply_integration_context(&self, mut record: CatalogRecord) -> CatalogRecord {
        if let (Some(id), Some(base)) = (&record.id, &self.settings.purchase_base) {
            record.url = Some(format!("{}{}", base, id));
        }

        record.cloudari.integration = Some(self.settings.integration.clone());
        record.cloudari.integration_label = self.settings.integration_label.clone();
        record.cloudari.purchase_base = self.settings.purchase_base.clone();
        record
    }
}

#[async_trait]
impl CatalogSource for CatalogAPI {
    #[tracing::instrument(skip(self))]
    async fn fetch_events(&self) -> Result<Vec<CatalogRecord>, FetchError> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let query = vec![
            ("for_sale", "true".to_string()),
            ("on_catalog", "true".to_string()),
            ("expand", "media".to_string()),
            ("start", format!("gte:{}", now)),
        ];

        let events: Vec<CatalogRecord> = self
            .get_all(EVENTS_RESOURCE, query)
            .await?
            .into_iter()
            .map(|record| self.apply_integration_context(record))
            .collect();

        info!("Got {} catalog events", events.len());

        Ok(events)
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_sessions(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CatalogRecord>, FetchError> {
        let query = vec![
            ("type", SESSION_TYPE.to_string()),
            ("start", session_date_filter(start, end)),
        ];

        let sessions = self.get_all(SESSIONS_RESOURCE, query).await?;

        info!("Got {} catalog sessions", sessions.len());

        Ok(sessions)
    }
}
