use chrono_tz::Tz;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Everything the normalization pipeline reads from the deployment, passed explicitly.
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    /// Always ends with `/` when present.
    pub purchase_base: Option<String>,
    pub timezone: Tz,
    pub overrides: Overrides,
    pub venue_name: Option<String>,
}

impl EnvironmentConfig {
    pub fn new(purchase_base: Option<&str>, timezone: Tz) -> Self {
        Self {
            purchase_base: purchase_base.and_then(normalize_purchase_base),
            timezone,
            overrides: Overrides::default(),
            venue_name: None,
        }
    }

    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_venue_name(mut self, venue_name: &str) -> Self {
        self.venue_name = Some(venue_name.to_string()).filter(|name| !name.trim().is_empty());
        self
    }
}

/// Blank and `/` mean "not configured"; anything else gets exactly one trailing slash.
pub fn normalize_purchase_base(raw: &str) -> Option<String> {
    let raw = raw.trim();

    if raw.is_empty() || raw == "/" {
        return None;
    }

    Some(format!("{}/", raw.trim_end_matches('/')))
}

/// Admin-authored exception for one event, as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Override {
    pub redirect_url: String,
    pub category_key: String,
}

/// Per-event overrides reduced to the two lookups the pipeline needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub special_redirects: HashMap<String, String>,
    pub category_overrides: HashMap<String, String>,
}

impl Overrides {
    /// Only positive integer ids are kept and empty values are dropped.
    pub fn from_rows(rows: &HashMap<String, Override>) -> Self {
        let mut overrides = Self::default();

        for (id, row) in rows {
            let Some(id) = id.trim().parse::<i64>().ok().filter(|id| *id > 0) else {
                continue;
            };
            let id = id.to_string();

            let redirect_url = row.redirect_url.trim();
            if !redirect_url.is_empty() {
                overrides
                    .special_redirects
                    .insert(id.clone(), redirect_url.to_string());
            }

            let category_key = sanitize_key(&row.category_key);
            if !category_key.is_empty() {
                overrides.category_overrides.insert(id, category_key);
            }
        }

        overrides
    }

    pub fn redirect_for(&self, event_id: &str) -> Option<&str> {
        self.special_redirects
            .get(event_id)
            .map(String::as_str)
            .filter(|url| !url.is_empty())
    }

    pub fn category_for(&self, event_id: &str) -> Option<&str> {
        self.category_overrides.get(event_id).map(String::as_str)
    }
}

/// Lowercase and keep only `[a-z0-9_-]`.
pub fn sanitize_key(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_' || *c == '-')
        .collect()
}

#[derive(Debug)]
pub struct Config {
    pub environment: EnvironmentConfig,
    pub catalog: CatalogConfig,
    pub manual_events_file: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub countdown_extra_days: i64,
}

#[derive(Debug)]
pub struct CatalogConfig {
    pub integrations: Vec<IntegrationConfig>,
    pub timeout: Duration,
}

/// One catalog account. The billboard lists the events of every usable integration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IntegrationConfig {
    pub slug: String,
    pub label: String,
    pub api_url: String,
    pub token: Option<String>,
    pub purchase_base: String,
}

impl IntegrationConfig {
    /// Integrations without a catalog url or a token are never queried.
    pub fn is_usable(&self) -> bool {
        !self.api_url.trim().is_empty()
            && self
                .token
                .as_deref()
                .is_some_and(|token| !token.trim().is_empty())
    }

    pub fn slug(&self) -> String {
        Some(sanitize_key(&self.slug))
            .filter(|slug| !slug.is_empty())
            .unwrap_or_else(|| "default".to_string())
    }
}
