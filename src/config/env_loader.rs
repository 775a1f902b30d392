use crate::catalog::api::DEFAULT_TIMEOUT;
use crate::config::model::{
    CatalogConfig, Config, EnvironmentConfig, IntegrationConfig, Override, Overrides,
};
use crate::schedule::timezone::{parse_timezone, DEFAULT_TIMEZONE};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use std::{env, fs};
use tracing::warn;

const DEFAULT_COUNTDOWN_EXTRA_DAYS: i64 = 180;

pub fn load_config() -> Config {
    let timezone = match load_optional_config("TIMEZONE") {
        None => DEFAULT_TIMEZONE,
        Some(name) => parse_timezone(&name)
            .unwrap_or_else(|| panic!("TIMEZONE '{}' is not a valid IANA timezone", name)),
    };
    let purchase_base = load_optional_config("PURCHASE_BASE");

    if purchase_base.is_none() {
        warn!("PURCHASE_BASE not set. Catalog events will link to '#'.");
    }

    let mut environment = EnvironmentConfig::new(purchase_base.as_deref(), timezone)
        .with_overrides(load_overrides("OVERRIDES_FILE"));

    if let Some(venue_name) = load_optional_config("VENUE_NAME") {
        environment = environment.with_venue_name(&venue_name);
    }

    Config {
        environment,
        catalog: CatalogConfig {
            integrations: load_integrations("CATALOG_INTEGRATIONS_FILE"),
            timeout: load_u64_config("API_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TIMEOUT),
        },
        manual_events_file: load_optional_config("MANUAL_EVENTS_FILE").map(PathBuf::from),
        cache_dir: load_optional_config("CACHE_DIR").map(PathBuf::from),
        countdown_extra_days: load_u64_config("COUNTDOWN_EXTRA_DAYS")
            .map(|days| {
                i64::try_from(days)
                    .unwrap_or_else(|_| panic!("COUNTDOWN_EXTRA_DAYS '{}' is out of range", days))
            })
            .unwrap_or(DEFAULT_COUNTDOWN_EXTRA_DAYS),
    }
}

fn load_optional_config(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn load_u64_config(name: &str) -> Option<u64> {
    load_optional_config(name).map(|value| {
        value.parse().unwrap_or_else(|_| {
            panic!("Invalid config '{}'. Expected a positive integer number.", name)
        })
    })
}

fn load_overrides(name: &str) -> Overrides {
    let Some(path) = load_optional_config(name) else {
        return Overrides::default();
    };

    let raw = fs::read_to_string(&path)
        .unwrap_or_else(|err| panic!("Could not read {} at '{}': {}", name, path, err));
    let rows: HashMap<String, Override> = serde_json::from_str(&raw)
        .unwrap_or_else(|err| panic!("Invalid overrides in '{}': {}", path, err));

    Overrides::from_rows(&rows)
}

/// Every configured catalog account, from a JSON file or the single-account variables.
fn load_integrations(name: &str) -> Vec<IntegrationConfig> {
    let integrations = match load_optional_config(name) {
        Some(path) => {
            let raw = fs::read_to_string(&path)
                .unwrap_or_else(|err| panic!("Could not read {} at '{}': {}", name, path, err));

            serde_json::from_str::<Vec<IntegrationConfig>>(&raw)
                .unwrap_or_else(|err| panic!("Invalid integrations in '{}': {}", path, err))
        }
        None => load_optional_config("CATALOG_API_URL")
            .map(|api_url| IntegrationConfig {
                api_url,
                token: load_optional_config("CATALOG_TOKEN"),
                purchase_base: load_optional_config("PURCHASE_BASE").unwrap_or_default(),
                ..Default::default()
            })
            .into_iter()
            .collect(),
    };

    if integrations.is_empty() {
        warn!("No catalog integration configured. Only manual events will be shown.");
    }

    integrations
}
