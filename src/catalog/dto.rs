use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Page envelope returned by the catalog API.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CatalogPage {
    #[serde(deserialize_with = "deserialize_records")]
    pub data: Vec<CatalogRecord>,
    #[serde(deserialize_with = "lenient")]
    pub metadata: PageMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PageMetadata {
    #[serde(deserialize_with = "lenient")]
    pub total: u64,
    #[serde(deserialize_with = "lenient")]
    pub offset: u64,
    #[serde(deserialize_with = "lenient")]
    pub limit: u64,
}

/// One catalog event or session, or a manual record shaped like one.
///
/// Every field tolerates a wrong JSON type by falling back to its default, so a partial
/// record never fails to deserialize.
// Note: images and media stay as raw JSON, their shape differs between endpoints
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogRecord {
    #[serde(deserialize_with = "deserialize_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub event: Option<ParentEvent>,
    #[serde(deserialize_with = "lenient")]
    pub date: DateSpan,
    #[serde(deserialize_with = "lenient")]
    pub texts: Texts,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub images: Value,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub media: Value,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryDto>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub price: Option<PriceDto>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub venue: Option<VenueDto>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub cloudari: CloudariMeta,
}

impl CatalogRecord {
    /// Id used for overrides and purchase links: the parent event id, else the record id.
    pub fn base_id(&self) -> Option<String> {
        self.event
            .as_ref()
            .and_then(|event| event.id.clone())
            .or_else(|| self.id.clone())
    }

    pub fn is_manual(&self) -> bool {
        self.cloudari.manual
            || self
                .id
                .as_deref()
                .is_some_and(|id| id.starts_with(MANUAL_ID_PREFIX))
    }

    /// The record's own `url`, when not blank.
    pub fn explicit_url(&self) -> Option<&str> {
        self.url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

pub const MANUAL_ID_PREFIX: &str = "manual-";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ParentEvent {
    #[serde(deserialize_with = "deserialize_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub texts: Texts,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub images: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DateSpan {
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

/// Strings keyed by locale (`es-ES`, `es`, ...). Non-string entries are dropped.
pub type Localized = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Texts {
    #[serde(deserialize_with = "deserialize_localized")]
    pub title: Localized,
    #[serde(deserialize_with = "deserialize_localized")]
    pub subtitle: Localized,
    #[serde(deserialize_with = "deserialize_localized")]
    pub description_long: Localized,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CategoryDto {
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub custom: CategoryCustom,
    #[serde(deserialize_with = "lenient")]
    pub parent: CategoryParent,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CategoryCustom {
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CategoryParent {
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PriceDto {
    #[serde(deserialize_with = "lenient")]
    pub min: PriceMin,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PriceMin {
    pub value: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct VenueDto {
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Crate-owned annotations carried on records we produce ourselves.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CloudariMeta {
    #[serde(deserialize_with = "lenient")]
    pub manual: bool,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub cta_label: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub category_color: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub integration: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub integration_label: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub purchase_base: Option<String>,
}

/// Walks a JSON value by object keys and array indexes given as strings.
pub fn value_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| match current {
        Value::Object(map) => map.get(*key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

pub fn non_blank(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn lenient<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(d)?;

    Ok(serde_json::from_value(value).unwrap_or_default())
}

fn deserialize_id<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(d)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) if n.as_f64().is_some_and(|n| n != 0.0) => Some(n.to_string()),
        _ => None,
    })
}

fn deserialize_localized<'de, D>(d: D) -> Result<Localized, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(d)? {
        Value::Object(map) => map
            .into_iter()
            .filter_map(|(locale, text)| match text {
                Value::String(text) => Some((locale, text)),
                _ => None,
            })
            .collect(),
        _ => Localized::new(),
    })
}

fn deserialize_records<'de, D>(d: D) -> Result<Vec<CatalogRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(d)? {
        Value::Array(items) => items
            .into_iter()
            .filter(Value::is_object)
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}
