use crate::catalog::dto::{non_blank, value_at, CatalogRecord};
use serde::Deserialize;
use serde_either::SingleOrVec;
use serde_json::Value;
use std::collections::BTreeMap;

pub const IMG_PLACEHOLDER: &str =
    "data:image/gif;base64,R0lGODlhAQABAIAAAAAAAP///ywAAAAAAQABAAACAUwAOw==";

const CLASSIC_KEYS: [&str; 4] = ["landscape", "secondary", "main", "portrait"];
const CLASSIC_LOCALES: [&str; 4] = ["es-ES", "es_ES", "es", "en"];
const MEDIA_KEYS: [&str; 5] = ["LANDSCAPE", "SECONDARY", "MAIN", "PORTRAIT", "BANNER_HEADER"];
const MEDIA_LOCALES: [&str; 4] = ["es_ES", "es-ES", "es", "en"];

pub type ImageExtractor = fn(&CatalogRecord) -> Option<String>;

/// Tried in order, the first hit wins.
pub const IMAGE_EXTRACTORS: &[ImageExtractor] = &[
    classic_image,
    media_image,
    parent_event_image,
];

pub fn extract_image(record: &CatalogRecord) -> String {
    IMAGE_EXTRACTORS
        .iter()
        .find_map(|extract| extract(record))
        .unwrap_or_else(|| IMG_PLACEHOLDER.to_string())
}

/// `images.<kind>` holding either one locale map or a list of them.
pub fn classic_image(record: &CatalogRecord) -> Option<String> {
    classic_from(&record.images)
}

pub fn parent_event_image(record: &CatalogRecord) -> Option<String> {
    record
        .event
        .as_ref()
        .and_then(|event| classic_from(&event.images))
}

fn classic_from(images: &Value) -> Option<String> {
    CLASSIC_KEYS.iter().find_map(|key| {
        let entry = images.get(key)?.clone();
        let localized = match serde_json::from_value::<SingleOrVec<BTreeMap<String, Value>>>(entry)
            .ok()?
        {
            SingleOrVec::Single(localized) => localized,
            SingleOrVec::Vec(list) => list.into_iter().next()?,
        };

        CLASSIC_LOCALES
            .iter()
            .find_map(|locale| non_blank(localized.get(*locale)))
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MediaImage {
    Url(String),
    Wrapped { value: Value },
}

impl MediaImage {
    fn wrapped(&self) -> Option<String> {
        match self {
            MediaImage::Wrapped { value } => non_blank(Some(value)),
            MediaImage::Url(_) => None,
        }
    }

    fn url(&self) -> Option<String> {
        match self {
            MediaImage::Url(url) => Some(url.trim().to_string()).filter(|url| !url.is_empty()),
            MediaImage::Wrapped { .. } => self.wrapped(),
        }
    }
}

/// `media.images.<locale>.<KIND>` as a url, a `{value}` object or a list of those.
pub fn media_image(record: &CatalogRecord) -> Option<String> {
    let images = value_at(&record.media, &["images"])?;
    let localized = MEDIA_LOCALES
        .iter()
        .find_map(|locale| images.get(*locale).filter(|v| v.is_object()))?;

    MEDIA_KEYS.iter().find_map(|key| {
        let entry = localized.get(*key)?.clone();

        match serde_json::from_value::<SingleOrVec<MediaImage>>(entry).ok()? {
            SingleOrVec::Single(image) => image.url(),
            SingleOrVec::Vec(list) => list
                .iter()
                .find_map(MediaImage::wrapped)
                .or_else(|| list.first().and_then(MediaImage::url)),
        }
    })
}
