use super::model::{CanonicalCategory, ResolvedCategory};
use crate::catalog::dto::{value_at, CatalogRecord, Localized};
use crate::config::model::Overrides;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::trace;
use voca_rs::case::capitalize;
use voca_rs::manipulate::latinise;
use CanonicalCategory::*;

/// Catalog category codes. Order matters for substring matching.
const CODE_TABLE: &[(&str, CanonicalCategory)] = &[
    ("ARTET", Teatro),
    ("ART", Teatro),
    ("ARTE", Teatro),
    ("ESCENICAS", Teatro),
    ("ESCÉNICAS", Teatro),
    ("ARTES ESCENICAS", Teatro),
    ("ARTES ESCÉNICAS", Teatro),
    ("THEATRE", Teatro),
    ("THEATER", Teatro),
    ("DRAMA", Teatro),
    ("PLAY", Teatro),
    ("TEATRO", Teatro),
    ("CIRCO", Teatro),
    ("DANZA", Teatro),
    ("DANCE", Teatro),
    ("ARTCLA", Musica),
    ("ARTMU", Musica),
    ("MUS", Musica),
    ("MUSICA", Musica),
    ("MÚSICA", Musica),
    ("MUSIC", Musica),
    ("CONCIERTO", Musica),
    ("CONCIERTOS", Musica),
    ("BANDA", Musica),
    ("GIRA", Musica),
    ("RECITAL", Musica),
    ("LIVE", Musica),
    ("FESTMUS", Musica),
    ("FESTIVAL MUSICAL", Musica),
    ("ARTHU", Humor),
    ("HUM", Humor),
    ("HUMOR", Humor),
    ("COMEDIA", Humor),
    ("COMEDY", Humor),
    ("COMICO", Humor),
    ("CÓMICO", Humor),
    ("MONOLOGO", Humor),
    ("MONÓLOGO", Humor),
    ("STANDUP", Humor),
    ("STAND UP", Humor),
    ("STAND-UP", Humor),
    ("IMPRO", Humor),
    ("IMPROV", Humor),
    ("ARTMS", Musical),
    ("ARTMUS", Musical),
    ("MUSICAL", Musical),
    ("TEATRO MUSICAL", Musical),
    ("SHOW MUSICAL", Musical),
    ("ESPECTACULO MUSICAL", Musical),
    ("ESPECTÁCULO MUSICAL", Musical),
    ("TALK", Talk),
    ("CONF", Talk),
    ("CULCON", Talk),
    ("CONFERENCIA", Talk),
    ("CONFERENCIAS", Talk),
    ("CHARLA", Talk),
    ("COLOQUIO", Talk),
    ("PONENCIA", Talk),
    ("DEBATE", Talk),
    ("MESA REDONDA", Talk),
    ("Q&A", Talk),
    ("Q AND A", Talk),
    ("ENTREVISTA", Talk),
    ("ENCUENTRO", Talk),
    ("SPEAKER", Talk),
    ("FIRESIDE", Talk),
    ("PRESENTACION", Talk),
    ("PRESENTACIÓN", Talk),
];

/// Keyword lists, checked in this order against the normalized text.
const KEYWORD_TABLE: &[(CanonicalCategory, &[&str])] = &[
    (
        Musical,
        &[
            "musical",
            "teatro musical",
            "espectaculo musical",
            "espectáculo musical",
            "show musical",
            "jukebox",
        ],
    ),
    (
        Humor,
        &[
            "humor",
            "comedia",
            "cómico",
            "comico",
            "monologo",
            "monólogo",
            "standup",
            "stand up",
            "stand-up",
            "impro",
            "improvisación",
            "improvisacion",
            "sketch",
        ],
    ),
    (
        Talk,
        &[
            "talk",
            "charla",
            "conferencia",
            "coloquio",
            "ponencia",
            "debate",
            "mesa redonda",
            "q&a",
            "q and a",
            "entrevista",
            "encuentro",
            "speaker",
            "fireside",
            "presentación",
            "presentacion",
        ],
    ),
    (
        Musica,
        &[
            "musica",
            "música",
            "music",
            "concierto",
            "conciertos",
            "live",
            "tributo",
            "banda",
            "gira",
            "recital",
            "piano",
            "guitarra",
            "sinfónica",
            "sinfonica",
            "dj",
            "orquesta",
            "coro",
        ],
    ),
    (
        Teatro,
        &[
            "teatro",
            "drama",
            "obra",
            "funcion",
            "función",
            "tragicomedia",
            "performance",
            "clown",
            "circo",
            "danza",
            "ballet",
            "mimo",
        ],
    ),
];

lazy_static! {
    static ref NON_ALPHANUMERIC: Regex = Regex::new(r"[^a-z0-9]+").unwrap();
    static ref KEYWORDS: Vec<(CanonicalCategory, Vec<String>)> = KEYWORD_TABLE
        .iter()
        .map(|(category, words)| {
            let words = words
                .iter()
                .map(|word| normalize_text(word))
                .filter(|word| !word.is_empty())
                .collect();
            (*category, words)
        })
        .collect();
}

pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Lowercase, strip diacritics, collapse everything else to single spaces.
pub fn normalize_text(raw: &str) -> String {
    let latin = latinise(&raw.to_lowercase());

    NON_ALPHANUMERIC
        .replace_all(&latin, " ")
        .trim()
        .to_string()
}

/// Exact code match first, then the first table code contained in a candidate.
pub fn code_to_canonical(candidates: &[Option<&str>]) -> Option<CanonicalCategory> {
    let candidates: Vec<String> = candidates
        .iter()
        .flatten()
        .map(|code| normalize_code(code))
        .filter(|code| !code.is_empty())
        .collect();

    for candidate in &candidates {
        if let Some((_, category)) = CODE_TABLE.iter().find(|(code, _)| *code == candidate.as_str()) {
            return Some(*category);
        }
    }

    for candidate in &candidates {
        if let Some((_, category)) = CODE_TABLE
            .iter()
            .find(|(code, _)| candidate.contains(*code))
        {
            return Some(*category);
        }
    }

    None
}

/// First keyword list with a keyword contained in the normalized text.
pub fn text_to_canonical(text: &str) -> Option<CanonicalCategory> {
    let normalized = normalize_text(text);

    if normalized.is_empty() {
        return None;
    }

    KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|word| normalized.contains(word.as_str())))
        .map(|(category, _)| *category)
}

fn spanish(texts: &Localized) -> Option<&str> {
    texts
        .get("es-ES")
        .or_else(|| texts.get("es"))
        .map(String::as_str)
}

/// Every textual field of a record that may carry category hints, joined by spaces.
pub fn aux_text(record: &CatalogRecord) -> String {
    let media_title = value_at(&record.media, &["texts", "es-ES", "TITLE", "value"]);
    let media_description = value_at(&record.media, &["texts", "es-ES", "DESCRIPTION_LONG", "value"]);

    [
        spanish(&record.texts.title),
        record.name.as_deref(),
        spanish(&record.texts.subtitle),
        spanish(&record.texts.description_long),
        media_title.and_then(|v| v.as_str()),
        media_description.and_then(|v| v.as_str()),
    ]
    .into_iter()
    .flatten()
    .filter(|part| !part.trim().is_empty())
    .collect::<Vec<_>>()
    .join(" ")
}

fn canonical_override(record: &CatalogRecord, overrides: &Overrides) -> Option<CanonicalCategory> {
    record
        .base_id()
        .and_then(|id| overrides.category_for(&id))
        .and_then(CanonicalCategory::from_key)
}

/// Override, then category codes, then keywords, then the default.
pub fn classify(record: &CatalogRecord, overrides: &Overrides) -> CanonicalCategory {
    if let Some(category) = canonical_override(record, overrides) {
        trace!("Category for {:?} set by override", record.base_id());
        return category;
    }

    let category = record.category.as_ref();
    let codes = [
        category.and_then(|c| c.custom.code.as_deref()),
        category.and_then(|c| c.code.as_deref()),
        category.and_then(|c| c.parent.code.as_deref()),
    ];

    code_to_canonical(&codes)
        .or_else(|| text_to_canonical(&aux_text(record)))
        .unwrap_or(CanonicalCategory::DEFAULT)
}

/// Category carried by a manual record's taxonomy term, if any.
fn manual_category(record: &CatalogRecord) -> Option<ResolvedCategory> {
    let category = record.category.as_ref()?;

    let key = category
        .slug
        .as_deref()
        .map(str::trim)
        .filter(|slug| !slug.is_empty())
        .or_else(|| category.custom.code.as_deref().map(str::trim))
        .map(str::to_lowercase)
        .filter(|key| !key.is_empty())?;

    let label = category
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| capitalize(&key, false));

    let css_class = CanonicalCategory::from_key(&key)
        .map(|canonical| canonical.css_class().to_string())
        .unwrap_or_default();

    Some(ResolvedCategory {
        key,
        label,
        css_class,
    })
}

/// Category for any record. Manual records keep their own taxonomy, catalog records
/// are classified.
pub fn resolve_category(record: &CatalogRecord, overrides: &Overrides) -> ResolvedCategory {
    if !record.is_manual() {
        return classify(record, overrides).into();
    }

    if let Some(category) = canonical_override(record, overrides) {
        return category.into();
    }

    manual_category(record).unwrap_or_else(|| CanonicalCategory::DEFAULT.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::Override;
    use serde_json::json;
    use std::collections::HashMap;

    fn record(value: serde_json::Value) -> CatalogRecord {
        serde_json::from_value(value).unwrap()
    }

    fn overrides(id: &str, category_key: &str) -> Overrides {
        let mut rows = HashMap::new();
        rows.insert(
            id.to_string(),
            Override {
                redirect_url: String::new(),
                category_key: category_key.to_string(),
            },
        );
        Overrides::from_rows(&rows)
    }

    #[test_log::test]
    fn should_normalize_text() {
        assert_eq!(normalize_text("  ¡Música en DIRECTO!  "), "musica en directo");
        assert_eq!(normalize_text("Stand-Up & Impro"), "stand up impro");
        assert_eq!(normalize_text("Q&A"), "q a");
    }

    #[test_log::test]
    fn should_match_codes_exactly_before_substrings() {
        assert_eq!(code_to_canonical(&[Some("artmus")]), Some(Musical));
        assert_eq!(code_to_canonical(&[Some("MUSICAL")]), Some(Musical));
        assert_eq!(code_to_canonical(&[None, Some("ARTHU"), Some("ARTE")]), Some(Humor));
        assert_eq!(code_to_canonical(&[Some("XYZ"), Some(" arte ")]), Some(Teatro));
    }

    #[test_log::test]
    fn substring_match_should_follow_table_order() {
        assert_eq!(code_to_canonical(&[Some("OTROS-CONFERENCIAS")]), Some(Talk));
        assert_eq!(code_to_canonical(&[Some("MUSICALES")]), Some(Musica));
        assert_eq!(code_to_canonical(&[Some("XYZ")]), None);
    }

    #[test_log::test]
    fn should_check_keywords_by_priority() {
        assert_eq!(text_to_canonical("Gran concierto de Navidad"), Some(Musica));
        assert_eq!(text_to_canonical("Teatro musical: Los Miserables"), Some(Musical));
        assert_eq!(text_to_canonical("Monólogo y música"), Some(Humor));
        assert_eq!(text_to_canonical("Una obra clásica"), Some(Teatro));
        assert_eq!(text_to_canonical("Gran Show Musical de Teatro"), Some(Musical));
        assert_eq!(text_to_canonical("Dramaturgia"), Some(Teatro));
        assert_eq!(text_to_canonical("Velada"), None);
        assert_eq!(text_to_canonical(""), None);
    }

    #[test_log::test]
    fn classify_should_be_idempotent() {
        let concert = record(json!({
            "id": "42",
            "texts": { "title": { "es-ES": "Concierto de Navidad" } },
            "category": { "custom": { "code": "XYZ" } }
        }));
        let untouched = Overrides::default();
        let forced = overrides("42", "humor");

        for overrides in [&untouched, &forced] {
            let first = classify(&concert, overrides);
            let second = classify(&concert, overrides);

            assert_eq!(first.key(), second.key());
        }
        assert_eq!(classify(&concert, &untouched), Musica);
        assert_eq!(classify(&concert, &forced), Humor);
    }

    #[test_log::test]
    fn code_should_win_over_keywords() {
        let record = record(json!({
            "id": 42,
            "texts": { "title": { "es-ES": "Monólogos de verano" } },
            "category": { "code": "ARTMU" }
        }));

        assert_eq!(classify(&record, &Overrides::default()), Musica);
    }

    #[test_log::test]
    fn when_no_code_matches_should_use_title_keywords() {
        let record = record(json!({
            "id": 42,
            "texts": { "title": { "es-ES": "Gran concierto de Navidad" } },
            "category": { "code": "XYZ" }
        }));

        assert_eq!(classify(&record, &Overrides::default()), Musica);
    }

    #[test_log::test]
    fn should_read_media_texts() {
        let record = record(json!({
            "id": 42,
            "media": { "texts": { "es-ES": { "DESCRIPTION_LONG": { "value": "Una charla con la autora" } } } }
        }));

        assert_eq!(classify(&record, &Overrides::default()), Talk);
    }

    #[test_log::test]
    fn when_nothing_matches_should_default_to_teatro() {
        let record = record(json!({ "id": 42, "name": "Velada nocturna" }));

        assert_eq!(classify(&record, &Overrides::default()), Teatro);
    }

    #[test_log::test]
    fn canonical_override_should_win() {
        let record = record(json!({
            "id": 42,
            "category": { "code": "ARTMU" }
        }));

        assert_eq!(classify(&record, &overrides("42", "humor")), Humor);
    }

    #[test_log::test]
    fn non_canonical_override_should_be_ignored() {
        let record = record(json!({
            "id": 42,
            "category": { "code": "ARTMU" }
        }));

        assert_eq!(classify(&record, &overrides("42", "mercado")), Musica);
    }

    #[test_log::test]
    fn override_should_use_parent_event_id() {
        let session = record(json!({
            "id": 913,
            "event": { "id": 42 },
            "category": { "code": "ARTMU" }
        }));

        assert_eq!(classify(&session, &overrides("42", "talk")), Talk);
    }

    #[test_log::test]
    fn manual_record_should_keep_its_own_term() {
        let record = record(json!({
            "id": "manual-7",
            "category": { "slug": "mercado", "name": "Mercadillo", "custom": { "code": "MERCADO" } },
            "cloudari": { "manual": true }
        }));

        let category = resolve_category(&record, &Overrides::default());

        assert_eq!(
            category,
            ResolvedCategory {
                key: "mercado".to_string(),
                label: "Mercadillo".to_string(),
                css_class: String::new(),
            }
        );
    }

    #[test_log::test]
    fn manual_record_with_canonical_slug_should_keep_canonical_class() {
        let record = record(json!({
            "id": "manual-7",
            "category": { "slug": "humor" },
            "cloudari": { "manual": true }
        }));

        let category = resolve_category(&record, &Overrides::default());

        assert_eq!(category.key, "humor");
        assert_eq!(category.label, "Humor");
        assert_eq!(category.css_class, "obx-cat--humor");
    }

    #[test_log::test]
    fn manual_record_without_term_should_default_to_teatro() {
        let record = record(json!({
            "id": "manual-7",
            "texts": { "title": { "es-ES": "Concierto" } },
            "cloudari": { "manual": true }
        }));

        assert_eq!(
            resolve_category(&record, &Overrides::default()),
            ResolvedCategory::from(Teatro)
        );
    }
}
