use crate::catalog::dto::CatalogRecord;
use lazy_static::lazy_static;
use regex::Regex;

pub const DARK_TEXT: &str = "#000000";
pub const LIGHT_TEXT: &str = "#FFFFFF";
const YIQ_THRESHOLD: f64 = 160.0;

lazy_static! {
    static ref HEX_COLOR: Regex = Regex::new(r"^#[0-9A-Fa-f]{6}$").unwrap();
}

/// `#RRGGBB`, adding the leading `#` when missing. Anything else is rejected.
pub fn normalize_hex_color(raw: &str) -> Option<String> {
    let raw = raw.trim();

    if raw.is_empty() {
        return None;
    }

    let color = if raw.starts_with('#') {
        raw.to_string()
    } else {
        format!("#{}", raw)
    };

    HEX_COLOR.is_match(&color).then_some(color)
}

/// Catalog custom color, then catalog category color, then the manual term color.
/// Only the first non-empty candidate is considered.
pub fn pick_category_color(record: &CatalogRecord) -> Option<String> {
    let category = record.category.as_ref();

    [
        category.and_then(|c| c.custom.color.as_deref()),
        category.and_then(|c| c.color.as_deref()),
        record.cloudari.category_color.as_deref(),
    ]
    .into_iter()
    .flatten()
    .find(|raw| !raw.trim().is_empty())
    .and_then(normalize_hex_color)
}

/// Black or white text for a colored background, by YIQ luminance.
pub fn text_color_for(background: &str) -> Option<&'static str> {
    if !HEX_COLOR.is_match(background) {
        return None;
    }

    let channel = |range| u8::from_str_radix(&background[range], 16).map(f64::from).ok();
    let (r, g, b) = (channel(1..3)?, channel(3..5)?, channel(5..7)?);
    let yiq = (r * 299.0 + g * 587.0 + b * 114.0) / 1000.0;

    Some(if yiq >= YIQ_THRESHOLD {
        DARK_TEXT
    } else {
        LIGHT_TEXT
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test_log::test]
    fn purple_should_get_white_text() {
        assert_eq!(text_color_for("#7E57C2"), Some(LIGHT_TEXT));
    }

    #[test_log::test]
    fn light_backgrounds_should_get_black_text() {
        assert_eq!(text_color_for("#FFFFFF"), Some(DARK_TEXT));
        assert_eq!(text_color_for("#F5D76E"), Some(DARK_TEXT));
        assert_eq!(text_color_for("#000000"), Some(LIGHT_TEXT));
        assert_eq!(text_color_for("purple"), None);
    }

    #[test_log::test]
    fn should_normalize_colors() {
        assert_eq!(normalize_hex_color("7e57c2"), Some("#7e57c2".to_string()));
        assert_eq!(normalize_hex_color(" #009AD8 "), Some("#009AD8".to_string()));
        assert_eq!(normalize_hex_color("#FFF"), None);
        assert_eq!(normalize_hex_color(""), None);
    }

    #[test_log::test]
    fn should_prefer_catalog_custom_color() {
        let record: CatalogRecord = serde_json::from_value(json!({
            "id": 1,
            "category": { "color": "#111111", "custom": { "color": "D14100" } },
            "cloudari": { "category_color": "#222222" }
        }))
        .unwrap();

        assert_eq!(pick_category_color(&record), Some("#D14100".to_string()));
    }

    #[test_log::test]
    fn should_fall_back_to_manual_term_color() {
        let record: CatalogRecord = serde_json::from_value(json!({
            "id": "manual-3",
            "cloudari": { "manual": true, "category_color": "#2E7D32" }
        }))
        .unwrap();

        assert_eq!(pick_category_color(&record), Some("#2E7D32".to_string()));
    }
}
