use super::model::OverridePolicy;
use tracing::warn;

pub const PLACEHOLDER_URL: &str = "#";

/// Inputs of the purchase link resolution for one record.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlCandidate<'a> {
    pub explicit: Option<&'a str>,
    pub is_manual: bool,
    pub event_id: &'a str,
}

/// `purchase_base + id`, or `#` when no base is configured.
pub fn build_purchase_url(purchase_base: Option<&str>, event_id: &str) -> String {
    match purchase_base {
        Some(base) if !event_id.is_empty() => format!("{}{}", base, event_id),
        Some(_) => PLACEHOLDER_URL.to_string(),
        None => {
            warn!("No purchase base configured, linking event {} to '#'", event_id);
            PLACEHOLDER_URL.to_string()
        }
    }
}

pub fn resolve_purchase_url(
    candidate: UrlCandidate,
    override_url: Option<&str>,
    purchase_base: Option<&str>,
    policy: OverridePolicy,
) -> String {
    if policy == OverridePolicy::ManualExplicitFirst && candidate.is_manual {
        if let Some(url) = candidate.explicit {
            return url.to_string();
        }
    }

    if let Some(url) = override_url {
        return url.to_string();
    }

    match candidate.explicit {
        Some(url) => url.to_string(),
        None if candidate.is_manual => PLACEHOLDER_URL.to_string(),
        None => build_purchase_url(purchase_base, candidate.event_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: Option<&str> = Some("https://t.example/");

    fn catalog(id: &str) -> UrlCandidate {
        UrlCandidate {
            explicit: None,
            is_manual: false,
            event_id: id,
        }
    }

    fn manual(url: Option<&'static str>) -> UrlCandidate<'static> {
        UrlCandidate {
            explicit: url,
            is_manual: true,
            event_id: "7",
        }
    }

    #[test_log::test]
    fn should_build_url_from_purchase_base() {
        let url = resolve_purchase_url(catalog("42"), None, BASE, OverridePolicy::Uniform);

        assert_eq!(url, "https://t.example/42");
    }

    #[test_log::test]
    fn without_base_or_override_should_link_to_placeholder() {
        for policy in [OverridePolicy::Uniform, OverridePolicy::ManualExplicitFirst] {
            assert_eq!(resolve_purchase_url(catalog("42"), None, None, policy), "#");
        }
    }

    #[test_log::test]
    fn override_should_replace_catalog_urls_on_every_surface() {
        let explicit = UrlCandidate {
            explicit: Some("https://tickets.example/42"),
            ..catalog("42")
        };

        for policy in [OverridePolicy::Uniform, OverridePolicy::ManualExplicitFirst] {
            assert_eq!(
                resolve_purchase_url(explicit, Some("https://promo.example"), BASE, policy),
                "https://promo.example"
            );
        }
    }

    #[test_log::test]
    fn manual_explicit_url_should_ignore_override_outside_billboard() {
        let url = resolve_purchase_url(
            manual(Some("https://manual.example")),
            Some("https://promo.example"),
            BASE,
            OverridePolicy::ManualExplicitFirst,
        );

        assert_eq!(url, "https://manual.example");
    }

    #[test_log::test]
    fn billboard_should_apply_override_to_manual_urls() {
        let url = resolve_purchase_url(
            manual(Some("https://manual.example")),
            Some("https://promo.example"),
            BASE,
            OverridePolicy::Uniform,
        );

        assert_eq!(url, "https://promo.example");
    }

    #[test_log::test]
    fn manual_without_url_should_never_use_purchase_base() {
        let url = resolve_purchase_url(manual(None), None, BASE, OverridePolicy::Uniform);

        assert_eq!(url, "#");
    }
}
