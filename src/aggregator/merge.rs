use crate::catalog::dto::CatalogRecord;
use crate::category::classifier::normalize_text;
use crate::category::model::CanonicalCategory;
use crate::config::model::EnvironmentConfig;
use crate::event::model::{NormalizedEvent, Surface};
use crate::event::normalizer::normalize;
use chrono::NaiveDate;
use chrono_tz::Tz;
use itertools::Itertools;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// One entry of the category filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryOption {
    pub key: String,
    pub label: String,
}

/// Catalog records first, then manual ones, normalized for `surface` and sorted by first date.
///
/// Records that fail to normalize are dropped. The sort is stable, so events on the same
/// instant keep their source order.
pub fn aggregate(
    catalog: &[CatalogRecord],
    manual: &[CatalogRecord],
    surface: Surface,
    env: &EnvironmentConfig,
) -> Vec<NormalizedEvent> {
    let mut events: Vec<NormalizedEvent> = catalog
        .iter()
        .chain(manual)
        .filter_map(|record| normalize(record, surface, env))
        .collect();

    let dropped = catalog.len() + manual.len() - events.len();
    if dropped > 0 {
        debug!("Dropped {} records that could not be normalized", dropped);
    }

    events.sort_by(NormalizedEvent::cmp_by_first_date);
    events
}

/// Buckets events by the local date of their first date. Undated events are left out.
pub fn group_by_day(events: &[NormalizedEvent], tz: &Tz) -> BTreeMap<NaiveDate, Vec<NormalizedEvent>> {
    events
        .iter()
        .filter_map(|event| {
            let first = event.first_date?;

            Some((first.with_timezone(tz).date_naive(), event.clone()))
        })
        .into_group_map()
        .into_iter()
        .collect()
}

/// Categories present in `events`: canonical ones in canonical order, then the rest by label.
pub fn category_options(events: &[NormalizedEvent]) -> Vec<CategoryOption> {
    let present: Vec<CategoryOption> = events
        .iter()
        .filter(|event| !event.category.key.is_empty())
        .unique_by(|event| event.category.key.clone())
        .map(|event| CategoryOption {
            key: event.category.key.clone(),
            label: event.category.label.clone(),
        })
        .collect();

    let canonical = CanonicalCategory::ordered()
        .filter(|category| present.iter().any(|option| option.key == category.key()))
        .map(|category| CategoryOption {
            key: category.key().to_string(),
            label: category.label().to_string(),
        });

    let rest = present
        .iter()
        .filter(|option| CanonicalCategory::from_key(&option.key).is_none())
        .sorted_by_cached_key(|option| (normalize_text(&option.label), option.key.clone()))
        .cloned();

    canonical.chain(rest).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::dto::{CloudariMeta, DateSpan, Texts};
    use crate::schedule::timezone::DEFAULT_TIMEZONE;

    fn record(id: &str, title: &str, start: Option<&str>) -> CatalogRecord {
        CatalogRecord {
            id: Some(id.to_string()),
            texts: Texts {
                title: BTreeMap::from([("es-ES".to_string(), title.to_string())]),
                ..Default::default()
            },
            date: DateSpan {
                start: start.map(str::to_string),
                end: None,
            },
            ..Default::default()
        }
    }

    fn manual(id: &str, slug: &str, name: &str, start: &str) -> CatalogRecord {
        let mut record = record(id, name, Some(start));
        record.cloudari = CloudariMeta {
            manual: true,
            ..Default::default()
        };
        record.category = Some(crate::catalog::dto::CategoryDto {
            slug: Some(slug.to_string()),
            name: Some(name.to_string()),
            ..Default::default()
        });
        record
    }

    fn env() -> EnvironmentConfig {
        EnvironmentConfig::new(Some("https://t.example"), DEFAULT_TIMEZONE)
    }

    #[test_log::test]
    fn should_sort_merged_events_with_undated_last() {
        let catalog = vec![
            record("1", "Sin fecha", None),
            record("2", "Obra tardía", Some("2025-12-24T20:00:00+01:00")),
        ];
        let manual = vec![manual("manual-3", "teatro", "Obra temprana", "2025-12-20T18:00:00+01:00")];

        let ids: Vec<String> = aggregate(&catalog, &manual, Surface::Billboard, &env())
            .into_iter()
            .map(|event| event.id)
            .collect();

        assert_eq!(ids, vec!["manual-3", "2", "1"]);
    }

    #[test_log::test]
    fn should_keep_source_order_for_equal_dates() {
        let catalog = vec![record("1", "A", Some("2025-12-24T20:00:00+01:00"))];
        let manual = vec![manual("manual-1", "teatro", "A", "2025-12-24T20:00:00+01:00")];

        let ids: Vec<String> = aggregate(&catalog, &manual, Surface::Billboard, &env())
            .into_iter()
            .map(|event| event.id)
            .collect();

        assert_eq!(ids, vec!["1", "manual-1"]);
    }

    #[test_log::test]
    fn should_drop_records_without_id() {
        let mut broken = record("1", "Roto", None);
        broken.id = None;

        assert!(aggregate(&[broken], &[], Surface::Calendar, &env()).is_empty());
    }

    #[test_log::test]
    fn should_group_by_local_day() {
        let catalog = vec![
            // 23:30 UTC is already the next day in Madrid
            record("1", "Medianoche", Some("2025-12-23T23:30:00Z")),
            record("2", "Tarde", Some("2025-12-24T18:00:00+01:00")),
            record("3", "Sin fecha", None),
        ];

        let events = aggregate(&catalog, &[], Surface::Calendar, &env());
        let days = group_by_day(&events, &DEFAULT_TIMEZONE);

        let christmas_eve = NaiveDate::from_ymd_opt(2025, 12, 24).unwrap();

        assert_eq!(days.len(), 1);
        assert_eq!(days[&christmas_eve].len(), 2);
    }

    #[test_log::test]
    fn should_order_category_options() {
        let catalog = vec![
            record("1", "Concierto de Navidad", Some("2025-12-24T20:00:00+01:00")),
            record("2", "Drama en tres actos", Some("2025-12-25T20:00:00+01:00")),
        ];
        let manual = vec![
            manual("manual-1", "zumba", "Zumba", "2025-12-20T18:00:00+01:00"),
            manual("manual-2", "exposicion", "Exposición", "2025-12-21T18:00:00+01:00"),
            manual("manual-3", "exposicion", "Exposición", "2025-12-22T18:00:00+01:00"),
        ];

        let events = aggregate(&catalog, &manual, Surface::Billboard, &env());
        let keys: Vec<String> = category_options(&events)
            .into_iter()
            .map(|option| option.key)
            .collect();

        assert_eq!(keys, vec!["teatro", "musica", "exposicion", "zumba"]);
    }
}
