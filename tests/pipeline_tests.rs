use async_trait::async_trait;
use cartelera::aggregator::merge::{aggregate, category_options};
use cartelera::aggregator::sessions::{NextSessionBundle, RangeSessions};
use cartelera::aggregator::sources::BillboardSources;
use cartelera::cache::{KeyValueStore, MemoryStore, TimedCache};
use cartelera::catalog::api::CatalogSource;
use cartelera::catalog::dto::CatalogRecord;
use cartelera::catalog::error::FetchError;
use cartelera::config::model::EnvironmentConfig;
use cartelera::event::model::Surface;
use cartelera::manual::model::ManualEventDefinition;
use cartelera::manual::repository::StaticSource;
use cartelera::presentation::billboard::{
    billboard_ttl, BillboardLoader, LoadFailure, RefreshOutcome, BILLBOARD_CACHE_KEY,
};
use cartelera::presentation::calendar::{CalendarService, YearMonth};
use cartelera::presentation::countdown::{
    countdown_ttl, Countdown, CountdownState, DEFAULT_EXTRA_DAYS, MAX_EXTRA_DAYS,
};
use cartelera::presentation::grid::{Grid, GridState, DEFAULT_CHUNK_SIZE};
use cartelera::schedule::timezone::DEFAULT_TIMEZONE;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::json;
use std::sync::Arc;

struct FakeCatalog {
    events: Result<Vec<CatalogRecord>, FetchError>,
    sessions: Result<Vec<CatalogRecord>, FetchError>,
}

impl FakeCatalog {
    fn events(events: Result<Vec<CatalogRecord>, FetchError>) -> Arc<Self> {
        Arc::new(Self {
            events,
            sessions: Ok(Vec::new()),
        })
    }

    fn sessions(sessions: Result<Vec<CatalogRecord>, FetchError>) -> Arc<Self> {
        Arc::new(Self {
            events: Ok(Vec::new()),
            sessions,
        })
    }
}

#[async_trait]
impl CatalogSource for FakeCatalog {
    async fn fetch_events(&self) -> Result<Vec<CatalogRecord>, FetchError> {
        self.events.clone()
    }

    async fn fetch_sessions(
        &self,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<Vec<CatalogRecord>, FetchError> {
        self.sessions.clone()
    }
}

fn env() -> EnvironmentConfig {
    EnvironmentConfig::new(Some("https://t.example/"), DEFAULT_TIMEZONE)
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 12, 1, 10, 0, 0).unwrap()
}

fn record(value: serde_json::Value) -> CatalogRecord {
    serde_json::from_value(value).unwrap()
}

fn christmas_concert() -> CatalogRecord {
    record(json!({
        "id": "42",
        "date": { "start": "2025-12-24T20:00:00+01:00" },
        "texts": { "title": { "es-ES": "Concierto de Navidad" } }
    }))
}

fn market() -> ManualEventDefinition {
    serde_json::from_value(json!({
        "id": 7,
        "title": "Mercadillo navideño",
        "url": "https://manual.example/mercadillo",
        "mode": "range",
        "range_start": "2025-12-20",
        "range_end": "2025-12-22",
        "schedule_rules": {
            "weekday_start": "15:00", "weekday_end": "21:00",
            "weekend_start": "12:00", "weekend_end": "21:00"
        },
        "exceptions": [ { "date": "2025-12-21", "start": "10:00", "end": "14:00" } ],
        "category": { "id": 3, "slug": "mercado", "name": "Mercado", "color": "#F5D76E" }
    }))
    .unwrap()
}

fn session(id: &str, event_id: &str, start: &str) -> CatalogRecord {
    record(json!({
        "id": id,
        "event": { "id": event_id, "name": "Cascanueces" },
        "date": { "start": start },
        "price": { "min": { "value": 18.5 } },
        "venue": { "name": "Teatro Circo" }
    }))
}

fn loader(
    catalog: Arc<FakeCatalog>,
    manual: Vec<ManualEventDefinition>,
    store: Arc<MemoryStore>,
) -> BillboardLoader {
    BillboardLoader::new(
        BillboardSources::new(catalog, Arc::new(StaticSource(manual)), env()),
        TimedCache::new(store, billboard_ttl()),
    )
}

#[test_log::test(tokio::test)]
async fn should_normalize_catalog_event_for_billboard() {
    let sources = BillboardSources::new(
        FakeCatalog::events(Ok(vec![christmas_concert()])),
        Arc::new(StaticSource(vec![market()])),
        env(),
    );

    let fetch = sources.fetch_at(now()).await;
    let catalog = fetch.catalog.unwrap();
    let events = aggregate(&catalog, &fetch.manual, Surface::Billboard, &env());

    assert_eq!(events.len(), 2);

    let manual = &events[0];
    assert_eq!(manual.id, "manual-7");
    assert_eq!(manual.category.key, "mercado");
    assert_eq!(manual.category.css_class, "");
    assert_eq!(manual.url, "https://manual.example/mercadillo");

    let concert = &events[1];
    assert_eq!(concert.id, "42");
    assert_eq!(concert.title, "Concierto de Navidad");
    assert_eq!(concert.url, "https://t.example/42");
    assert_eq!(concert.category.key, "musica");

    let keys: Vec<String> = category_options(&events).into_iter().map(|o| o.key).collect();
    assert_eq!(keys, vec!["musica", "mercado"]);
}

#[test_log::test(tokio::test)]
async fn should_expand_manual_range_into_calendar_sessions() {
    let sessions = RangeSessions::new(
        FakeCatalog::sessions(Ok(Vec::new())),
        Arc::new(StaticSource(vec![market()])),
        env(),
    );

    let outcome = sessions
        .fetch_at(
            NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
            now(),
        )
        .await;

    let spans: Vec<(Option<String>, Option<String>)> = outcome
        .sessions
        .iter()
        .map(|s| (s.date.start.clone(), s.date.end.clone()))
        .collect();

    // 20 December 2025 is a Saturday, the 22nd a Monday
    assert_eq!(
        spans,
        vec![
            (
                Some("2025-12-20T12:00:00+01:00".to_string()),
                Some("2025-12-20T21:00:00+01:00".to_string())
            ),
            (
                Some("2025-12-21T10:00:00+01:00".to_string()),
                Some("2025-12-21T14:00:00+01:00".to_string())
            ),
            (
                Some("2025-12-22T15:00:00+01:00".to_string()),
                Some("2025-12-22T21:00:00+01:00".to_string())
            ),
        ]
    );

    let events = aggregate(&outcome.sessions, &[], Surface::Calendar, &env());
    assert_eq!(events[1].display_time.as_deref(), Some("10:00 - 14:00"));
    assert_eq!(events[1].cta_label, "Tickets");
}

#[test_log::test(tokio::test)]
async fn calendar_should_keep_manual_sessions_when_catalog_fails() {
    let calendar = CalendarService::new(
        RangeSessions::new(
            FakeCatalog::sessions(Err(FetchError::Auth(401))),
            Arc::new(StaticSource(vec![market()])),
            env(),
        ),
        env(),
    );

    let view = calendar
        .month(YearMonth::new(2025, 12).unwrap(), now())
        .await
        .unwrap();

    let busy: Vec<u32> = view
        .days
        .iter()
        .filter(|day| day.has_events())
        .map(|day| chrono::Datelike::day(&day.date))
        .collect();

    assert_eq!(busy, vec![20, 21, 22]);
    assert_eq!(view.days[19].entries[0].url, "https://manual.example/mercadillo");
    assert!(calendar
        .month(YearMonth::new(2025, 11).unwrap(), now())
        .await
        .is_none());
}

#[test_log::test(tokio::test)]
async fn calendar_entries_should_carry_price_and_venue() {
    let calendar = CalendarService::new(
        RangeSessions::new(
            FakeCatalog::sessions(Ok(vec![session("900", "42", "2025-12-24T20:00:00+01:00")])),
            Arc::new(StaticSource::default()),
            env(),
        ),
        env(),
    );

    let view = calendar
        .month(YearMonth::new(2025, 12).unwrap(), now())
        .await
        .unwrap();
    let entry = &view.days[23].entries[0];

    assert_eq!(entry.title, "Cascanueces");
    assert_eq!(entry.time, "20:00");
    assert_eq!(entry.price, "18.5€");
    assert_eq!(entry.venue, "Teatro Circo");
    assert_eq!(entry.url, "https://t.example/42");
    assert_eq!(entry.cta_label, "Tickets");
}

#[test_log::test(tokio::test)]
async fn auth_failure_should_still_render_manual_events() {
    let store = Arc::new(MemoryStore::new());
    let loader = loader(
        FakeCatalog::events(Err(FetchError::Auth(401))),
        vec![market()],
        store.clone(),
    );
    let mut grid = Grid::new(DEFAULT_CHUNK_SIZE, DEFAULT_TIMEZONE);

    let outcome = loader.load_into_at(&mut grid, now()).await;

    assert!(matches!(outcome, RefreshOutcome::Ready(ref events) if events.len() == 1));
    assert_eq!(grid.state(), &GridState::Cards);
    assert_eq!(grid.cards()[0].id, "manual-7");
    assert_eq!(store.get(BILLBOARD_CACHE_KEY).await.unwrap(), None);
}

#[test_log::test(tokio::test)]
async fn total_failure_without_cache_should_show_message() {
    let cases = [
        (Err(FetchError::Auth(403)), LoadFailure::Auth),
        (Err(FetchError::Timeout), LoadFailure::Http),
        (Ok(Vec::new()), LoadFailure::NoData),
    ];

    for (events, expected) in cases {
        let loader = loader(FakeCatalog::events(events), Vec::new(), Arc::new(MemoryStore::new()));
        let mut grid = Grid::new(DEFAULT_CHUNK_SIZE, DEFAULT_TIMEZONE);

        let outcome = loader.load_into_at(&mut grid, now()).await;

        assert_eq!(outcome, RefreshOutcome::Failed(expected));
        assert_eq!(
            grid.state(),
            &GridState::Message(expected.message().to_string())
        );
    }
}

#[test_log::test(tokio::test)]
async fn failed_refresh_should_keep_cached_events() {
    let store = Arc::new(MemoryStore::new());

    let healthy = loader(
        FakeCatalog::events(Ok(vec![christmas_concert()])),
        Vec::new(),
        store.clone(),
    );
    let mut grid = Grid::new(DEFAULT_CHUNK_SIZE, DEFAULT_TIMEZONE);
    healthy.load_into_at(&mut grid, now()).await;
    assert!(store.get(BILLBOARD_CACHE_KEY).await.unwrap().is_some());

    let failing = loader(FakeCatalog::events(Err(FetchError::Http(502))), Vec::new(), store);
    let mut grid = Grid::new(DEFAULT_CHUNK_SIZE, DEFAULT_TIMEZONE);
    let later = now() + chrono::Duration::hours(1);

    let outcome = failing.load_into_at(&mut grid, later).await;

    assert_eq!(outcome, RefreshOutcome::KeepCache);
    assert_eq!(grid.state(), &GridState::Cards);
    assert_eq!(grid.cards()[0].url, "https://t.example/42");
}

#[test_log::test(tokio::test)]
async fn expired_cache_should_not_be_rendered() {
    let store = Arc::new(MemoryStore::new());

    loader(
        FakeCatalog::events(Ok(vec![christmas_concert()])),
        Vec::new(),
        store.clone(),
    )
    .load_into_at(&mut Grid::new(DEFAULT_CHUNK_SIZE, DEFAULT_TIMEZONE), now())
    .await;

    let failing = loader(FakeCatalog::events(Err(FetchError::Http(500))), Vec::new(), store);
    let mut grid = Grid::new(DEFAULT_CHUNK_SIZE, DEFAULT_TIMEZONE);
    let next_day = now() + chrono::Duration::hours(25);

    let outcome = failing.load_into_at(&mut grid, next_day).await;

    assert_eq!(outcome, RefreshOutcome::Failed(LoadFailure::Http));
}

fn countdown_looking_ahead(
    catalog: Arc<FakeCatalog>,
    store: Arc<MemoryStore>,
    extra_days: i64,
) -> Countdown {
    Countdown::new(
        RangeSessions::new(catalog, Arc::new(StaticSource::default()), env()),
        TimedCache::<NextSessionBundle>::new(store, countdown_ttl()),
        env(),
        extra_days,
    )
}

fn countdown(catalog: Arc<FakeCatalog>, store: Arc<MemoryStore>) -> Countdown {
    countdown_looking_ahead(catalog, store, DEFAULT_EXTRA_DAYS)
}

#[test_log::test(tokio::test)]
async fn countdown_should_fall_back_to_cached_session() {
    let store = Arc::new(MemoryStore::new());
    let sessions = vec![
        session("1", "42", "2025-11-30T20:00:00+01:00"),
        session("2", "42", "2025-12-24T20:00:00+01:00"),
    ];

    let state = countdown(FakeCatalog::sessions(Ok(sessions)), store.clone())
        .state_at("42", now())
        .await;

    match &state {
        CountdownState::Scheduled {
            bundle,
            date_label,
            from_cache,
        } => {
            assert_eq!(bundle.url, "https://t.example/42");
            assert_eq!(date_label, "Miércoles, 24 de diciembre, 20:00");
            assert!(!from_cache);
        }
        other => panic!("unexpected state {:?}", other),
    }
    assert!(store.get("cloudari_ce_next_42").await.unwrap().is_some());

    let offline = countdown(FakeCatalog::sessions(Err(FetchError::Timeout)), store);
    let state = offline.state_at("42", now()).await;

    assert!(matches!(state, CountdownState::Scheduled { from_cache: true, .. }));
    assert_eq!(state.remaining(now()).unwrap().days, 23);
}

#[test_log::test(tokio::test)]
async fn countdown_without_sessions_should_say_so() {
    let upcoming = countdown(FakeCatalog::sessions(Ok(Vec::new())), Arc::new(MemoryStore::new()))
        .state_at("42", now())
        .await;
    let unavailable = countdown(
        FakeCatalog::sessions(Err(FetchError::Http(500))),
        Arc::new(MemoryStore::new()),
    )
    .state_at("42", now())
    .await;

    assert_eq!(upcoming, CountdownState::Upcoming);
    assert_eq!(upcoming.label(), "Próximamente");
    assert_eq!(unavailable, CountdownState::Unavailable);
    assert_eq!(unavailable.label(), "—");
}

#[test_log::test(tokio::test)]
async fn huge_lookahead_should_be_capped() {
    for extra_days in [100_000_000, i64::MAX] {
        let countdown = countdown_looking_ahead(
            FakeCatalog::sessions(Ok(Vec::new())),
            Arc::new(MemoryStore::new()),
            extra_days,
        );

        assert_eq!(countdown.extra_days(), MAX_EXTRA_DAYS);
        assert_eq!(countdown.state_at("42", now()).await, CountdownState::Upcoming);
    }
}
