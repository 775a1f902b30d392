use cartelera::aggregator::sessions::RangeSessions;
use cartelera::aggregator::sources::BillboardSources;
use cartelera::cache::{FileStore, KeyValueStore, MemoryStore, TimedCache};
use cartelera::catalog::integrations::CatalogIntegrations;
use cartelera::config::env_loader::load_config;
use cartelera::manual::repository::{JsonFileSource, ManualSource, StaticSource};
use cartelera::presentation::billboard::{billboard_ttl, BillboardLoader};
use cartelera::presentation::calendar::{CalendarService, YearMonth};
use cartelera::presentation::grid::{Grid, GridState, DEFAULT_CHUNK_SIZE};
use cartelera::tracing::setup_tracing;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() {
    let loki = setup_tracing().await;
    let config = load_config();
    let env = config.environment.clone();

    let catalog = Arc::new(CatalogIntegrations::from_config(&config.catalog));
    info!("Using {} catalog integrations", catalog.len());
    let manual: Arc<dyn ManualSource> = match &config.manual_events_file {
        Some(path) => Arc::new(JsonFileSource::new(path)),
        None => Arc::new(StaticSource::default()),
    };
    let store: Arc<dyn KeyValueStore> = match &config.cache_dir {
        Some(dir) => Arc::new(FileStore::new(dir)),
        None => Arc::new(MemoryStore::new()),
    };

    let loader = BillboardLoader::new(
        BillboardSources::new(catalog.clone(), manual.clone(), env.clone()),
        TimedCache::new(store, billboard_ttl()),
    );
    let mut grid = Grid::new(DEFAULT_CHUNK_SIZE, env.timezone);
    let outcome = loader.load_into(&mut grid).await;

    info!("Billboard: {:?} with {} cards", grid.state(), grid.cards().len());
    for card in grid.cards() {
        info!("{} | {} | {}", card.title, card.date_label, card.url);
    }
    if grid.state() != &GridState::Cards {
        warn!("Billboard refresh ended with {:?}", outcome);
    }

    let now = Utc::now();
    let calendar = CalendarService::new(RangeSessions::new(catalog, manual, env.clone()), env.clone());
    let this_month = YearMonth::of(now.with_timezone(&env.timezone).date_naive());

    if let Some(view) = calendar.month(this_month, now).await {
        let busy_days = view.days.iter().filter(|day| day.has_events()).count();
        info!("{}: {} days with sessions", view.title, busy_days);
    }

    if let Some((controller, handle)) = loki {
        controller.shutdown().await;
        let _ = handle.await;
    }
}
