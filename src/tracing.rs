use lazy_static::lazy_static;
use std::{env, io};
use tokio::task::JoinHandle;
use tracing::{info, warn, Level};
use tracing_loki::url::Url;
use tracing_loki::BackgroundTaskController;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{filter, fmt};

const SERVICE_NAME: &str = "cartelera";

lazy_static! {
    static ref LOKI_URL: Option<String> = env::var("LOKI_URL").ok();
}

pub type LokiHandle = (BackgroundTaskController, JoinHandle<()>);

fn target_filter() -> filter::Targets {
    filter::Targets::new()
        .with_target(SERVICE_NAME, Level::TRACE)
        .with_default(Level::WARN)
}

/// Stdout logging, plus Loki when `LOKI_URL` points at a reachable instance.
///
/// The returned controller must be shut down on exit so buffered logs get flushed.
pub async fn setup_tracing() -> Option<LokiHandle> {
    let registry = tracing_subscriber::registry()
        .with(target_filter())
        .with(fmt::layer().with_writer(io::stdout));

    let Some(raw_url) = LOKI_URL.as_ref() else {
        registry.init();
        warn!("Loki URL not provided. Continuing without it.");
        return None;
    };

    let base_url: Url = match raw_url.parse() {
        Ok(url) => url,
        Err(err) => {
            registry.init();
            warn!("Invalid LOKI_URL '{}' ({}). Continuing without it.", raw_url, err);
            return None;
        }
    };

    if reqwest::get(base_url.clone()).await.is_err() {
        registry.init();
        warn!("Couldn't connect to Loki. Continuing without it.");
        return None;
    }

    let built = tracing_loki::builder()
        .label("service", SERVICE_NAME)
        .and_then(|builder| builder.build_controller_url(base_url));

    match built {
        Ok((layer, controller, task)) => {
            registry.with(layer).init();
            let handle = tokio::spawn(task);

            info!("Loki initialized");

            Some((controller, handle))
        }
        Err(err) => {
            registry.init();
            warn!("Couldn't build the Loki layer ({}). Continuing without it.", err);
            None
        }
    }
}
