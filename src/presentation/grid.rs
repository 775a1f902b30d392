use crate::aggregator::merge::{category_options, CategoryOption};
use crate::category::color::LIGHT_TEXT;
use crate::event::model::{NormalizedEvent, Surface};
use crate::presentation::locale::format_date_range;
use chrono_tz::Tz;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

pub const ALL_CATEGORIES: &str = "all";
pub const ALL_CATEGORIES_LABEL: &str = "Todas las categorías";
pub const EMPTY_MESSAGE: &str = "No hay eventos disponibles.";
pub const EAGER_CARDS: usize = 6;
pub const SKELETON_CARDS: usize = 8;
pub const DEFAULT_CHUNK_SIZE: usize = 24;
const MIN_CHUNK_SIZE: usize = 8;
const MAX_CHUNK_SIZE: usize = 100;
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(160);

/// Search box and category select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridFilter {
    query: String,
    category: String,
}

impl Default for GridFilter {
    fn default() -> Self {
        Self {
            query: String::new(),
            category: ALL_CATEGORIES.to_string(),
        }
    }
}

impl GridFilter {
    pub fn new(query: &str, category: &str) -> Self {
        let category = category.trim();

        Self {
            query: query.trim().to_lowercase(),
            category: if category.is_empty() {
                ALL_CATEGORIES.to_string()
            } else {
                category.to_string()
            },
        }
    }

    /// Title substring (case-insensitive) and exact category key, `all` matching everything.
    pub fn matches(&self, event: &NormalizedEvent) -> bool {
        let text_ok = self.query.is_empty() || event.title_lower.contains(&self.query);
        let category_ok = self.category == ALL_CATEGORIES || event.category.key == self.category;

        text_ok && category_ok
    }

    pub fn apply<'a>(&self, events: &'a [NormalizedEvent]) -> Vec<&'a NormalizedEvent> {
        events.iter().filter(|event| self.matches(event)).collect()
    }
}

/// Options for the category select, `all` first.
pub fn filter_options(events: &[NormalizedEvent]) -> Vec<CategoryOption> {
    let mut options = vec![CategoryOption {
        key: ALL_CATEGORIES.to_string(),
        label: ALL_CATEGORIES_LABEL.to_string(),
    }];
    options.extend(category_options(events));
    options
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardView {
    pub id: String,
    pub title: String,
    pub image: String,
    pub image_alt: String,
    /// Above-the-fold cards load their image eagerly.
    pub eager: bool,
    pub date_label: String,
    pub category_label: String,
    pub category_class: String,
    pub pill_style: Option<String>,
    pub url: String,
    pub cta_label: String,
    pub aria_label: String,
}

impl CardView {
    pub fn build(event: &NormalizedEvent, index: usize, tz: &Tz) -> Self {
        let cta_label = if event.cta_label.trim().is_empty() {
            Surface::Billboard.default_cta().to_string()
        } else {
            event.cta_label.clone()
        };

        let pill_style = event.category_color.as_ref().map(|color| {
            format!(
                "background:{color};border-color:{color};color:{};",
                event.category_text_color.unwrap_or(LIGHT_TEXT)
            )
        });

        Self {
            id: event.id.clone(),
            title: event.title.clone(),
            image: event.image.clone(),
            image_alt: format!("{} – cartel", event.title),
            eager: index < EAGER_CARDS,
            date_label: format_date_range(event.first_date.as_ref(), event.last_date.as_ref(), tz),
            category_label: event.category.label.clone(),
            category_class: event.category.css_class.clone(),
            pill_style,
            url: event.url.clone(),
            aria_label: format!("{} para {}", cta_label, event.title),
            cta_label,
        }
    }
}

/// Cards built during one render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub epoch: u64,
    pub cards: Vec<CardView>,
}

/// Lazily builds the cards of one filtered list, `chunk_size` at a time.
#[derive(Debug)]
pub struct RenderPass {
    epoch: u64,
    events: Vec<NormalizedEvent>,
    next: usize,
    chunk_size: usize,
    tz: Tz,
}

impl RenderPass {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

impl Iterator for RenderPass {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.next >= self.events.len() {
            return None;
        }

        let end = (self.next + self.chunk_size).min(self.events.len());
        let cards = (self.next..end)
            .map(|index| CardView::build(&self.events[index], index, &self.tz))
            .collect();

        self.next = end;

        Some(Chunk {
            epoch: self.epoch,
            cards,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridState {
    Skeleton(usize),
    Cards,
    Message(String),
}

/// The billboard grid: every loaded event, the active filter and the cards shown so far.
///
/// Each render starts a new epoch. Chunks produced by an older pass are rejected, so a
/// slow pass never paints over the result of a newer filter.
#[derive(Debug)]
pub struct Grid {
    events: Vec<NormalizedEvent>,
    filter: GridFilter,
    epoch: u64,
    chunk_size: usize,
    tz: Tz,
    state: GridState,
    cards: Vec<CardView>,
}

impl Grid {
    pub fn new(chunk_size: usize, tz: Tz) -> Self {
        Self {
            events: Vec::new(),
            filter: GridFilter::default(),
            epoch: 0,
            chunk_size: chunk_size.clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE),
            tz,
            state: GridState::Skeleton(SKELETON_CARDS),
            cards: Vec::new(),
        }
    }

    pub fn events(&self) -> &[NormalizedEvent] {
        &self.events
    }

    pub fn filter(&self) -> &GridFilter {
        &self.filter
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn state(&self) -> &GridState {
        &self.state
    }

    pub fn cards(&self) -> &[CardView] {
        &self.cards
    }

    pub fn options(&self) -> Vec<CategoryOption> {
        filter_options(&self.events)
    }

    pub fn show_skeleton(&mut self) {
        self.epoch += 1;
        self.cards.clear();
        self.state = GridState::Skeleton(SKELETON_CARDS);
    }

    pub fn show_message(&mut self, message: &str) {
        self.epoch += 1;
        self.cards.clear();
        self.state = GridState::Message(message.to_string());
    }

    pub fn set_events(&mut self, events: Vec<NormalizedEvent>) -> RenderPass {
        self.events = events;
        self.render()
    }

    pub fn set_filter(&mut self, filter: GridFilter) -> RenderPass {
        self.filter = filter;
        self.render()
    }

    /// Starts a new pass over the filtered events.
    pub fn render(&mut self) -> RenderPass {
        self.epoch += 1;
        self.cards.clear();

        let filtered: Vec<NormalizedEvent> =
            self.filter.apply(&self.events).into_iter().cloned().collect();

        self.state = if filtered.is_empty() {
            GridState::Message(EMPTY_MESSAGE.to_string())
        } else {
            GridState::Cards
        };

        debug!(
            "Render pass {}: {} of {} events",
            self.epoch,
            filtered.len(),
            self.events.len()
        );

        RenderPass {
            epoch: self.epoch,
            events: filtered,
            next: 0,
            chunk_size: self.chunk_size,
            tz: self.tz,
        }
    }

    /// Appends a chunk if it belongs to the current pass.
    pub fn accept(&mut self, chunk: Chunk) -> bool {
        if chunk.epoch != self.epoch {
            trace!("Discarding chunk from stale pass {}", chunk.epoch);
            return false;
        }

        self.cards.extend(chunk.cards);
        true
    }

    /// Renders and accepts every chunk right away.
    pub fn render_all(&mut self) {
        let pass = self.render();
        self.drain(pass);
    }

    pub fn drain(&mut self, pass: RenderPass) {
        for chunk in pass {
            if !self.accept(chunk) {
                break;
            }
        }
    }
}

/// Runs only the last job scheduled within `delay`.
pub struct Debouncer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn call<F>(&mut self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Some(previous) = self.pending.take() {
            previous.abort();
        }

        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            job.await;
        }));
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}
