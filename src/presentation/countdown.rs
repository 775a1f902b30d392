use crate::aggregator::sessions::{next_session, NextSessionBundle, RangeSessions};
use crate::cache::TimedCache;
use crate::config::model::EnvironmentConfig;
use crate::presentation::locale::format_session_date;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use tracing::{error, info, warn};

pub const CACHE_KEY_PREFIX: &str = "cloudari_ce_next_";
pub const DEFAULT_EXTRA_DAYS: i64 = 180;
pub const MAX_EXTRA_DAYS: i64 = 3650;
pub const UPCOMING_MESSAGE: &str = "Próximamente";
pub const UNAVAILABLE_MESSAGE: &str = "—";

pub fn countdown_ttl() -> Duration {
    Duration::hours(6)
}

pub fn cache_key(event_id: &str) -> String {
    format!("{}{}", CACHE_KEY_PREFIX, event_id)
}

/// Widget ids are positive integers, anything else leaves the widget inert.
pub fn parse_event_id(raw: &str) -> Option<String> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|id| *id > 0)
        .map(|id| id.to_string())
}

/// Time left until a session, never negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Remaining {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Remaining {
    pub fn until(target: &DateTime<FixedOffset>, now: DateTime<Utc>) -> Self {
        let total = (*target - now.fixed_offset()).num_seconds().max(0);

        Self {
            days: total / 86_400,
            hours: total % 86_400 / 3_600,
            minutes: total % 3_600 / 60,
            seconds: total % 60,
        }
    }

    pub fn is_over(&self) -> bool {
        *self == Self::default()
    }

    /// Two-digit `d h m s` tiles.
    pub fn tiles(&self) -> [String; 4] {
        [self.days, self.hours, self.minutes, self.seconds].map(|n| format!("{:02}", n))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CountdownState {
    Scheduled {
        bundle: NextSessionBundle,
        date_label: String,
        from_cache: bool,
    },
    /// No future session known.
    Upcoming,
    /// Nothing cached and the lookup failed.
    Unavailable,
}

impl CountdownState {
    pub fn label(&self) -> &str {
        match self {
            CountdownState::Scheduled { date_label, .. } => date_label,
            CountdownState::Upcoming => UPCOMING_MESSAGE,
            CountdownState::Unavailable => UNAVAILABLE_MESSAGE,
        }
    }

    pub fn shows_countdown(&self) -> bool {
        matches!(self, CountdownState::Scheduled { .. })
    }

    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Remaining> {
        match self {
            CountdownState::Scheduled { bundle, .. } => Some(Remaining::until(&bundle.date, now)),
            _ => None,
        }
    }
}

/// Next-session lookup for one event, cached per event id.
pub struct Countdown {
    sessions: RangeSessions,
    cache: TimedCache<NextSessionBundle>,
    env: EnvironmentConfig,
    extra_days: i64,
}

impl Countdown {
    pub fn new(
        sessions: RangeSessions,
        cache: TimedCache<NextSessionBundle>,
        env: EnvironmentConfig,
        extra_days: i64,
    ) -> Self {
        Self {
            sessions,
            cache,
            env,
            extra_days: if extra_days > 0 {
                extra_days.min(MAX_EXTRA_DAYS)
            } else {
                DEFAULT_EXTRA_DAYS
            },
        }
    }

    pub fn extra_days(&self) -> i64 {
        self.extra_days
    }

    fn scheduled(&self, bundle: NextSessionBundle, from_cache: bool) -> CountdownState {
        CountdownState::Scheduled {
            date_label: format_session_date(&bundle.date, &self.env.timezone),
            bundle,
            from_cache,
        }
    }

    /// A cached bundle counts only while its session is still ahead.
    pub async fn cached(&self, event_id: &str, now: DateTime<Utc>) -> Option<NextSessionBundle> {
        self.cache
            .read_at(&cache_key(event_id), now)
            .await
            .filter(|bundle| bundle.date > now)
    }

    pub async fn state(&self, event_id: &str) -> CountdownState {
        self.state_at(event_id, Utc::now()).await
    }

    /// Looks `extra_days` ahead for the next session, falling back to the cached one.
    #[tracing::instrument(skip(self))]
    pub async fn state_at(&self, event_id: &str, now: DateTime<Utc>) -> CountdownState {
        let cached = self.cached(event_id, now).await;

        let today = now.with_timezone(&self.env.timezone).date_naive();
        let until = today
            .checked_add_signed(Duration::days(self.extra_days))
            .unwrap_or(NaiveDate::MAX);
        let outcome = self.sessions.fetch_at(today, until, now).await;

        match next_session(&outcome.sessions, event_id, now, &self.env) {
            Some(bundle) => {
                if cached.as_ref().map(|cached| cached.date) != Some(bundle.date) {
                    info!("Next session of {} is {}", event_id, bundle.date);

                    if let Err(err) = self.cache.write_at(&cache_key(event_id), &bundle, now).await {
                        error!("Could not cache next session of {}: {}", event_id, err);
                    }
                }

                self.scheduled(bundle, false)
            }
            None => match (cached, outcome.catalog_error) {
                (Some(cached), failure) => {
                    if let Some(err) = failure {
                        warn!("Lookup failed ({}), keeping cached session", err);
                    }

                    self.scheduled(cached, true)
                }
                (None, Some(_)) => CountdownState::Unavailable,
                (None, None) => CountdownState::Upcoming,
            },
        }
    }
}
