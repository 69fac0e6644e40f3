//! Engine configuration.
//!
//! All knobs have conservative defaults; `from_env` overrides them from
//! `ENGINE_*` environment variables (loaded through dotenvy).

use std::time::Duration;

/// Tunables for the pairing and chat-session engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Queue entries older than this are purged by the background sweep
    /// and their owners told to stop searching.
    pub max_queue_wait: Duration,
    /// Typing indicators expire this long after the last refresh.
    pub typing_ttl: Duration,
    /// Interval of the background sweeper tick.
    pub sweep_interval: Duration,
    /// How many times a pairing attempt retries after losing a race.
    pub match_retries: u32,
    /// Maximum length of `last_message_preview`, in characters.
    pub preview_len: usize,
    /// Per-topic capacity of the event hub broadcast channels.
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_queue_wait: Duration::from_secs(120),
            typing_ttl: Duration::from_secs(2),
            sweep_interval: Duration::from_secs(5),
            match_retries: 3,
            preview_len: 80,
            event_capacity: 256,
        }
    }
}

impl EngineConfig {
    /// Build a config from the environment, falling back to defaults for
    /// anything unset or unparsable.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        Self {
            max_queue_wait: env_secs("ENGINE_MAX_QUEUE_WAIT_SECS")
                .unwrap_or(defaults.max_queue_wait),
            typing_ttl: env_millis("ENGINE_TYPING_TTL_MS").unwrap_or(defaults.typing_ttl),
            sweep_interval: env_secs("ENGINE_SWEEP_INTERVAL_SECS")
                .unwrap_or(defaults.sweep_interval),
            match_retries: env_parse("ENGINE_MATCH_RETRIES").unwrap_or(defaults.match_retries),
            preview_len: env_parse("ENGINE_PREVIEW_LEN").unwrap_or(defaults.preview_len),
            event_capacity: env_parse("ENGINE_EVENT_CAPACITY").unwrap_or(defaults.event_capacity),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.parse().ok()
}

fn env_secs(key: &str) -> Option<Duration> {
    env_parse::<u64>(key).map(Duration::from_secs)
}

fn env_millis(key: &str) -> Option<Duration> {
    env_parse::<u64>(key).map(Duration::from_millis)
}
