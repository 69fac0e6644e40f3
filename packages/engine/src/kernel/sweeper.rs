//! Background sweeper service.
//!
//! Runs the periodic maintenance the engine needs independently of any
//! client connection:
//! - purges queue entries older than the configured max wait
//! - clears expired typing markers
//! - re-drives pairing for everyone still waiting (polling fallback
//!   against missed push notifications, not the primary mechanism)
//!
//! # Example
//!
//! ```ignore
//! let sweeper = Sweeper::new(pool, hub, config);
//! let shutdown = sweeper.shutdown_handle();
//! tokio::spawn(sweeper.run());
//! // later:
//! shutdown.store(true, Ordering::SeqCst);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sqlx::PgPool;
use tracing::{debug, error, info};

use crate::config::EngineConfig;
use crate::domains::matching;
use crate::domains::presence::models::PresenceRecord;
use crate::domains::queue;
use crate::domains::queue::models::QueueEntry;
use crate::kernel::event_hub::EventHub;

/// Background service driving timeouts and the periodic match tick.
pub struct Sweeper {
    pool: PgPool,
    hub: EventHub,
    config: EngineConfig,
    shutdown: Arc<AtomicBool>,
}

impl Sweeper {
    /// Create a new sweeper.
    pub fn new(pool: PgPool, hub: EventHub, config: EngineConfig) -> Self {
        Self {
            pool,
            hub,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a shutdown handle for graceful shutdown.
    ///
    /// Call `store(true, Ordering::SeqCst)` on the returned Arc to signal shutdown.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    /// Request shutdown of the sweeper.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Run the sweeper until shutdown is requested.
    ///
    /// Tick errors are logged and never fatal; the next tick retries.
    pub async fn run(self) {
        info!(
            interval_ms = self.config.sweep_interval.as_millis() as u64,
            max_queue_wait_secs = self.config.max_queue_wait.as_secs(),
            "sweeper starting"
        );

        let mut ticker = tokio::time::interval(self.config.sweep_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            if self.is_shutdown_requested() {
                break;
            }

            if let Err(err) = self.tick().await {
                error!(error = %err, "sweeper tick failed");
            }

            self.hub.cleanup().await;
        }

        info!("sweeper stopped");
    }

    /// One maintenance pass.
    pub async fn tick(&self) -> anyhow::Result<()> {
        let purged = queue::purge_stale(self.config.max_queue_wait, &self.pool, &self.hub).await?;

        let cleared = PresenceRecord::clear_expired_typing(&self.pool).await?;
        if cleared > 0 {
            debug!(count = cleared, "cleared expired typing markers");
        }

        // Re-drive pairing for everyone still waiting. Pairing consumes
        // entries as it goes, so users matched earlier in the loop come
        // back as NotQueued and are skipped.
        let waiting = QueueEntry::waiting_user_ids(&self.pool).await?;
        for user_id in waiting {
            if self.is_shutdown_requested() {
                break;
            }
            if let Err(err) =
                matching::try_match(user_id, &self.pool, &self.hub, &self.config).await
            {
                error!(user_id = %user_id, error = %err, "match tick failed for user");
            }
        }

        if purged > 0 {
            debug!(purged, "sweep pass complete");
        }
        Ok(())
    }
}
