//! At-least-once HTTP delivery: inline POST with bounded retries,
//! falling back to a persistent on-disk queue drained over time.

pub mod drainer;
pub mod poster;
pub mod queue;

pub use drainer::Drainer;
pub use poster::{DeliveryResult, PostOutcome, Poster};
pub use queue::{QueueEntry, RetryQueue};

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::config::PostConfig;
use crate::error::Result;
use crate::stats::BridgeStats;

/// The delivery half of the pipeline: owns the poster and the drainer.
pub struct Delivery {
    poster: Option<Poster>,
    drainer: Drainer,
    stats: Arc<BridgeStats>,
}

impl Delivery {
    pub async fn new(cfg: &PostConfig, stats: Arc<BridgeStats>) -> Result<Self> {
        let poster = if cfg.enabled { Some(Poster::from_config(cfg)?) } else { None };
        let queue = RetryQueue::load(&cfg.queue_path).await;
        let drainer = Drainer::new(queue, cfg.queue_drain_max_per_tick, stats.clone());
        Ok(Self { poster, drainer, stats })
    }

    pub fn queue_len(&self) -> usize {
        self.drainer.queue_len()
    }

    /// Deliver one record envelope. On inline success a drain fires
    /// immediately, before the next record is processed; on failure the
    /// envelope is persisted for later replay.
    pub async fn handle_record(&mut self, envelope: Value) {
        let Some(poster) = &self.poster else {
            debug!("delivery disabled, dropping record");
            return;
        };
        match poster.deliver(&envelope).await {
            DeliveryResult::Delivered => {
                self.stats.record_post_ok();
                self.drainer.drain(poster).await;
            }
            DeliveryResult::Failed { last_error } => {
                self.stats.record_post_failed();
                let entry = QueueEntry::new(
                    poster.method().as_str(),
                    poster.url().as_str(),
                    poster.headers().clone(),
                    envelope,
                    Some(last_error),
                );
                self.drainer.enqueue(entry).await;
            }
        }
    }

    /// Periodic drain tick.
    pub async fn drain(&mut self) {
        if let Some(poster) = &self.poster {
            self.drainer.drain(poster).await;
        }
    }
}
