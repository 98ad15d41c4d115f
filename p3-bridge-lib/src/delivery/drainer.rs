//! Queue drainer: replays persisted entries toward the backend.
//!
//! A drain processes at most `max_per_tick` entries from the head, in
//! FIFO order. The first failure updates the head entry and aborts the
//! batch so a down endpoint is not hammered. Drains are single-flight:
//! a drain invoked while one is running short-circuits.

use std::sync::Arc;

use reqwest::{Method, Url};
use tracing::{debug, info, warn};

use crate::delivery::poster::{PostOutcome, Poster};
use crate::delivery::queue::{QueueEntry, RetryQueue};
use crate::stats::BridgeStats;

pub struct Drainer {
    queue: RetryQueue,
    max_per_tick: usize,
    in_flight: bool,
    stats: Arc<BridgeStats>,
}

impl Drainer {
    pub fn new(queue: RetryQueue, max_per_tick: usize, stats: Arc<BridgeStats>) -> Self {
        Self { queue, max_per_tick, in_flight: false, stats }
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Persist a failed record. A queue IO error is logged, not fatal:
    /// the entry stays in memory and the next persist retries the file.
    pub async fn enqueue(&mut self, entry: QueueEntry) {
        self.stats.record_enqueued();
        info!(id = %entry.id, depth = self.queue.len() + 1, "record enqueued for retry");
        if let Err(e) = self.queue.enqueue(entry).await {
            warn!(error = %e, "failed to persist queue");
        }
    }

    /// Replay up to `max_per_tick` head entries through `poster`.
    pub async fn drain(&mut self, poster: &Poster) {
        if self.in_flight {
            debug!("drain already in flight");
            return;
        }
        if self.queue.is_empty() {
            return;
        }
        self.in_flight = true;
        self.drain_batch(poster).await;
        self.in_flight = false;
    }

    async fn drain_batch(&mut self, poster: &Poster) {
        for _ in 0..self.max_per_tick {
            let Some(head) = self.queue.front() else { break };
            let outcome = match replay_target(head) {
                Ok((method, url)) => {
                    poster.send_raw(method, url, &head.headers, &head.payload).await
                }
                Err(error) => PostOutcome::Retryable(error),
            };
            match outcome {
                PostOutcome::Ok => {
                    self.stats.record_drained();
                    match self.queue.complete_head().await {
                        Ok(entry) => {
                            info!(id = %entry.id, remaining = self.queue.len(), "queued record delivered")
                        }
                        Err(e) => {
                            warn!(error = %e, "failed to persist queue after drain");
                            break;
                        }
                    }
                }
                PostOutcome::Terminal(status) => {
                    self.record_failure(format!("HTTP {status}")).await;
                    break;
                }
                PostOutcome::Retryable(error) => {
                    self.record_failure(error).await;
                    break;
                }
            }
        }
    }

    async fn record_failure(&mut self, error: String) {
        warn!(error = %error, depth = self.queue.len(), "drain aborted at queue head");
        if let Err(e) = self.queue.fail_head(error).await {
            warn!(error = %e, "failed to persist queue failure");
        }
    }
}

/// Entries store method and URL as strings; a hand-edited file can make
/// them invalid, which counts as a replay failure of the head.
fn replay_target(entry: &QueueEntry) -> Result<(Method, Url), String> {
    let method = Method::from_bytes(entry.method.as_bytes())
        .map_err(|_| format!("invalid method {:?}", entry.method))?;
    let url: Url = entry.url.parse().map_err(|e| format!("invalid url: {e}"))?;
    Ok((method, url))
}
