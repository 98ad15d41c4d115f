//! Bridge wiring: transport -> framer -> parser -> delivery.
//!
//! Framer, parser, and delivery scheduling all run on one logical task;
//! the transport is the only spawned worker and feeds raw byte chunks
//! over a bounded channel. Each record is fully handled (logged,
//! POSTed or enqueued) before the next frame is touched, which keeps
//! per-record causal order on the inline path.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{info, warn};

use crate::config::{Config, Mode};
use crate::delivery::Delivery;
use crate::error::Result;
use crate::protocol::{parser, Framer};
use crate::stats::BridgeStats;
use crate::transport::{run_udp, ReconnectPolicy, TcpHandle, TcpSupervisor, TcpTarget};

const CHUNK_CHANNEL_DEPTH: usize = 64;
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

pub struct Bridge {
    cfg: Arc<Config>,
    stats: Arc<BridgeStats>,
}

impl Bridge {
    pub fn new(cfg: Config) -> Self {
        Self { cfg: Arc::new(cfg), stats: Arc::new(BridgeStats::default()) }
    }

    pub fn stats(&self) -> Arc<BridgeStats> {
        self.stats.clone()
    }

    /// Run until `shutdown` signals.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> Result<()> {
        self.run_inner(shutdown, |_| {}).await
    }

    /// Like [`run`](Self::run), but hands the TCP control handle (for
    /// runtime target replacement) to the caller before connecting.
    pub async fn run_with_tcp_handle(
        &self,
        shutdown: watch::Receiver<bool>,
        on_tcp_handle: impl FnOnce(TcpHandle),
    ) -> Result<()> {
        self.run_inner(shutdown, on_tcp_handle).await
    }

    async fn run_inner(
        &self,
        mut shutdown: watch::Receiver<bool>,
        on_tcp_handle: impl FnOnce(TcpHandle),
    ) -> Result<()> {
        let (chunk_tx, mut chunk_rx) = mpsc::channel::<Vec<u8>>(CHUNK_CHANNEL_DEPTH);

        let transport = match self.cfg.defaults.mode {
            Mode::Tcp => {
                let target = TcpTarget {
                    host: self.cfg.defaults.tcp_host.clone(),
                    port: self.cfg.defaults.tcp_port,
                };
                let policy = ReconnectPolicy::from(&self.cfg.decoder.reconnect);
                let connect_timeout =
                    Duration::from_millis(self.cfg.decoder.reconnect.connect_timeout_ms);
                let (supervisor, handle) =
                    TcpSupervisor::new(target, policy, connect_timeout, chunk_tx, shutdown.clone());
                on_tcp_handle(handle);
                tokio::spawn(async move {
                    supervisor.run().await;
                    Ok::<(), crate::error::BridgeError>(())
                })
            }
            Mode::Udp => {
                let host = self.cfg.defaults.tcp_host.clone();
                let port = self.cfg.defaults.udp_listen_port;
                let udp_shutdown = shutdown.clone();
                tokio::spawn(async move { run_udp(&host, port, chunk_tx, udp_shutdown).await })
            }
        };

        let mut pipeline = Pipeline::new(&self.cfg, self.stats.clone()).await?;

        let mut drain_tick = interval(Duration::from_millis(self.cfg.post.drain_interval_ms));
        drain_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut status_tick =
            interval(Duration::from_secs(self.cfg.logging.status_interval_secs.max(1)));
        status_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut transport = transport;
        loop {
            tokio::select! {
                maybe = chunk_rx.recv() => match maybe {
                    Some(chunk) => pipeline.process_chunk(&chunk).await,
                    // Transport gone: either fatal (UDP bind) or shutdown.
                    None => break,
                },
                _ = drain_tick.tick() => pipeline.drain().await,
                _ = status_tick.tick() => {
                    let snap = self.stats.snapshot();
                    info!(
                        total = snap.msg_total,
                        ok = snap.msg_ok,
                        suppressed = snap.msg_suppressed,
                        crc_errors = snap.crc_errors,
                        parse_errors = snap.parse_errors,
                        frame_resyncs = snap.frame_resyncs,
                        frame_oversize = snap.frame_oversize,
                        posts_ok = snap.posts_ok,
                        posts_failed = snap.posts_failed,
                        queued = pipeline.queue_len(),
                        "bridge status"
                    );
                }
                _ = shutdown.changed() => break,
            }
        }

        // Drains are always awaited inline, so none is in flight here;
        // give the transport a short grace to observe shutdown.
        match timeout(SHUTDOWN_GRACE, &mut transport).await {
            Ok(Ok(result)) => result?,
            Ok(Err(e)) => warn!(error = %e, "transport task panicked"),
            Err(_) => {
                warn!("transport did not stop within grace, aborting");
                transport.abort();
            }
        }
        info!("bridge stopped");
        Ok(())
    }
}

/// The single-task processing chain behind the transport.
pub struct Pipeline {
    framer: Framer,
    delivery: Delivery,
    stats: Arc<BridgeStats>,
    suppress_status: bool,
}

impl Pipeline {
    pub async fn new(cfg: &Config, stats: Arc<BridgeStats>) -> Result<Self> {
        let delivery = Delivery::new(&cfg.post, stats.clone()).await?;
        Ok(Self {
            framer: Framer::default(),
            delivery,
            stats,
            suppress_status: cfg.logging.suppress_status,
        })
    }

    pub fn queue_len(&self) -> usize {
        self.delivery.queue_len()
    }

    /// Push one chunk of transport bytes and fully handle every frame
    /// it completes. Framing diagnostics tallied during the push are
    /// folded into the counter aggregate.
    pub async fn process_chunk(&mut self, chunk: &[u8]) {
        let (resyncs_before, oversize_before) = (self.framer.resyncs(), self.framer.oversize());
        let payloads = self.framer.push(chunk);
        self.stats.record_frame_resyncs(self.framer.resyncs() - resyncs_before);
        self.stats.record_frame_oversize(self.framer.oversize() - oversize_before);
        for payload in payloads {
            self.handle_payload(&payload).await;
        }
    }

    async fn handle_payload(&mut self, payload: &[u8]) {
        let record = match parser::parse(payload) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "unparseable frame dropped");
                self.stats.record_parse_error();
                return;
            }
        };
        self.stats.record_parsed();
        if !record.crc.ok {
            self.stats.record_crc_error();
            warn!(
                tor = record.tor,
                received = record.crc.received,
                computed = record.crc.computed,
                "crc mismatch, record kept"
            );
        }
        if self.suppress_status && record.is_status() {
            self.stats.record_suppressed();
            return;
        }
        let envelope = record.envelope();
        info!(record = %envelope, "record");
        self.delivery.handle_record(envelope).await;
    }

    /// Periodic drain tick.
    pub async fn drain(&mut self) {
        self.delivery.drain().await;
    }
}
