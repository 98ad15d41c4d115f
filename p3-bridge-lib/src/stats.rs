//! Bridge-wide message counters.
//!
//! One aggregate owns every counter; updates funnel through its methods
//! and concurrent readers take a [`StatsSnapshot`].

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct BridgeStats {
    msg_total: AtomicU64,
    msg_ok: AtomicU64,
    msg_suppressed: AtomicU64,
    crc_errors: AtomicU64,
    parse_errors: AtomicU64,
    frame_resyncs: AtomicU64,
    frame_oversize: AtomicU64,
    posts_ok: AtomicU64,
    posts_failed: AtomicU64,
    enqueued: AtomicU64,
    drained: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub msg_total: u64,
    pub msg_ok: u64,
    pub msg_suppressed: u64,
    pub crc_errors: u64,
    pub parse_errors: u64,
    pub frame_resyncs: u64,
    pub frame_oversize: u64,
    pub posts_ok: u64,
    pub posts_failed: u64,
    pub enqueued: u64,
    pub drained: u64,
}

impl BridgeStats {
    pub fn record_parsed(&self) {
        self.msg_total.fetch_add(1, Ordering::Relaxed);
        self.msg_ok.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_suppressed(&self) {
        self.msg_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_crc_error(&self) {
        self.crc_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_parse_error(&self) {
        self.msg_total.fetch_add(1, Ordering::Relaxed);
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame_resyncs(&self, count: u64) {
        self.frame_resyncs.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_frame_oversize(&self, count: u64) {
        self.frame_oversize.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_post_ok(&self) {
        self.posts_ok.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_post_failed(&self) {
        self.posts_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_drained(&self) {
        self.drained.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            msg_total: self.msg_total.load(Ordering::Relaxed),
            msg_ok: self.msg_ok.load(Ordering::Relaxed),
            msg_suppressed: self.msg_suppressed.load(Ordering::Relaxed),
            crc_errors: self.crc_errors.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
            frame_resyncs: self.frame_resyncs.load(Ordering::Relaxed),
            frame_oversize: self.frame_oversize.load(Ordering::Relaxed),
            posts_ok: self.posts_ok.load(Ordering::Relaxed),
            posts_failed: self.posts_failed.load(Ordering::Relaxed),
            enqueued: self.enqueued.load(Ordering::Relaxed),
            drained: self.drained.load(Ordering::Relaxed),
        }
    }
}
