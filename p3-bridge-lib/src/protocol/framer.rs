//! Incremental P3 framer.
//!
//! Accepts arbitrary chunks of bytes (TCP segments or whole UDP
//! datagrams) and yields complete, unescaped frame payloads. The output
//! is identical for any chunking of the same byte sequence. All framing
//! errors are non-fatal: the framer logs, resynchronises on the next
//! SOH, and keeps going.

use bytes::{Buf, BytesMut};
use tracing::warn;

use crate::protocol::wire::{DLE, EOT, ESCAPE_XOR, SOH};

/// Rolling-buffer cap. An open frame that grows past this without a
/// closing EOT is dropped and scanning resumes after its SOH.
pub const MAX_FRAME_BYTES: usize = 64 * 1024;

enum Scan {
    /// Unescaped payload plus the number of raw bytes consumed.
    Complete { payload: Vec<u8>, consumed: usize },
    /// Unescaped SOH inside the frame at this offset; restart there.
    Restart { at: usize },
    /// Frame still open at the end of the buffer.
    Incomplete,
}

pub struct Framer {
    buf: BytesMut,
    max_frame: usize,
    resyncs: u64,
    oversize: u64,
}

impl Default for Framer {
    fn default() -> Self {
        Self::with_max_frame(MAX_FRAME_BYTES)
    }
}

impl Framer {
    pub fn with_max_frame(max_frame: usize) -> Self {
        Self { buf: BytesMut::new(), max_frame, resyncs: 0, oversize: 0 }
    }

    /// Frames dropped because an unescaped SOH restarted framing, or
    /// because noise preceded a frame start.
    pub fn resyncs(&self) -> u64 {
        self.resyncs
    }

    /// Frames dropped because they outgrew the buffer cap.
    pub fn oversize(&self) -> u64 {
        self.oversize
    }

    /// Append a chunk and return every frame payload it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        loop {
            match self.find_start() {
                Some(0) => {}
                Some(start) => {
                    self.resyncs += 1;
                    warn!(dropped = start, "resync: discarding bytes before frame start");
                    self.buf.advance(start);
                }
                None => {
                    // No frame start in sight. Everything buffered is
                    // noise, except a trailing DLE which may escape a
                    // byte still in flight.
                    let keep = usize::from(self.buf.last() == Some(&DLE));
                    let len = self.buf.len();
                    self.buf.advance(len - keep);
                    return frames;
                }
            }
            match self.scan_frame() {
                Scan::Complete { payload, consumed } => {
                    self.buf.advance(consumed);
                    frames.push(payload);
                }
                Scan::Restart { at } => {
                    self.resyncs += 1;
                    warn!(dropped = at, "resync: unescaped SOH inside frame, restarting");
                    self.buf.advance(at);
                }
                Scan::Incomplete => {
                    if self.buf.len() > self.max_frame {
                        self.oversize += 1;
                        warn!(
                            buffered = self.buf.len(),
                            cap = self.max_frame,
                            "frame_oversize: no EOT within buffer cap, dropping frame"
                        );
                        self.buf.advance(1);
                        continue;
                    }
                    return frames;
                }
            }
        }
    }

    /// Offset of the first SOH not preceded by a DLE.
    fn find_start(&self) -> Option<usize> {
        self.buf
            .iter()
            .enumerate()
            .position(|(i, &b)| b == SOH && (i == 0 || self.buf[i - 1] != DLE))
    }

    /// Unescape from just past the SOH at offset 0 until EOT, an
    /// unescaped SOH, or the end of the buffer.
    fn scan_frame(&self) -> Scan {
        let mut payload = Vec::new();
        let mut i = 1;
        while i < self.buf.len() {
            match self.buf[i] {
                DLE => {
                    if i + 1 >= self.buf.len() {
                        // Lone DLE at the tail: its partner is still in
                        // flight, so leave it for the next push.
                        return Scan::Incomplete;
                    }
                    payload.push(self.buf[i + 1] ^ ESCAPE_XOR);
                    i += 2;
                }
                EOT => return Scan::Complete { payload, consumed: i + 1 },
                SOH => return Scan::Restart { at: i },
                byte => {
                    payload.push(byte);
                    i += 1;
                }
            }
        }
        Scan::Incomplete
    }
}
