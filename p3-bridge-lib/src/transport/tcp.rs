//! TCP client supervisor.
//!
//! Owns the outbound connection to the decoder and drives an explicit
//! reconnect state machine:
//!
//! ```text
//! Idle -> Connecting -> Connected -> Backoff -> Connecting -> ...
//!                   \-> Backoff
//! any state -> Stopped on shutdown
//! ```
//!
//! Received bytes are forwarded as chunks over an mpsc channel; the
//! supervisor never parses them. The target `(host, port)` can be
//! replaced at runtime through [`TcpHandle`]: while connected the
//! current socket is closed and reconnected immediately, while backing
//! off the pending timer is cancelled.

use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

use crate::transport::backoff::ReconnectPolicy;

const READ_BUF_BYTES: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpTarget {
    pub host: String,
    pub port: u16,
}

enum State {
    Idle,
    Connecting,
    Connected(TcpStream),
    Backoff(Duration),
    Stopped,
}

/// Runtime control surface for the supervisor.
#[derive(Debug, Clone)]
pub struct TcpHandle {
    target_tx: watch::Sender<TcpTarget>,
    connected_rx: watch::Receiver<bool>,
}

impl TcpHandle {
    /// Replace the decoder address. Takes effect immediately: a live
    /// connection is closed, a pending backoff timer is cancelled.
    pub fn set_target(&self, host: impl Into<String>, port: u16) {
        let _ = self.target_tx.send(TcpTarget { host: host.into(), port });
    }

    /// Watchable connected/disconnected status.
    pub fn connected(&self) -> watch::Receiver<bool> {
        self.connected_rx.clone()
    }
}

pub struct TcpSupervisor {
    target_rx: watch::Receiver<TcpTarget>,
    connected_tx: watch::Sender<bool>,
    policy: ReconnectPolicy,
    connect_timeout: Duration,
    chunks: mpsc::Sender<Vec<u8>>,
    shutdown: watch::Receiver<bool>,
    attempt: u32,
}

impl TcpSupervisor {
    pub fn new(
        target: TcpTarget,
        policy: ReconnectPolicy,
        connect_timeout: Duration,
        chunks: mpsc::Sender<Vec<u8>>,
        shutdown: watch::Receiver<bool>,
    ) -> (Self, TcpHandle) {
        let (target_tx, target_rx) = watch::channel(target);
        let (connected_tx, connected_rx) = watch::channel(false);
        let handle = TcpHandle { target_tx, connected_rx };
        let supervisor = Self {
            target_rx,
            connected_tx,
            policy,
            connect_timeout,
            chunks,
            shutdown,
            attempt: 0,
        };
        (supervisor, handle)
    }

    pub async fn run(mut self) {
        let mut state = State::Idle;
        loop {
            state = match state {
                State::Idle => State::Connecting,
                State::Connecting => self.connect().await,
                State::Connected(stream) => self.read_loop(stream).await,
                State::Backoff(delay) => self.backoff(delay).await,
                State::Stopped => break,
            };
        }
        let _ = self.connected_tx.send(false);
        info!("tcp supervisor stopped");
    }

    /// Schedule the next reconnect: every scheduled attempt increments
    /// the counter; it resets only on a successful connect.
    fn next_backoff(&mut self) -> State {
        self.attempt += 1;
        State::Backoff(self.policy.delay_for(self.attempt))
    }

    async fn connect(&mut self) -> State {
        let target = self.target_rx.borrow_and_update().clone();
        let connect = TcpStream::connect((target.host.as_str(), target.port));
        tokio::select! {
            res = timeout(self.connect_timeout, connect) => match res {
                Ok(Ok(stream)) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        warn!(error = %e, "failed to disable Nagle");
                    }
                    self.attempt = 0;
                    let _ = self.connected_tx.send(true);
                    info!(host = %target.host, port = target.port, "decoder connected");
                    State::Connected(stream)
                }
                Ok(Err(e)) => {
                    warn!(host = %target.host, port = target.port, error = %e, "connect failed");
                    self.next_backoff()
                }
                Err(_) => {
                    warn!(
                        host = %target.host,
                        port = target.port,
                        timeout_ms = self.connect_timeout.as_millis() as u64,
                        "connect timeout"
                    );
                    self.next_backoff()
                }
            },
            _ = self.target_rx.changed() => {
                info!("target replaced while connecting, retrying");
                State::Connecting
            }
            _ = self.shutdown.changed() => State::Stopped,
        }
    }

    async fn read_loop(&mut self, mut stream: TcpStream) -> State {
        let mut buf = vec![0u8; READ_BUF_BYTES];
        loop {
            tokio::select! {
                res = stream.read(&mut buf) => match res {
                    Ok(0) => {
                        warn!("decoder closed connection");
                        let _ = self.connected_tx.send(false);
                        return self.next_backoff();
                    }
                    Ok(n) => {
                        if self.chunks.send(buf[..n].to_vec()).await.is_err() {
                            return State::Stopped;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "read error, reconnecting");
                        let _ = self.connected_tx.send(false);
                        return self.next_backoff();
                    }
                },
                _ = self.target_rx.changed() => {
                    info!("target replaced, closing connection");
                    let _ = self.connected_tx.send(false);
                    // Dropping the stream closes the socket; reconnect
                    // immediately against the new target.
                    return State::Backoff(Duration::ZERO);
                }
                _ = self.shutdown.changed() => {
                    let _ = self.connected_tx.send(false);
                    return State::Stopped;
                }
            }
        }
    }

    async fn backoff(&mut self, delay: Duration) -> State {
        tokio::select! {
            () = sleep(delay) => State::Connecting,
            _ = self.target_rx.changed() => {
                info!("target replaced during backoff, reconnecting now");
                State::Connecting
            }
            _ = self.shutdown.changed() => State::Stopped,
        }
    }
}
