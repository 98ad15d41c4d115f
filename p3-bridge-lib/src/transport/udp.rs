//! UDP listener variant: the decoder pushes datagrams to us.

use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};
use tracing::{info, trace, warn};

use crate::error::{BridgeError, Result};

/// Bind `(host, port)` and forward each datagram's bytes to the framer
/// channel. Receive errors are logged and the listener keeps going;
/// only the bind itself is fatal.
pub async fn run_udp(
    host: &str,
    port: u16,
    chunks: mpsc::Sender<Vec<u8>>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let socket = UdpSocket::bind((host, port))
        .await
        .map_err(|e| BridgeError::Config(format!("Failed to bind UDP {host}:{port}: {e}")))?;
    info!(%host, port, "udp listener bound");

    let mut buf = vec![0u8; 64 * 1024];
    loop {
        tokio::select! {
            res = socket.recv_from(&mut buf) => match res {
                Ok((n, peer)) => {
                    trace!(%peer, bytes = n, "datagram received");
                    if chunks.send(buf[..n].to_vec()).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!(error = %e, "udp receive error"),
            },
            _ = shutdown.changed() => break,
        }
    }
    info!("udp listener stopped");
    Ok(())
}
