//! Shared helpers for integration tests: frame building and a scripted
//! HTTP stub server speaking just enough HTTP/1.1 for reqwest.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use p3_bridge_lib::config::PostConfig;
use p3_bridge_lib::protocol::crc::crc16;
use p3_bridge_lib::protocol::wire::frame;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Header + TLV body + valid CRC, escaped and framed.
pub fn build_frame(version: u8, tor: u16, flags: u16, body: &[u8]) -> Vec<u8> {
    frame(&build_payload(version, tor, flags, body))
}

/// Unescaped payload with a valid trailing CRC.
pub fn build_payload(version: u8, tor: u16, flags: u16, body: &[u8]) -> Vec<u8> {
    let mut payload = vec![version];
    payload.extend_from_slice(&tor.to_le_bytes());
    payload.extend_from_slice(&flags.to_le_bytes());
    payload.extend_from_slice(body);
    let sum = crc16(&payload);
    payload.extend_from_slice(&sum.to_le_bytes());
    payload
}

pub struct StubServer {
    pub addr: SocketAddr,
    pub hits: Arc<AtomicUsize>,
}

impl StubServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Serve the scripted statuses in order, repeating the last one; one
/// connection per request (`connection: close`).
pub async fn spawn_http_stub(statuses: Vec<u16>) -> StubServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
    let addr = listener.local_addr().expect("stub addr");
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else { break };
            let idx = counter.fetch_add(1, Ordering::SeqCst);
            let status =
                statuses.get(idx).copied().or(statuses.last().copied()).unwrap_or(200);
            tokio::spawn(async move {
                read_request(&mut stream).await;
                let reason = match status {
                    200 => "OK",
                    404 => "Not Found",
                    429 => "Too Many Requests",
                    500 => "Internal Server Error",
                    503 => "Service Unavailable",
                    _ => "Status",
                };
                let resp = format!(
                    "HTTP/1.1 {status} {reason}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                );
                let _ = stream.write_all(resp.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });
    StubServer { addr, hits }
}

/// Read one full request (headers plus content-length body).
async fn read_request(stream: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 2048];
    let header_end = loop {
        match stream.read(&mut tmp).await {
            Ok(0) | Err(_) => return,
            Ok(n) => {
                buf.extend_from_slice(&tmp[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            }
        }
    };
    let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
    let content_length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        match stream.read(&mut tmp).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&tmp[..n]),
        }
    }
}

/// Delivery config aimed at a stub server, with short retry delays.
pub fn post_config(base_url: String, queue_path: &Path) -> PostConfig {
    PostConfig {
        enabled: true,
        base_url,
        path: "/api/passings".to_string(),
        timeout_ms: 2000,
        retries: 1,
        retry_delay_ms: 10,
        queue_path: queue_path.display().to_string(),
        ..PostConfig::default()
    }
}
