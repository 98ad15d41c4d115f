//! Decoder-side transports: TCP client with reconnect, UDP listener.

pub mod backoff;
pub mod tcp;
pub mod udp;

pub use backoff::ReconnectPolicy;
pub use tcp::{TcpHandle, TcpSupervisor, TcpTarget};
pub use udp::run_udp;
