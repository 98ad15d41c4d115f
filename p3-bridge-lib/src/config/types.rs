use std::collections::HashMap;

use serde::Deserialize;

/// Which transport feeds the framer.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Outbound TCP client to the decoder (default)
    #[default]
    Tcp,
    /// UDP listen socket the decoder sends datagrams to
    Udp,
}

/// Transport selection and decoder addresses.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DefaultsConfig {
    #[serde(default)]
    pub mode: Mode,
    /// Decoder host for TCP mode, bind host for UDP mode
    #[serde(default = "default_host")]
    pub tcp_host: String,
    /// Decoder's P3 TCP port
    #[serde(default = "default_tcp_port")]
    pub tcp_port: u16,
    /// Local UDP listen port
    #[serde(default = "default_udp_port")]
    pub udp_listen_port: u16,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Tcp,
            tcp_host: default_host(),
            tcp_port: default_tcp_port(),
            udp_listen_port: default_udp_port(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct DecoderConfig {
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

/// TCP reconnect backoff policy.
///
/// `delay = min(base * factor^(attempt-1), max) * (1 + U(-jitter, +jitter))`
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ReconnectConfig {
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    /// Relative jitter applied to every delay, e.g. 0.2 for +/-20%
    #[serde(default = "default_jitter_ratio")]
    pub jitter_ratio: f64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_factor: default_backoff_factor(),
            jitter_ratio: default_jitter_ratio(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

/// HTTP delivery of parsed records.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PostConfig {
    /// When false the bridge runs dry: records are logged and dropped
    #[serde(default)]
    pub enabled: bool,
    /// Base URL of the race-control backend; must parse when enabled
    #[serde(default)]
    pub base_url: String,
    /// Path joined onto the base URL
    #[serde(default = "default_post_path")]
    pub path: String,
    /// HTTP method, default POST
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Inline retry attempts after the first failed POST
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_retry_backoff_multiplier")]
    pub retry_backoff_multiplier: f64,
    /// Queue entries replayed per drain batch
    #[serde(default = "default_drain_max_per_tick")]
    pub queue_drain_max_per_tick: usize,
    /// Periodic drain tick
    #[serde(default = "default_drain_interval_ms")]
    pub drain_interval_ms: u64,
    /// On-disk retry queue (JSON array, atomically replaced)
    #[serde(default = "default_queue_path")]
    pub queue_path: String,
    /// Operator-supplied request headers
    #[serde(default = "default_headers")]
    pub headers: HashMap<String, String>,
}

impl Default for PostConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: String::new(),
            path: default_post_path(),
            method: default_method(),
            timeout_ms: default_timeout_ms(),
            retries: default_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            retry_backoff_multiplier: default_retry_backoff_multiplier(),
            queue_drain_max_per_tick: default_drain_max_per_tick(),
            drain_interval_ms: default_drain_interval_ms(),
            queue_path: default_queue_path(),
            headers: default_headers(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Default tracing filter; RUST_LOG overrides it
    #[serde(default = "default_level")]
    pub level: String,
    /// Drop status records (tor 0x0002) after parse, before logging
    /// and delivery
    #[serde(default)]
    pub suppress_status: bool,
    /// Counter heartbeat interval
    #[serde(default = "default_status_interval_secs")]
    pub status_interval_secs: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            suppress_status: false,
            status_interval_secs: default_status_interval_secs(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_tcp_port() -> u16 {
    5403
}

fn default_udp_port() -> u16 {
    5303
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30000
}

fn default_backoff_factor() -> f64 {
    1.8
}

fn default_jitter_ratio() -> f64 {
    0.2
}

fn default_connect_timeout_ms() -> u64 {
    8000
}

fn default_post_path() -> String {
    "/".to_string()
}

fn default_method() -> String {
    "POST".to_string()
}

fn default_timeout_ms() -> u64 {
    8000
}

fn default_retries() -> u32 {
    5
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_retry_backoff_multiplier() -> f64 {
    2.0
}

fn default_drain_max_per_tick() -> usize {
    5
}

fn default_drain_interval_ms() -> u64 {
    30000
}

fn default_queue_path() -> String {
    "post-queue.json".to_string()
}

fn default_headers() -> HashMap<String, String> {
    HashMap::from([("Content-Type".to_string(), "application/json".to_string())])
}

fn default_level() -> String {
    "info".to_string()
}

fn default_status_interval_secs() -> u64 {
    60
}
