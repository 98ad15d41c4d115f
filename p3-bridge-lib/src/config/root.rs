use serde::Deserialize;

use super::types::{DecoderConfig, DefaultsConfig, LoggingConfig, PostConfig};

/// Main configuration structure.
///
/// Keys are camelCase in the TOML file; unknown keys are ignored so a
/// config written for a newer bridge still loads.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Transport selection and decoder addresses
    #[serde(default)]
    pub defaults: DefaultsConfig,
    /// Decoder-side tuning (reconnect policy)
    #[serde(default)]
    pub decoder: DecoderConfig,
    /// HTTP delivery of parsed records
    #[serde(default)]
    pub post: PostConfig,
    /// Log level and record suppression
    #[serde(default)]
    pub logging: LoggingConfig,
}
