use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::error::{BridgeError, Result};

pub fn load_from_path<P: AsRef<Path>>(p: P) -> Result<Config> {
    let txt = fs::read_to_string(p)
        .map_err(|e| BridgeError::Config(format!("Failed to read config file: {e}")))?;
    let cfg: Config = toml::from_str(&txt)
        .map_err(|e| BridgeError::Config(format!("Failed to parse config: {e}")))?;

    validate_config(&cfg)?;

    Ok(cfg)
}

/// Startup validation. A syntactically invalid base URL or method is
/// fatal here; everything later in the pipeline is non-fatal.
pub fn validate_config(cfg: &Config) -> Result<()> {
    if cfg.post.enabled {
        let base: reqwest::Url = cfg
            .post
            .base_url
            .parse()
            .map_err(|e| BridgeError::Config(format!("Invalid post.baseUrl: {e}")))?;
        base.join(&cfg.post.path)
            .map_err(|e| BridgeError::Config(format!("Invalid post.path: {e}")))?;
        reqwest::Method::from_bytes(cfg.post.method.as_bytes())
            .map_err(|_| BridgeError::Config(format!("Invalid post.method: {}", cfg.post.method)))?;
    }

    if cfg.decoder.reconnect.backoff_factor < 1.0 {
        return Err(BridgeError::Config(
            "decoder.reconnect.backoffFactor must be >= 1.0".to_string(),
        ));
    }
    if !(0.0..1.0).contains(&cfg.decoder.reconnect.jitter_ratio) {
        return Err(BridgeError::Config(
            "decoder.reconnect.jitterRatio must be in [0, 1)".to_string(),
        ));
    }

    Ok(())
}
