pub mod loader;
pub mod root;
pub mod types;

pub use loader::load_from_path;
pub use root::Config;
pub use types::{
    DecoderConfig, DefaultsConfig, LoggingConfig, Mode, PostConfig, ReconnectConfig,
};
