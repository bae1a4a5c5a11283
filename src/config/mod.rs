pub mod model;
pub mod nickname;

use anyhow::{bail, Context, Result};
use std::path::PathBuf;

pub use model::{
    AppConfig, ConnectionConfig, CtcpConfig, DccConfig, IdentityConfig, LoggingConfig,
    QuoteConfig, ServerConfig,
};

/// `QUIPBOT_CONFIG` overrides the default `<config_dir>/quipbot/config.toml`.
fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os("QUIPBOT_CONFIG") {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("quipbot")
        .join("config.toml")
}

pub fn load_config() -> Result<AppConfig> {
    let path = config_path();
    let config = if path.exists() {
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?
    } else {
        AppConfig::default()
    };
    finish(config)
}

/// Fill in generated values and reject configs the bot cannot run with.
fn finish(mut config: AppConfig) -> Result<AppConfig> {
    if config.servers.is_empty() {
        bail!("No servers configured");
    }
    if config.identity.nickname.trim().is_empty() {
        config.identity.nickname = nickname::generate_nickname();
    }
    config
        .logging
        .level
        .parse::<tracing::Level>()
        .with_context(|| format!("Invalid log level {:?}", config.logging.level))?;
    Ok(config)
}
