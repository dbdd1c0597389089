//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.parrot/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;

use crate::mock::MockConfig;

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ParrotConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub mock: MockSection,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GeneralConfig {
    pub server_url: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// Settings for the built-in server started with `--serve`.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct MockSection {
    pub port: Option<u16>,
    pub latency: Option<u64>,
    pub seed: Option<u64>,
    pub include_errors: Option<bool>,
    pub log_requests: Option<bool>,
    pub use_fixed_responses: Option<bool>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_MAX_TOKENS: u32 = 1000;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_PORT: u16 = 8080;

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub server_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub port: u16,
    pub mock: MockConfig,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns the path to `~/.parrot/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".parrot").join("config.toml"))
}

/// Load config from `~/.parrot/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `ParrotConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<ParrotConfig, ConfigError> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            warn!("Could not determine home directory, using default config");
            return Ok(ParrotConfig::default());
        }
    };

    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(&path);
        return Ok(ParrotConfig::default());
    }

    let contents = fs::read_to_string(&path).map_err(ConfigError::Io)?;
    let config: ParrotConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &PathBuf) {
    let default_content = r#"# Parrot Configuration
# All settings are optional — defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [general]
# server_url = "http://localhost:8080"  # Or set PARROT_SERVER_URL env var
# model = "gpt-3.5-turbo"               # Or set PARROT_MODEL env var
# max_tokens = 1000
# temperature = 0.7

# Settings for the built-in server (`parrot --serve`)
# [mock]
# port = 8080
# latency = 100                         # Base delay before replying, in ms
# seed = 12345                          # RNG seed, for reproducible replies
# include_errors = false                # Fail ~10% of requests
# log_requests = true
# use_fixed_responses = false           # Always pick the first canned reply
"#;

    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            warn!("Failed to create config directory: {}", e);
            return;
        }
    }
    if let Err(e) = fs::write(path, default_content) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
///
/// `cli_url` and `cli_port` come from CLI flags (None = not specified).
pub fn resolve(config: &ParrotConfig, cli_url: Option<&str>, cli_port: Option<u16>) -> ResolvedConfig {
    // Server URL: CLI → env → config → default
    let server_url = cli_url
        .map(|s| s.to_string())
        .or_else(|| std::env::var("PARROT_SERVER_URL").ok())
        .or_else(|| config.general.server_url.clone())
        .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());

    // Model: env → config → default
    let model = std::env::var("PARROT_MODEL")
        .ok()
        .or_else(|| config.general.model.clone())
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());

    let defaults = MockConfig::default();
    let mock = MockConfig {
        include_errors: config.mock.include_errors.unwrap_or(defaults.include_errors),
        latency: config.mock.latency.unwrap_or(defaults.latency),
        log_requests: config.mock.log_requests.unwrap_or(defaults.log_requests),
        seed: config.mock.seed.unwrap_or(defaults.seed),
        use_fixed_responses: config
            .mock
            .use_fixed_responses
            .unwrap_or(defaults.use_fixed_responses),
    };

    ResolvedConfig {
        server_url,
        model,
        max_tokens: config.general.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        temperature: config.general.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        port: cli_port.or(config.mock.port).unwrap_or(DEFAULT_PORT),
        mock,
    }
}
