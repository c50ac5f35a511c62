//! Configuration management for formulad.
//!
//! Loads settings from a TOML file (explicit path, then /etc/formulad/config.toml)
//! or uses defaults, then applies environment overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Config file path
pub const CONFIG_PATH: &str = "/etc/formulad/config.toml";

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    formula_shared::DEFAULT_PORT
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.bind, self.port))
    }
}

/// External model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// When false every invocation fails fast and the static tier answers
    #[serde(default = "default_model_enabled")]
    pub enabled: bool,

    /// Model identifier passed to the model runner
    #[serde(default = "default_model")]
    pub model: String,

    /// Deadline for a single invocation in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Executable used to run the model
    #[serde(default = "default_command")]
    pub command: String,
}

fn default_model_enabled() -> bool {
    true
}

fn default_model() -> String {
    "phi3:mini".to_string()
}

fn default_timeout_ms() -> u64 {
    8_000
}

fn default_command() -> String {
    "ollama".to_string()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            enabled: default_model_enabled(),
            model: default_model(),
            timeout_ms: default_timeout_ms(),
            command: default_command(),
        }
    }
}

impl ModelConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Result cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Lifetime of a cached result
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Interval between expired-entry sweeps
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_ttl_secs() -> u64 {
    300
}

fn default_sweep_interval_secs() -> u64 {
    60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        // A zero interval would make tokio's interval panic.
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

/// Full daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

impl Config {
    /// Load config from the given path, or the system path, falling back to
    /// defaults. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            // An explicit path that cannot be read is an error, not a silent default.
            Some(path) => Self::load_from_path(path)?,
            None => Self::load_from_path(Path::new(CONFIG_PATH)).unwrap_or_else(|e| {
                warn!("Config not found, using defaults: {}", e);
                Config::default()
            }),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load config from specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply deployment overrides: OLLAMA_ENABLED, OLLAMA_MODEL, OLLAMA_TIMEOUT,
    /// PORT and FORMULAD_BIND.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(enabled) = lookup("OLLAMA_ENABLED") {
            // Anything but an explicit "false" keeps the model on.
            self.model.enabled = enabled.trim() != "false";
        }

        if let Some(model) = lookup("OLLAMA_MODEL").filter(|m| !m.trim().is_empty()) {
            self.model.model = model.trim().to_string();
        }

        if let Some(timeout) = lookup("OLLAMA_TIMEOUT") {
            match timeout.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => self.model.timeout_ms = ms,
                _ => warn!("Ignoring OLLAMA_TIMEOUT={:?}, keeping {}ms", timeout, self.model.timeout_ms),
            }
        }

        if let Some(port) = lookup("PORT") {
            match port.trim().parse::<u16>() {
                Ok(p) => self.server.port = p,
                Err(_) => warn!("Ignoring PORT={:?}", port),
            }
        }

        if let Some(bind) = lookup("FORMULAD_BIND").filter(|b| !b.trim().is_empty()) {
            self.server.bind = bind.trim().to_string();
        }
    }
}
