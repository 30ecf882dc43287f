//! CLI argument definitions for the Carelog application.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

/// Carelog: conversational patient feedback, analyzed into dashboard-ready ratings.
#[derive(Parser, Debug)]
#[command(name = "carelog", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Model provider (openai, anthropic, mock).
    #[arg(short = 'p', long = "provider")]
    pub provider: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > CARELOG_CONFIG env var > ~/.carelog/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("CARELOG_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the model provider.
    ///
    /// Priority: --provider flag > LLM_PROVIDER env var > config file value.
    pub fn resolve_provider(&self, config_provider: &str) -> String {
        self.provider_from(std::env::var("LLM_PROVIDER").ok(), config_provider)
    }

    fn provider_from(&self, env_provider: Option<String>, config_provider: &str) -> String {
        if let Some(ref p) = self.provider {
            return p.clone();
        }
        match env_provider {
            Some(p) if !p.trim().is_empty() => p,
            _ => config_provider.to_string(),
        }
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".carelog").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".carelog").join("config.toml");
    }
    PathBuf::from("config.toml")
}
