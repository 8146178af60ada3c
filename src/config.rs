//! Configuration module for the echo-back server.
//!
//! Supports both command-line arguments and a TOML configuration file.
//! CLI arguments take precedence over config file values. The port
//! defaults to 8080; address selection defaults to the interactive
//! per-candidate prompt unless an explicit bind address or `--auto` is
//! given.

use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::path::PathBuf;

/// Preferred address family for interface selection.
#[derive(ValueEnum, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FamilyPref {
    /// Only consider IPv4 interface addresses
    V4,
    /// Only consider IPv6 interface addresses
    V6,
}

/// Command-line arguments for the echo-back server
#[derive(Parser, Debug)]
#[command(name = "echoback")]
#[command(version = "0.1.0")]
#[command(about = "A minimal sequential TCP echo-back server", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Explicit numeric bind address (skips interface selection)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Restrict interface selection to one address family
    #[arg(long, value_enum)]
    pub family: Option<FamilyPref>,

    /// Pick the first candidate address instead of prompting
    #[arg(long)]
    pub auto: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Explicit bind address
    pub bind: Option<String>,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Preferred address family
    pub family: Option<FamilyPref>,
    /// Auto-select the first candidate address
    #[serde(default)]
    pub auto: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: None,
            port: default_port(),
            family: None,
            auto: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: Option<String>,
    pub port: u16,
    pub family: Option<FamilyPref>,
    pub auto: bool,
    pub log_level: String,
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        let cli = CliArgs::parse();
        Self::resolve(cli)
    }

    fn resolve(cli: CliArgs) -> Result<Self, ConfigError> {
        // Load TOML config if specified
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        // Merge CLI args with TOML config (CLI takes precedence)
        Ok(Config {
            bind: cli.bind.or(toml_config.server.bind),
            port: cli.port.unwrap_or(toml_config.server.port),
            family: cli.family.or(toml_config.server.family),
            auto: cli.auto || toml_config.server.auto,
            log_level: if cli.log_level != "info" {
                cli.log_level
            } else {
                toml_config.logging.level
            },
        })
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileRead(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::TomlParse(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TomlConfig::default();
        assert_eq!(config.server.bind, None);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.family, None);
        assert!(!config.server.auto);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            [server]
            bind = "192.168.1.7"
            port = 9090
            family = "v4"
            auto = true

            [logging]
            level = "debug"
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.bind.as_deref(), Some("192.168.1.7"));
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.family, Some(FamilyPref::V4));
        assert!(config.server.auto);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_cli_takes_precedence_over_toml() {
        let cli = CliArgs {
            config: None,
            bind: Some("10.0.0.3".to_string()),
            port: Some(8081),
            family: Some(FamilyPref::V6),
            auto: true,
            log_level: "warn".to_string(),
        };

        let config = Config::resolve(cli).unwrap();
        assert_eq!(config.bind.as_deref(), Some("10.0.0.3"));
        assert_eq!(config.port, 8081);
        assert_eq!(config.family, Some(FamilyPref::V6));
        assert!(config.auto);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_defaults_without_file_or_flags() {
        let cli = CliArgs {
            config: None,
            bind: None,
            port: None,
            family: None,
            auto: false,
            log_level: "info".to_string(),
        };

        let config = Config::resolve(cli).unwrap();
        assert_eq!(config.bind, None);
        assert_eq!(config.port, 8080);
        assert_eq!(config.family, None);
        assert!(!config.auto);
        assert_eq!(config.log_level, "info");
    }
}
