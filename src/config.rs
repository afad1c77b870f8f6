//! # Configuration
//!
//! Three layers, highest priority first:
//!
//! 1. command-line flags (each with an `OASBIND_*` environment fallback)
//! 2. an optional YAML file given with `--config`
//! 3. built-in defaults
//!
//! ```yaml
//! spec: openapi/petstore.yaml
//! server:
//!   addr: 127.0.0.1:8080
//! binding:
//!   media_types: first
//!   strict_registry: true
//! ```
//!
//! Coroutine runtime settings come from the environment only, see
//! [`RuntimeConfig`].

use crate::binder::BindOptions;
use crate::schema::MediaTypePolicy;
use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_SPEC: &str = "openapi/petstore.yaml";
pub const DEFAULT_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_STACK_SIZE: usize = 0x8000;

#[derive(Debug, Clone, Default, Parser)]
#[command(name = "petstore")]
#[command(about = "Serve an OpenAPI description with registered handlers", long_about = None)]
pub struct Cli {
    /// OpenAPI description (YAML or JSON)
    #[arg(short, long, env = "OASBIND_SPEC")]
    pub spec: Option<PathBuf>,

    /// Listen address
    #[arg(short, long, env = "OASBIND_ADDR")]
    pub addr: Option<String>,

    /// YAML configuration file
    #[arg(short, long, env = "OASBIND_CONFIG")]
    pub config: Option<PathBuf>,

    /// How to pick a schema from a content map with several media types
    #[arg(long, value_enum, env = "OASBIND_MEDIA_TYPES")]
    pub media_types: Option<MediaTypePolicy>,

    /// Refuse to start when a handler matches no operation
    #[arg(long, env = "OASBIND_STRICT_REGISTRY")]
    pub strict_registry: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub spec: Option<PathBuf>,
    pub server: ServerSection,
    pub binding: BindingSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub addr: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BindingSection {
    pub media_types: Option<MediaTypePolicy>,
    pub strict_registry: Option<bool>,
}

impl FileConfig {
    /// # Errors
    ///
    /// Fails when the file cannot be read or is not a valid config document.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid config file {}", path.display()))
    }

    /// # Errors
    ///
    /// Fails on malformed YAML or unknown keys.
    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }
}

/// Fully resolved startup configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub spec: PathBuf,
    pub addr: String,
    pub bind: BindOptions,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            spec: PathBuf::from(DEFAULT_SPEC),
            addr: DEFAULT_ADDR.to_string(),
            bind: BindOptions::default(),
        }
    }
}

impl ServerConfig {
    /// Merge CLI flags over a config file over the defaults.
    #[must_use]
    pub fn resolve(cli: &Cli, file: &FileConfig) -> Self {
        let defaults = Self::default();
        Self {
            spec: cli
                .spec
                .clone()
                .or_else(|| file.spec.clone())
                .unwrap_or(defaults.spec),
            addr: cli
                .addr
                .clone()
                .or_else(|| file.server.addr.clone())
                .unwrap_or(defaults.addr),
            bind: BindOptions {
                media_types: cli
                    .media_types
                    .or(file.binding.media_types)
                    .unwrap_or(defaults.bind.media_types),
                strict_registry: cli.strict_registry
                    || file.binding.strict_registry.unwrap_or(defaults.bind.strict_registry),
            },
        }
    }

    /// Resolve from parsed flags, reading `--config` when given.
    ///
    /// # Errors
    ///
    /// Fails when the config file cannot be loaded.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Ok(Self::resolve(cli, &file))
    }
}

/// Coroutine runtime settings.
///
/// `OASBIND_STACK_SIZE` sets the stack size of request coroutines, in
/// decimal (`32768`) or hex (`0x8000`). Unparseable values fall back to the
/// default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub stack_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl RuntimeConfig {
    #[must_use]
    pub fn from_env() -> Self {
        env::var("OASBIND_STACK_SIZE")
            .ok()
            .and_then(|v| parse_size(&v))
            .map(|stack_size| Self { stack_size })
            .unwrap_or_default()
    }

    /// Apply to the global `may` runtime. Call before any coroutine starts.
    pub fn apply(&self) {
        may::config().set_stack_size(self.stack_size);
    }
}

fn parse_size(value: &str) -> Option<usize> {
    let value = value.trim();
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::resolve(&Cli::default(), &FileConfig::default());
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.addr, "0.0.0.0:3000");
        assert_eq!(config.bind.media_types, MediaTypePolicy::Single);
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = FileConfig::parse(
            "spec: api.json\nserver:\n  addr: 127.0.0.1:9000\nbinding:\n  media_types: first\n",
        )
        .unwrap();
        let cli = Cli {
            addr: Some("127.0.0.1:7000".to_string()),
            ..Cli::default()
        };
        let config = ServerConfig::resolve(&cli, &file);
        assert_eq!(config.addr, "127.0.0.1:7000");
        assert_eq!(config.spec, PathBuf::from("api.json"));
        assert_eq!(config.bind.media_types, MediaTypePolicy::First);
        assert!(!config.bind.strict_registry);
    }

    #[test]
    fn test_file_rejects_unknown_keys() {
        assert!(FileConfig::parse("server:\n  port: 80\n").is_err());
        assert_eq!(FileConfig::parse("  \n").unwrap(), FileConfig::default());
    }

    #[test]
    fn test_media_type_alias() {
        let file = FileConfig::parse("binding:\n  media_types: first-declared\n").unwrap();
        assert_eq!(file.binding.media_types, Some(MediaTypePolicy::First));
    }

    #[test]
    fn test_cli_parse() {
        let cli = Cli::try_parse_from([
            "petstore",
            "--spec",
            "x.yaml",
            "--media-types",
            "first",
            "--strict-registry",
        ])
        .unwrap();
        assert_eq!(cli.spec, Some(PathBuf::from("x.yaml")));
        assert_eq!(cli.media_types, Some(MediaTypePolicy::First));
        assert!(cli.strict_registry);
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("0x8000"), Some(0x8000));
        assert_eq!(parse_size("16384"), Some(16384));
        assert_eq!(parse_size("lots"), None);
    }
}
