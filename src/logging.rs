//! Structured logging setup.
//!
//! Installs a `tracing_subscriber` registry with an [`EnvFilter`] and one
//! `fmt` layer, JSON for production and pretty-printed for development.
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: full filter directives, wins over everything below
//! - `OASBIND_LOG_LEVEL`: `trace`/`debug`/`info`/`warn`/`error` (default `info`)
//! - `OASBIND_LOG_FORMAT`: `json` (default) or `pretty`
//! - `OASBIND_LOG_ASYNC`: `true` to write through a background worker
//! - `OASBIND_LOG_TARGET_FILTER`: extra comma-separated directives
//! - `OASBIND_LOG_INCLUDE_LOCATION`: `true` to add file and line

use anyhow::{Context, Result};
use std::env;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// trace/debug/info/warn/error
    pub log_level: String,
    pub format: LogFormat,
    pub async_logging: bool,
    /// Extra filter directives (comma-separated)
    pub target_filter: Option<String>,
    /// Include file:line location (dev only)
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            async_logging: false,
            target_filter: None,
            include_location: false,
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name).ok().and_then(|s| s.parse().ok())
}

impl LogConfig {
    /// Parse configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            log_level: env::var("OASBIND_LOG_LEVEL").unwrap_or(defaults.log_level),
            format: env::var("OASBIND_LOG_FORMAT")
                .map(|s| LogFormat::parse(&s))
                .unwrap_or(defaults.format),
            async_logging: env_flag("OASBIND_LOG_ASYNC").unwrap_or(defaults.async_logging),
            target_filter: env::var("OASBIND_LOG_TARGET_FILTER").ok(),
            include_location: env_flag("OASBIND_LOG_INCLUDE_LOCATION")
                .unwrap_or(defaults.include_location),
        }
    }

    fn level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    fn env_filter(&self) -> Result<EnvFilter> {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level().as_str()));

        // Client disconnects are reported by may_minihttp at debug/info.
        filter = filter.add_directive(
            "may_minihttp::http_server=warn"
                .parse()
                .context("invalid built-in log directive")?,
        );

        if let Some(target_filter) = &self.target_filter {
            for directive in target_filter.split(',').map(str::trim).filter(|d| !d.is_empty()) {
                let parsed = directive
                    .parse()
                    .with_context(|| format!("invalid log filter directive `{directive}`"))?;
                filter = filter.add_directive(parsed);
            }
        }
        Ok(filter)
    }
}

/// Keeps the background log writer alive; drop it to flush on shutdown.
#[must_use = "dropping the guard stops asynchronous log output"]
pub struct LoggingGuard {
    _worker: Option<WorkerGuard>,
}

impl std::fmt::Debug for LoggingGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggingGuard")
            .field("async", &self._worker.is_some())
            .finish()
    }
}

fn fmt_layer<S, W>(config: &LogConfig, writer: W) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    W: for<'w> tracing_subscriber::fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails when a filter directive does not parse or a global subscriber is
/// already installed.
pub fn init_logging_with_config(config: &LogConfig) -> Result<LoggingGuard> {
    let registry = tracing_subscriber::registry().with(config.env_filter()?);

    if config.async_logging {
        let (writer, worker) = tracing_appender::non_blocking(std::io::stdout());
        registry
            .with(fmt_layer(config, writer))
            .try_init()
            .context("Failed to initialize async logging")?;
        Ok(LoggingGuard {
            _worker: Some(worker),
        })
    } else {
        registry
            .with(fmt_layer(config, std::io::stdout))
            .try_init()
            .context("Failed to initialize sync logging")?;
        Ok(LoggingGuard { _worker: None })
    }
}
