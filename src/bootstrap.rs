//! # Bootstrap
//!
//! Startup as a sequence of fallible steps: load the description, bind its
//! operations into a fresh [`Router`], then start listening. Each step
//! returns an error instead of exiting, so the caller decides how to report
//! it and tests can run everything but the listener.
//!
//! ```rust,no_run
//! use oasbind::bootstrap;
//! use oasbind::config::ServerConfig;
//! use oasbind::registry::{HandlerRegistry, HandlerRequest, Reply};
//!
//! # fn main() -> anyhow::Result<()> {
//! let registry = HandlerRegistry::builder()
//!     .register("listPets", |_req: HandlerRequest| Reply::new().send(Vec::<u32>::new()))
//!     .build()?;
//! let server = bootstrap::start(&ServerConfig::default(), &registry)?;
//! server.handle.join().ok();
//! # Ok(())
//! # }
//! ```

use crate::binder::{BindReport, OperationBinder};
use crate::config::{RuntimeConfig, ServerConfig};
use crate::registry::HandlerRegistry;
use crate::router::Router;
use crate::server::{AppService, HttpServer, ServerHandle};
use crate::spec::{load_description, Description};
use anyhow::{Context, Result};
use tracing::info;

/// Everything built before the listener starts.
#[derive(Debug)]
pub struct Prepared {
    pub description: Description,
    pub router: Router,
    pub report: BindReport,
}

/// Load the configured description and bind it against `registry`.
///
/// # Errors
///
/// Fails when the description cannot be loaded or validated, declares no
/// paths, or any operation fails to bind.
pub fn prepare(config: &ServerConfig, registry: &HandlerRegistry) -> Result<Prepared> {
    let description = load_description(&config.spec)
        .with_context(|| format!("failed to load API description {}", config.spec.display()))?;
    prepare_description(description, config, registry)
}

/// [`prepare`] for an already loaded description.
///
/// # Errors
///
/// Fails when binding fails.
pub fn prepare_description(
    description: Description,
    config: &ServerConfig,
    registry: &HandlerRegistry,
) -> Result<Prepared> {
    info!(
        title = %description.info.title,
        version = %description.info.version,
        "API name / version"
    );
    let mut router = Router::new();
    let report = OperationBinder::new(&description, registry)
        .with_options(config.bind)
        .bind(&mut router)
        .context("failed to bind operations")?;
    Ok(Prepared {
        description,
        router,
        report,
    })
}

/// A listening server.
#[derive(Debug)]
pub struct RunningServer {
    pub handle: ServerHandle,
    pub report: BindReport,
    pub title: String,
    pub version: String,
}

/// Listen with an already bound router.
///
/// # Errors
///
/// Fails when the listen address cannot be bound.
pub fn serve(prepared: Prepared, addr: &str) -> Result<RunningServer> {
    RuntimeConfig::from_env().apply();
    let Prepared {
        description,
        router,
        report,
    } = prepared;
    let handle = HttpServer(AppService::new(router))
        .start(addr)
        .with_context(|| format!("failed to listen on {addr}"))?;
    info!(
        addr = %handle.addr(),
        routes = report.bound.len(),
        "Server is running"
    );
    Ok(RunningServer {
        handle,
        report,
        title: description.info.title,
        version: description.info.version,
    })
}

/// [`prepare`] then [`serve`] on the configured address.
///
/// # Errors
///
/// Any failure of the two steps.
pub fn start(config: &ServerConfig, registry: &HandlerRegistry) -> Result<RunningServer> {
    let prepared = prepare(config, registry)?;
    serve(prepared, &config.addr)
}
