use clap::Parser;
use oasbind::bootstrap;
use oasbind::config::{Cli, ServerConfig};
use oasbind::logging::{init_logging_with_config, LogConfig};
use tracing::{error, info};

mod handlers;

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = ServerConfig::from_cli(&cli)?;
    let registry = handlers::registry()?;

    let server = bootstrap::start(&config, &registry)?;
    info!(
        title = %server.title,
        version = %server.version,
        addr = %server.handle.addr(),
        "Pet store ready"
    );
    server
        .handle
        .join()
        .map_err(|e| anyhow::anyhow!("server coroutine panicked: {e:?}"))
}

fn main() {
    let logging = match init_logging_with_config(&LogConfig::from_env()) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("failed to initialize logging: {e:#}");
            None
        }
    };

    if let Err(e) = run() {
        error!(error = %format!("{e:#}"), "Startup failed");
        drop(logging);
        std::process::exit(1);
    }
}
