//! dirmirror CLI Binary
//!
//! Serves a live mirror of a directory tree, or prints one snapshot.

use anyhow::Context;
use clap::Parser;
use dirmirror::cli::{Cli, Command};
use dirmirror::config::{AppConfig, ConfigLoader};
use dirmirror::hub::BroadcastHub;
use dirmirror::logging::{init_logging, LoggingConfig};
use dirmirror::root::RootManager;
use dirmirror::server::Server;
use dirmirror::tree::TreeBuilder;
use dirmirror::watch::ChangeWatcher;
use std::process;
use std::sync::Arc;
use tracing::{error, info, warn};

fn main() {
    let cli = Cli::parse();

    let logging_config = build_logging_config(&cli);
    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    };

    match execute(&cli, config) {
        Ok(Some(output)) => println!("{}", output),
        Ok(None) => {}
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let config = ConfigLoader::load(cli.config.as_deref())?;
    Ok(cli.apply_overrides(config)?)
}

/// Build logging configuration from CLI args and the config file.
/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let base = ConfigLoader::load(cli.config.as_deref())
        .ok()
        .map(|c| c.logging)
        .unwrap_or_default();
    cli.logging_config(base)
}

fn execute(cli: &Cli, config: AppConfig) -> anyhow::Result<Option<String>> {
    match &cli.command {
        Command::Serve { .. } => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("Failed to start async runtime")?;
            runtime.block_on(serve(config))?;
            Ok(None)
        }
        Command::Tree { pretty, .. } => {
            let builder = TreeBuilder::new().with_walker_config(config.walker_config());
            let snapshot = builder
                .snapshot(&config.root.default_root)
                .with_context(|| format!("Failed to read {}", config.root.default_root.display()))?;
            let json = if *pretty {
                serde_json::to_string_pretty(&snapshot)?
            } else {
                serde_json::to_string(&snapshot)?
            };
            Ok(Some(json))
        }
        Command::Config => Ok(Some(config.to_toml()?)),
    }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let hub = Arc::new(BroadcastHub::new());
    let builder = TreeBuilder::new().with_walker_config(config.walker_config());
    let watcher = ChangeWatcher::new(config.watch_config());
    let manager = RootManager::new(Arc::clone(&hub), builder, watcher, config.root_config());
    let (root, manager_task) = manager.spawn();

    match root.switch_root(&config.root.default_root).await {
        Ok(path) => info!(root = %path.display(), "Serving"),
        Err(e) => warn!(
            root = %config.root.default_root.display(),
            error = %e,
            "Starting without a root"
        ),
    }

    let server = Server::bind(
        &config.server.bind,
        Arc::clone(&hub),
        root.clone(),
        config.server.client_buffer,
    )
    .await?;
    info!(addr = %server.local_addr()?, clients = hub.len(), "WebSocket server ready");

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Ctrl-C handler unavailable");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    root.shutdown().await;
    let _ = manager_task.await;
    info!("Stopped");
    Ok(())
}
