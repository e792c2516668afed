mod config;
mod logging;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use api_gateway::{ApiGateway, InMemoryRecordIndex, RecordIndex};
use clap::Parser;
use token_authz::TokenAuthzModule;
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Data-exchange server: token-authorized search, publish and download.
#[derive(Debug, Parser)]
#[command(name = "exchange-server", version, about)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = AppConfig::load(cli.config.as_deref())?;

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&cfg)?);
        return Ok(());
    }

    logging::init(&cfg.logging)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting exchange-server");

    let authz = TokenAuthzModule::init(&cfg.token_authz)?;
    let index: Arc<dyn RecordIndex> = Arc::new(InMemoryRecordIndex::new());
    let gateway = ApiGateway::new(cfg.api_gateway, authz.client(), index).with_static_roots(
        authz.consumer_root().to_path_buf(),
        authz.provider_root().join("public"),
    );

    let cancel = CancellationToken::new();
    let mut server = tokio::spawn(Arc::new(gateway).serve(cancel.clone()));

    tokio::select! {
        res = &mut server => {
            return res?;
        }
        res = tokio::signal::ctrl_c() => {
            res?;
            tracing::info!("shutdown signal received");
        }
    }

    cancel.cancel();
    server.await??;
    tracing::info!("exchange-server stopped");
    Ok(())
}
