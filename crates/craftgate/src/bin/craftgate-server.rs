//! `craftgate-server`: runs a Craftgate server from the command line.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use craftgate::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "craftgate-server")]
#[command(about = "Account, configuration and skin server for the Craftgate launcher")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:7000")]
    bind: String,

    /// Repository root (holds Users/, Skins/ and the configuration files)
    #[arg(long, default_value = "data")]
    root: PathBuf,

    /// Close connections that stay silent this long
    #[arg(long, default_value = "60")]
    idle_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), CraftgateError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let server = CraftgateServer::builder()
        .bind(&args.bind)
        .repository_root(args.root)
        .idle_timeout(Duration::from_secs(args.idle_timeout_secs))
        .build()
        .await?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "cannot listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("interrupted, shutting down");
        })
        .await
}
