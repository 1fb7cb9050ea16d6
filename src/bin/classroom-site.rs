use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;

use classroom::cli::SiteArgs;
use classroom::config::SiteConfig;
use classroom::fetch::SiteClient;
use classroom::site::{SiteState, router};

#[derive(Debug, Parser)]
#[command(author, version, about = "Serves the classroom pages as HTML")]
struct AppArgs {
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: SocketAddr,

    /// Static assets directory (serve if exists). Point `--base-url` here too to self-host data.
    #[arg(long)]
    static_dir: Option<PathBuf>,

    #[command(flatten)]
    site: SiteArgs,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return std::process::ExitCode::FAILURE;
    }
    std::process::ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    classroom::logging::init(classroom::logging::SITE_DEFAULT_FILTER)?;

    let args = AppArgs::parse();
    tracing::info!(?args, "starting classroom-site");

    let config = SiteConfig::resolve(&args.site).context("resolve site config")?;
    let client = SiteClient::new(config)?;
    let app = router(SiteState { client }, args.static_dir);

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .map_err(|err| anyhow::anyhow!("bind {}: {err}", args.addr))?;
    tracing::info!(addr = %args.addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}
