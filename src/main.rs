use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

use classroom::cli::{Cli, Command, ProgressCommand};
use classroom::config::SiteConfig;
use classroom::fetch::SiteClient;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    classroom::logging::init(classroom::logging::CLI_DEFAULT_FILTER).context("init logging")?;

    let cli = Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    let config = SiteConfig::resolve(&cli.site).context("resolve site config")?;
    let client = SiteClient::new(config)?;
    let format = cli.format;

    match cli.command {
        Command::Classes(args) => {
            classroom::classes::run(args, &client, format)
                .await
                .context("classes")?;
        }
        Command::Resources(args) => {
            classroom::resources::run(args, &client, format)
                .await
                .context("resources")?;
        }
        Command::Progress {
            command: ProgressCommand::Lookup(args),
        } => {
            classroom::progress::lookup(args, &client, format)
                .await
                .context("progress lookup")?;
        }
        Command::Progress {
            command: ProgressCommand::Resume(args),
        } => {
            classroom::progress::resume(args, &client, format)
                .await
                .context("progress resume")?;
        }
        Command::Progress {
            command: ProgressCommand::Clear,
        } => {
            classroom::progress::clear(&client)
                .await
                .context("progress clear")?;
        }
    }

    Ok(())
}
