use anyhow::Context as _;

/// Default filter for the CLI when `RUST_LOG` is unset.
pub const CLI_DEFAULT_FILTER: &str = "info";

/// Default filter for the site server; request spans come from `tower_http`.
pub const SITE_DEFAULT_FILTER: &str = "info,tower_http=debug";

/// Logs go to stderr so rendered pages on stdout stay clean.
pub fn init(default_filter: &str) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(default_filter))
        .with_context(|| format!("build log filter from {default_filter:?}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("initialize tracing subscriber: {err}"))?;

    Ok(())
}
