use anyhow::Context as _;
use tracing_subscriber::EnvFilter;

/// Used when `RUST_LOG` is unset; keeps the HTTP stack's connection chatter out of crawl logs.
const DEFAULT_FILTER: &str = "info,hyper_util=warn,reqwest=warn";

/// Installs the global stderr subscriber. stdout stays reserved for command output.
pub fn init() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(filter()?)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("initialize tracing subscriber: {err}"))?;

    Ok(())
}

fn filter() -> anyhow::Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .context("build log filter")
}
