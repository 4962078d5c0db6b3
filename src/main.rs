use clap::Parser;

use jobdesk_lib::bootstrap::config::resolve_config;
use jobdesk_lib::bootstrap::tracing::init_tracing_subscriber;
use jobdesk_lib::cli::{run, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = resolve_config(cli.config.as_deref())?;
    init_tracing_subscriber(&config.logging)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "jobdesk starting");

    let report = run(cli, config).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
