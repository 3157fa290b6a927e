mod cli;
mod run;

use anyhow::Context;
use clap::Parser;
use stegomark_client::ClientConfig;
use stegomark_logging::{stego_error, stego_info};

use crate::cli::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    stegomark_logging::initialize(cli.log_destination(), cli.log_level());

    let mut config = ClientConfig::from_env()?;
    if let Some(url) = &cli.api_url {
        config = config.with_base_url(url)?;
    }
    stego_info!("stegomark starting; api={}", config.base_url());

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    let outcome = run::execute(runtime.handle().clone(), config, cli.command);
    if let Err(err) = &outcome {
        stego_error!("{:#}", err);
    }
    outcome
}
