//! crmbridge — form submission to CRM bridge.
//!
//! Validates inbound form submissions and creates the matching company,
//! child organization, contact and deal records in the CRM.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
