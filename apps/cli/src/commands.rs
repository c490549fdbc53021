//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use crmbridge_core::{Bridge, BridgeResponse, Orchestrator};
use crmbridge_crm::CrmClient;
use crmbridge_server::AppState;
use crmbridge_shared::{AppConfig, init_config, load_api_key, load_config, load_config_from};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// crmbridge — turn form submissions into linked CRM records.
#[derive(Parser)]
#[command(
    name = "crmbridge",
    version,
    about = "Validate form submissions and create the matching CRM company, contact and deal.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.crmbridge/crmbridge.toml).
    #[arg(long, env = "CRMBRIDGE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Serve the submission endpoint over HTTP.
    Serve {
        /// Address to bind (overrides `server.bind`).
        #[arg(long)]
        bind: Option<String>,
    },

    /// Process a single submission read from a JSON file.
    Submit {
        /// Path to the submission JSON.
        file: PathBuf,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "crmbridge=info",
        1 => "crmbridge=debug",
        _ => "crmbridge=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Serve { bind } => cmd_serve(config_path, bind).await,
        Command::Submit { file } => cmd_submit(config_path, &file).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path).await,
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

/// Load the credential once and wire client, orchestrator and bridge together.
fn build_bridge(config: &AppConfig) -> Result<Bridge> {
    let api_key = load_api_key(config).unwrap_or_default();
    if api_key.is_empty() {
        // Startup continues; every CRM call will then fail authentication.
        warn!(
            env = %config.crm.api_key_env,
            "CRM credential missing, outbound calls will be rejected"
        );
    }

    let client = CrmClient::new(&config.crm, api_key)?;
    Ok(Bridge::new(Orchestrator::new(client)))
}

async fn cmd_serve(config_path: Option<&Path>, bind: Option<String>) -> Result<()> {
    let mut config = resolve_config(config_path)?;
    if let Some(bind) = bind {
        config.server.bind = bind;
    }

    let bridge = build_bridge(&config)?;
    info!(crm = %config.crm.base_url, "starting crmbridge server");

    crmbridge_server::serve(AppState::new(bridge), &config.server).await?;
    Ok(())
}

async fn cmd_submit(config_path: Option<&Path>, file: &Path) -> Result<()> {
    let config = resolve_config(config_path)?;
    let body = std::fs::read(file)
        .map_err(|e| eyre!("cannot read submission '{}': {e}", file.display()))?;

    let bridge = build_bridge(&config)?;
    let report = match bridge.process(&body).await {
        Ok(report) => report,
        Err(e) => {
            let response = BridgeResponse::from_error(&e);
            println!("{} {}", response.status, response.body);
            return Err(eyre!("submission failed with status {}", response.status));
        }
    };

    println!();
    println!("  Deal {} created successfully", report.deal_id());
    println!("  Submission: {}", report.submission_id);
    println!("  Company:    {}", report.parent_company.id);
    println!("  Child org:  {}", report.child_organization.id);
    println!("  Contact:    {}", report.contact.id);
    println!("  Time:       {:.1}s", report.elapsed.as_secs_f64());
    println!();
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
