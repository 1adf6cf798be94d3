use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;
use multiboost_api::cli::{translate_report, Cli, Command};
use multiboost_api::{start_server, AppState, ServiceConfig};
use multiboost_protocol::{EnvironmentMap, FitVariant, Translator};
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ServiceConfig::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    init_logging(&config.log_level);

    match cli.command.clone().unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Translate { variant, file } => translate(&config, variant, &file),
    }
}

fn init_logging(level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn serve(config: ServiceConfig) -> Result<()> {
    if !Path::new(&config.regression_script).exists() {
        error!("Fit script not found at {}", config.regression_script);
        bail!("fit script not found at {}", config.regression_script);
    }

    info!("Starting MultiBoost fit service v{}", multiboost_api::VERSION);
    info!("Project root: {}", config.project_root);
    info!(
        "Data roots: {} (regression: {})",
        config.data_root, config.regression_data_root
    );

    let state = AppState::from_config(&config);
    start_server(state, &config.bind_address()).await
}

fn translate(config: &ServiceConfig, variant: FitVariant, file: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let document: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", file.display()))?;

    let translator =
        Translator::with_base_environment(config.translator_settings(), EnvironmentMap::new());
    let report = translate_report(&translator, &document, variant)
        .with_context(|| format!("failed to translate {}", file.display()))?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
