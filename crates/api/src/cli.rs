//! Command-line surface of the `multiboost-api` binary

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use multiboost_protocol::{FitVariant, TranslateError, Translator};
use serde_json::{json, Value};

use crate::config::ServiceConfig;

#[derive(Parser, Debug)]
#[command(name = "multiboost-api")]
#[command(about = "MultiBoost regression and classification fit service")]
#[command(version)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Bind address
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Bind port
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the HTTP service (default)
    Serve,

    /// Print the invocation a configuration file translates to, without running it
    Translate {
        #[arg(long, default_value = "regression")]
        variant: FitVariant,

        /// JSON configuration, bare or wrapped as {"x": {...}}
        file: PathBuf,
    },
}

impl Cli {
    pub fn apply_overrides(&self, config: &mut ServiceConfig) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
    }
}

/// Arguments, environment and normalized parameters for `document`.
pub fn translate_report(
    translator: &Translator,
    document: &Value,
    variant: FitVariant,
) -> Result<Value, TranslateError> {
    let config = document
        .get("x")
        .filter(|x| x.is_object())
        .unwrap_or(document);
    let translation = translator.translate(config, variant)?;

    Ok(json!({
        "arguments": translation.invocation.argument_vector,
        "environment": translation.invocation.environment,
        "parameters": translation.parameters.to_config_object(),
    }))
}
