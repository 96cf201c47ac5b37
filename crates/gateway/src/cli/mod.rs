pub mod config;
pub mod doctor;
pub mod run;

use clap::{Parser, Subcommand};

/// local-operator — an agentic AI gateway.
#[derive(Debug, Parser)]
#[command(name = "local-operator", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the gateway server (default when no subcommand is given).
    Serve,
    /// Run diagnostic checks against the current configuration.
    Doctor,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Send a single message to a fresh agent and print the response.
    Run {
        /// The message to send.
        message: String,
        /// Model override (defaults to `config.model`).
        #[arg(long)]
        model: Option<String>,
        /// Output the full response as JSON instead of plain text.
        #[arg(long)]
        json: bool,
    },
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any issues.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path specified by `LOP_CONFIG` (or
/// `config.toml` by default). Returns the parsed [`Config`] and the path
/// that was used. Shared by `serve`, `doctor`, and `config` subcommands.
pub fn load_config() -> anyhow::Result<(lop_domain::config::Config, String)> {
    let config_path = std::env::var("LOP_CONFIG").unwrap_or_else(|_| "config.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        lop_domain::config::Config::load(std::path::Path::new(&config_path))
            .map_err(|e| anyhow::anyhow!("loading {config_path}: {e}"))?
    } else {
        lop_domain::config::Config::default()
    };

    Ok((config, config_path))
}
