//! orghub: GitHub organization configuration and project templates.
//!
//! # Usage
//!
//! ```text
//! orghub config get <path> [--default <json>]
//! orghub config show
//! orghub config validate [--section <name>] [--file <path>]
//! orghub config health [--json]
//! orghub org list [--json]
//! orghub org show <id> [--json]
//! orghub template list [--json]
//! orghub template apply [<id>] --repository <repo> --organization <org> [--json]
//! orghub watch
//! ```
//!
//! Global flags: `--config-dir`, `--env-dir`, `--env`, `--log-format text|json`.

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use commands::{
    config::ConfigCommand, org::OrgCommand, template::TemplateCommand, watch::WatchArgs,
};
use orghub_config::{paths, ConfigManager, ConfigOptions};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "orghub",
    version,
    about = "Resolve GitHub organization configuration and apply project templates",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Query and validate the resolved configuration.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Inspect organization profiles.
    Org {
        #[command(subcommand)]
        command: OrgCommand,
    },

    /// List and apply project templates.
    Template {
        #[command(subcommand)]
        command: TemplateCommand,
    },

    /// Load configuration with hot reload and log every change until ctrl-c.
    Watch(WatchArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Flags shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Configuration directory (default: ./config, else the user config dir).
    #[arg(long, global = true, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Directory holding .env files.
    #[arg(long, global = true, value_name = "DIR", default_value = ".")]
    pub env_dir: PathBuf,

    /// Active environment (default: APP_ENV, else development).
    #[arg(long = "env", global = true, value_name = "NAME")]
    pub environment: Option<String>,

    /// Log output format (logs go to stderr).
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl GlobalArgs {
    pub fn options(&self) -> ConfigOptions {
        let config_dir = self
            .config_dir
            .clone()
            .unwrap_or_else(paths::discover_config_dir);
        let mut options = ConfigOptions::new(config_dir).env_dir(&self.env_dir);
        if let Some(environment) = &self.environment {
            options = options.environment(environment);
        }
        options
    }

    /// Initialized manager without hot reload.
    pub fn manager(&self) -> Result<ConfigManager> {
        let options = self.options();
        let dir = options.config_dir.display().to_string();
        let manager = ConfigManager::new(options).context("failed to build configuration manager")?;
        manager
            .initialize()
            .with_context(|| format!("failed to load configuration from {dir}"))?;
        Ok(manager)
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = match cli.command {
        Commands::Watch(_) => "info",
        _ => "warn",
    };
    init_tracing(cli.global.log_format, default_level);

    match cli.command {
        Commands::Config { command } => commands::config::run(&cli.global, command),
        Commands::Org { command } => commands::org::run(&cli.global, command),
        Commands::Template { command } => commands::template::run(&cli.global, command),
        Commands::Watch(args) => args.run(&cli.global),
    }
}

fn init_tracing(format: LogFormat, default_level: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
