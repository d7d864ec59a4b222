//! `orghub config get|show|validate|health`

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use serde_json::Value;
use tabled::{settings::Style, Table, Tabled};

use orghub_config::source::parse_document;
use orghub_config::{
    env, ConfigError, ConfigHealth, ConfigManager, SchemaValidator, Section, Validation,
    ValidationReport,
};

use crate::GlobalArgs;

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the value at a dotted path.
    Get(GetArgs),

    /// Print the whole resolved tree as JSON (secrets redacted).
    Show,

    /// Validate the resolved tree, one section of it, or a standalone file.
    Validate(ValidateArgs),

    /// Print manager health.
    Health(HealthArgs),
}

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Dotted path, e.g. `cache.ttl` or `organizations.DevBusinessHub.type`.
    pub path: String,

    /// Value printed when the path is missing (parsed as JSON, else a string).
    #[arg(long)]
    pub default: Option<String>,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Section schema: env, server, github, cache, logging, organization,
    /// projectTemplate, config.
    #[arg(long)]
    pub section: Option<String>,

    /// Validate this YAML/JSON file instead of the resolved tree.
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct HealthArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run(global: &GlobalArgs, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Get(args) => get(global, args),
        ConfigCommand::Show => show(global),
        ConfigCommand::Validate(args) => validate(global, args),
        ConfigCommand::Health(args) => health(global, args),
    }
}

fn get(global: &GlobalArgs, args: GetArgs) -> Result<()> {
    let manager = global.manager()?;
    let value = match (manager.get(&args.path)?, args.default) {
        (Some(value), _) => value,
        (None, Some(raw)) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
        (None, None) => bail!("no value at '{}'", args.path),
    };
    print_value(&redact(&args.path, value))
}

fn show(global: &GlobalArgs) -> Result<()> {
    let tree = global.manager()?.get_all()?.into_value();
    print_value(&redact("", tree))
}

fn validate(global: &GlobalArgs, args: ValidateArgs) -> Result<()> {
    let section: Section = args.section.as_deref().unwrap_or("config").parse()?;

    let result = match &args.file {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let value = parse_document(&contents, path)?;
            let validator = SchemaValidator::new()?;
            validator.validate_section(section, &value)
        }
        None => validate_resolved(global, section)?,
    };

    match result.error {
        None => {
            println!("{} {} is valid", "✓".green(), describe(section, args.file.as_ref()));
            Ok(())
        }
        Some(report) => fail(report),
    }
}

/// Resolve without load-time validation, then validate `section` of the tree.
fn validate_resolved(global: &GlobalArgs, section: Section) -> Result<Validation> {
    let options = global.options().validate_on_load(false);
    let manager = ConfigManager::new(options)?;
    match manager.initialize() {
        Ok(()) => {}
        // The env section is always validated while resolving.
        Err(ConfigError::Validation(report)) => return fail(report),
        Err(err) => return Err(err).context("failed to load configuration"),
    }
    let tree = manager.tree()?;
    let validator = manager.validator();

    let validation = match (section, section.tree_key()) {
        (_, Some(key)) => {
            let value = tree
                .section(key)
                .ok_or_else(|| anyhow!("section '{key}' is not present in the configuration"))?;
            validator.validate_section(section, value)
        }
        (Section::Organization | Section::ProjectTemplate, None) => {
            let prefix = match section {
                Section::Organization => "organizations.",
                _ => "projectTemplates.",
            };
            let mut full = validator.validate_section(Section::Config, tree.as_value());
            if let Some(report) = full.error.as_mut() {
                report.violations.retain(|v| v.path.starts_with(prefix));
                report.section = section.as_str().to_string();
            }
            if full.error.as_ref().is_some_and(ValidationReport::is_empty) {
                full.error = None;
            }
            full
        }
        (_, None) => validator.validate_section(Section::Config, tree.as_value()),
    };
    Ok(validation)
}

fn fail<T>(report: ValidationReport) -> Result<T> {
    eprintln!("{} {}", "✗".red(), report.to_string().red());
    Err(anyhow!("configuration is invalid ({} violation(s))", report.len()))
}

fn describe(section: Section, file: Option<&PathBuf>) -> String {
    match file {
        Some(path) => format!("{} (section {section})", path.display()),
        None => format!("section {section}"),
    }
}

fn health(global: &GlobalArgs, args: HealthArgs) -> Result<()> {
    let health = global.manager()?.get_health();
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&health).context("failed to serialize health JSON")?
        );
        return Ok(());
    }
    print_health(&health);
    Ok(())
}

#[derive(Tabled)]
struct HealthRow {
    #[tabled(rename = "check")]
    check: &'static str,
    #[tabled(rename = "value")]
    value: String,
}

fn print_health(health: &ConfigHealth) {
    let yes_no = |ok: bool| {
        if ok {
            "yes".green().to_string()
        } else {
            "no".red().to_string()
        }
    };
    let rows = vec![
        HealthRow {
            check: "initialized",
            value: yes_no(health.is_initialized),
        },
        HealthRow {
            check: "status",
            value: format!("{:?}", health.status).to_lowercase(),
        },
        HealthRow {
            check: "environment",
            value: health.environment.clone().unwrap_or_else(|| "-".into()),
        },
        HealthRow {
            check: "last load",
            value: health
                .last_load_time
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "never".into()),
        },
        HealthRow {
            check: "sections",
            value: health.config_sections.join(", "),
        },
        HealthRow {
            check: "watched files",
            value: health.watched_files.len().to_string(),
        },
        HealthRow {
            check: "organizations",
            value: yes_no(health.organizations_healthy),
        },
        HealthRow {
            check: "templates",
            value: yes_no(health.templates_healthy),
        },
        HealthRow {
            check: "uptime",
            value: format!("{}s", health.uptime_seconds),
        },
    ];
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

fn print_value(value: &Value) -> Result<()> {
    match value {
        Value::String(s) => println!("{s}"),
        other => println!(
            "{}",
            serde_json::to_string_pretty(other).context("failed to serialize value")?
        ),
    }
    Ok(())
}

/// Mask secret variables in an `env` subtree (or a single `env.KEY` value).
/// Mask secrets in `value`, the node found at `path`. The root carries the
/// `env` section as a child, so it is masked there too.
fn redact(path: &str, mut value: Value) -> Value {
    if path == "env" || path.starts_with("env.") {
        return redact_env_value(path, value);
    }
    if path.is_empty() {
        if let Some(env) = value.get_mut("env") {
            *env = redact_env_value("env", env.take());
        }
    }
    value
}

fn redact_env_value(path: &str, mut value: Value) -> Value {
    const MASK: &str = "[redacted]";
    if let Some(key) = path.strip_prefix("env.") {
        if env::is_secret(key) {
            return Value::String(MASK.into());
        }
        return value;
    }
    if let Some(vars) = value.as_object_mut() {
        for (key, v) in vars.iter_mut() {
            if env::is_secret(key) {
                *v = Value::String(MASK.into());
            }
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn root_and_env_paths_are_masked() {
        let tree = json!({
            "env": { "GITHUB_TOKEN": "ghp_secret", "PORT": 3000 },
            "server": { "port": 3000 },
        });
        let root = redact("", tree.clone());
        assert_eq!(root["env"]["GITHUB_TOKEN"], json!("[redacted]"));
        assert_eq!(root["env"]["PORT"], json!(3000));
        assert_eq!(root["server"], tree["server"]);

        let env = redact("env", tree["env"].clone());
        assert_eq!(env["GITHUB_TOKEN"], json!("[redacted]"));
        assert_eq!(redact("env.GITHUB_TOKEN", json!("ghp_secret")), json!("[redacted]"));
        assert_eq!(redact("env.PORT", json!(3000)), json!(3000));
    }

    #[test]
    fn other_paths_are_left_alone() {
        let node = json!({ "env": { "GITHUB_TOKEN": "kept" } });
        assert_eq!(redact("organizations.Acme", node.clone()), node);
    }
}
