//! `orghub template list|apply`

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use orghub_templates::{AppliedProjectConfig, ApplyContext};

use crate::GlobalArgs;

#[derive(Subcommand, Debug)]
pub enum TemplateCommand {
    /// List available project templates.
    List(ListArgs),

    /// Apply a template to a repository and print the resulting project.
    Apply(ApplyArgs),
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Template id. Defaults to the organization's configured template.
    pub id: Option<String>,

    /// Repository the project board is for.
    #[arg(long)]
    pub repository: String,

    /// Owning organization.
    #[arg(long)]
    pub organization: String,

    /// Emit the full applied configuration as JSON instead of the document.
    #[arg(long)]
    pub json: bool,
}

pub fn run(global: &GlobalArgs, command: TemplateCommand) -> Result<()> {
    match command {
        TemplateCommand::List(args) => list(global, args),
        TemplateCommand::Apply(args) => apply(global, args),
    }
}

#[derive(Tabled)]
struct TemplateTableRow {
    #[tabled(rename = "id")]
    id: String,
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "organization type")]
    organization_type: String,
    #[tabled(rename = "description")]
    description: String,
}

fn list(global: &GlobalArgs, args: ListArgs) -> Result<()> {
    let catalog = global.manager()?.templates()?;
    let summaries = catalog
        .get_available_templates()
        .context("failed to list templates")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summaries).context("failed to serialize templates")?
        );
        return Ok(());
    }

    let rows: Vec<TemplateTableRow> = summaries
        .into_iter()
        .map(|s| TemplateTableRow {
            id: s.id.to_string(),
            name: s.name,
            organization_type: s.organization_type.to_string(),
            description: s.description,
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

fn apply(global: &GlobalArgs, args: ApplyArgs) -> Result<()> {
    if args.repository.trim().is_empty() || args.organization.trim().is_empty() {
        bail!("--repository and --organization must not be empty");
    }

    let manager = global.manager()?;
    let id = match args.id {
        Some(id) => id,
        None => manager
            .project_template_for(&args.organization)
            .with_context(|| format!("no template configured for '{}'", args.organization))?,
    };

    let ctx = ApplyContext::for_repository(&args.repository, &args.organization);
    let applied = manager
        .templates()?
        .apply_template(&id, &ctx)
        .with_context(|| format!("failed to apply template '{id}'"))?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&applied).context("failed to serialize project")?
        );
        return Ok(());
    }

    print_summary(&applied);
    print!("{}", applied.document);
    if !applied.document.ends_with('\n') {
        println!();
    }
    Ok(())
}

fn print_summary(applied: &AppliedProjectConfig) {
    eprintln!(
        "{} {} {}",
        "applied".green().bold(),
        applied.template_id,
        format!(
            "({} fields, {} views)",
            applied.fields.len(),
            applied.views.len()
        )
        .bright_black()
    );
}
