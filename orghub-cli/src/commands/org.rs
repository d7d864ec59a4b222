//! `orghub org list|show`: organization profiles as resolved by the config tree.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use orghub_core::OrganizationProfile;

use crate::GlobalArgs;

#[derive(Subcommand, Debug)]
pub enum OrgCommand {
    /// List every configured organization.
    List(ListArgs),

    /// Show one organization (unknown ids resolve to the fallback profile).
    Show(ShowArgs),
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Organization id, e.g. `DevBusinessHub`.
    pub id: String,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run(global: &GlobalArgs, command: OrgCommand) -> Result<()> {
    match command {
        OrgCommand::List(args) => list(global, args),
        OrgCommand::Show(args) => show(global, args),
    }
}

#[derive(Tabled)]
struct OrgTableRow {
    #[tabled(rename = "id")]
    id: String,
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "type")]
    org_type: String,
    #[tabled(rename = "security")]
    security: String,
    #[tabled(rename = "template")]
    template: String,
}

impl From<&OrganizationProfile> for OrgTableRow {
    fn from(org: &OrganizationProfile) -> Self {
        Self {
            id: org.id.to_string(),
            name: org.name.clone(),
            org_type: org.org_type.to_string(),
            security: org.settings.security_level.to_string(),
            template: org.settings.project_template.clone(),
        }
    }
}

#[derive(Serialize)]
struct OrgListJson<'a> {
    environment: String,
    organizations: &'a [OrganizationProfile],
}

fn list(global: &GlobalArgs, args: ListArgs) -> Result<()> {
    let manager = global.manager()?;
    let orgs = manager
        .organizations()
        .context("failed to read organizations from configuration")?;

    if args.json {
        let payload = OrgListJson {
            environment: manager.environment()?,
            organizations: &orgs,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&payload).context("failed to serialize organizations")?
        );
        return Ok(());
    }

    if orgs.is_empty() {
        println!("{}", "No organizations configured.".bright_black());
        return Ok(());
    }

    let rows: Vec<OrgTableRow> = orgs.iter().map(OrgTableRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

fn show(global: &GlobalArgs, args: ShowArgs) -> Result<()> {
    let manager = global.manager()?;
    let org = manager
        .get_organization_config(&args.id)
        .with_context(|| format!("failed to resolve organization '{}'", args.id))?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&org).context("failed to serialize organization")?
        );
        return Ok(());
    }

    println!("{} {}", org.name.bold(), format!("({})", org.id).bright_black());
    if !org.description.is_empty() {
        println!("{}", org.description);
    }
    println!();
    println!("  type             {}", org.org_type);
    println!("  security         {}", org.settings.security_level);
    println!("  template         {}", org.settings.project_template);
    println!("  approval         {}", yes_no(org.settings.approval_required));
    println!("  auto deployment  {}", yes_no(org.settings.auto_deployment));
    if !org.settings.quality_gates.is_empty() {
        println!("  quality gates    {}", org.settings.quality_gates.join(", "));
    }
    if !org.workflows.is_empty() {
        println!("  workflows        {}", org.workflows.join(", "));
    }

    if !org.project_fields.is_empty() {
        println!();
        println!("{}", "Fields".bold());
        for field in &org.project_fields {
            let options = field.option_names();
            if options.is_empty() {
                println!("  {} {}", field.name, format!("[{}]", field.field_type).bright_black());
            } else {
                println!(
                    "  {} {} {}",
                    field.name,
                    format!("[{}]", field.field_type).bright_black(),
                    options.join(" | ")
                );
            }
        }
    }

    if !org.project_views.is_empty() {
        println!();
        println!("{}", "Views".bold());
        for view in &org.project_views {
            match &view.group_by {
                Some(group) => println!("  {} ({}, by {group})", view.name, view.layout),
                None => println!("  {} ({})", view.name, view.layout),
            }
        }
    }
    Ok(())
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}
