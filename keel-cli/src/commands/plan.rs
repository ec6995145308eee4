//! `keel plan`: show the change set without applying it.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use keel_core::ProjectId;
use keel_reconcile::{ChangeSet, OperationKind};

/// Arguments for `keel plan`.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Desired-state YAML file.
    pub desired: PathBuf,

    /// Recorded state file (default: ~/.keel/state/<project>.json).
    #[arg(long)]
    pub state: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl PlanArgs {
    pub fn run(self) -> Result<()> {
        let desired = super::load_desired(&self.desired)?;
        let project = desired.id().clone();
        let settings = super::load_settings()?;
        let path = super::state_path(self.state, &project)?;
        let reconciler = super::open(&path, &project, &settings)?;

        let changes = super::runtime()?
            .block_on(reconciler.plan(&desired))
            .with_context(|| format!("failed to plan '{project}'"))?;

        if self.json {
            print_json(&project, &changes)?;
        } else {
            print_plan(&project, &changes, "");
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct PlanJson<'a> {
    project: &'a ProjectId,
    #[serde(flatten)]
    changes: &'a ChangeSet,
}

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "op")]
    op: String,
    #[tabled(rename = "subject")]
    subject: String,
    #[tabled(rename = "detail")]
    detail: String,
}

fn print_json(project: &ProjectId, changes: &ChangeSet) -> Result<()> {
    let payload = PlanJson { project, changes };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize plan JSON")?
    );
    Ok(())
}

/// Table view shared with `keel apply --dry-run`.
pub(crate) fn print_plan(project: &ProjectId, changes: &ChangeSet, prefix: &str) {
    for name in &changes.ignored {
        println!(
            "{prefix}{} '{name}' is recorded but not declared; leaving it alone",
            "!".yellow().bold()
        );
    }

    if changes.is_empty() {
        println!("{prefix}✓ '{project}' is in sync — nothing to do");
        return;
    }

    println!(
        "{prefix}Plan for '{project}' | {} {} add | {} {} remove | {} {} update",
        "■".green().bold(),
        changes.count(OperationKind::Add),
        "■".red().bold(),
        changes.count(OperationKind::Remove),
        "■".yellow().bold(),
        changes.count(OperationKind::Update),
    );

    let rows: Vec<PlanRow> = changes
        .iter()
        .enumerate()
        .map(|(i, change)| PlanRow {
            index: i + 1,
            op: change.kind().to_string(),
            subject: change.subject(),
            detail: change.to_string(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}
