//! `keel show <project>`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use keel_core::{Component, ProjectId};
use keel_reconcile::{store, StateDocument};

/// Arguments for `keel show`.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Project identifier.
    pub project: String,

    /// Recorded state file (default: ~/.keel/state/<project>.json).
    #[arg(long)]
    pub state: Option<PathBuf>,

    /// Emit the recorded snapshot as JSON.
    #[arg(long)]
    pub json: bool,
}

impl ShowArgs {
    pub fn run(self) -> Result<()> {
        let project = ProjectId::from(self.project);
        let path = super::state_path(self.state, &project)?;
        if !path.exists() {
            anyhow::bail!(
                "no recorded state for '{project}' at {} (run `keel init {project}` first)",
                path.display()
            );
        }
        let doc = store::load(&path, &project)
            .with_context(|| format!("failed to load state '{}'", path.display()))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&doc.state)
                    .context("failed to serialize state JSON")?
            );
            return Ok(());
        }
        print_table(&doc);
        Ok(())
    }
}

#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "component")]
    name: String,
    #[tabled(rename = "shape")]
    shape: String,
    #[tabled(rename = "detail")]
    detail: String,
}

fn print_table(doc: &StateDocument) {
    let last = match &doc.last_action.action {
        Some(action) => format!("{} ({action})", doc.last_action.status),
        None => doc.last_action.status.to_string(),
    };
    println!(
        "{} | recorded {} | last action: {last}",
        doc.state.id().to_string().bold(),
        doc.recorded_at.format("%Y-%m-%d %H:%M:%S UTC"),
    );

    let rows: Vec<ComponentRow> = doc
        .state
        .components
        .iter()
        .filter_map(|(name, component)| {
            component.normalized().map(|c| ComponentRow {
                name: name.to_string(),
                shape: c.shape().to_string(),
                detail: detail(c),
            })
        })
        .collect();
    if rows.is_empty() {
        println!("No components recorded.");
        return;
    }
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

fn detail(component: &Component) -> String {
    match component {
        Component::Simple(simple) => simple.value.clone(),
        Component::Full(full) => format!(
            "identity {}, {} role binding(s)",
            full.identity.as_deref().unwrap_or("-"),
            full.role_bindings.len()
        ),
        Component::Singleton(mesh) => format!(
            "control plane {}, {} role binding(s)",
            mesh.control_plane,
            mesh.role_bindings.len()
        ),
        Component::KeyedList(list) => list
            .members
            .iter()
            .map(|m| m.key.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    }
}
