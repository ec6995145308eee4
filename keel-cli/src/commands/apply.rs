//! `keel apply`: converge the recorded state towards a desired-state file.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use tokio_util::sync::CancellationToken;

use keel_reconcile::{Diagnostic, ReconcileReport, Severity};

/// Arguments for `keel apply`.
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Desired-state YAML file.
    pub desired: PathBuf,

    /// Recorded state file (default: ~/.keel/state/<project>.json).
    #[arg(long)]
    pub state: Option<PathBuf>,

    /// Print the plan without applying it.
    #[arg(long)]
    pub dry_run: bool,
}

impl ApplyArgs {
    pub fn run(self) -> Result<()> {
        let desired = super::load_desired(&self.desired)?;
        let project = desired.id().clone();
        let settings = super::load_settings()?;
        let path = super::state_path(self.state, &project)?;
        let reconciler = super::open(&path, &project, &settings)?;
        let runtime = super::runtime()?;

        if self.dry_run {
            let changes = runtime
                .block_on(reconciler.plan(&desired))
                .with_context(|| format!("failed to plan '{project}'"))?;
            super::plan::print_plan(&project, &changes, "[dry-run] ");
            return Ok(());
        }

        let cancel = CancellationToken::new();
        let result = runtime.block_on(async {
            let trigger = cancel.clone();
            let signal = tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("received ctrl-c, cancelling");
                    trigger.cancel();
                }
            });
            let result = reconciler.reconcile(&desired, &cancel).await;
            signal.abort();
            result
        });

        // Whatever was applied stays applied, so record it even on failure.
        super::persist(&path, reconciler.gateway())?;

        let report = result.with_context(|| format!("failed to reconcile '{project}'"))?;
        print_report(&report);
        if let Some(failure) = &report.failure {
            bail!(
                "apply stopped at {} after {} change(s); re-run to continue",
                failure.change.subject(),
                report.applied.len()
            );
        }
        Ok(())
    }
}

fn print_report(report: &ReconcileReport) {
    for diagnostic in &report.diagnostics {
        println!("{} {}", marker(diagnostic), diagnostic);
    }
    if report.is_success() && !report.applied.is_empty() {
        println!(
            "✓ '{}' converged ({} change(s) applied)",
            report.project,
            report.applied.len()
        );
    }
}

fn marker(diagnostic: &Diagnostic) -> String {
    match diagnostic.severity {
        Severity::Info => "■".green().bold().to_string(),
        Severity::Warning => "■".yellow().bold().to_string(),
        Severity::Error => "■".red().bold().to_string(),
    }
}
