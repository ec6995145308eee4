//! `keel init <project> [--state PATH] [--force]`

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use keel_core::ProjectId;
use keel_reconcile::{store, StateDocument};

/// Create an empty recorded state for a project.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Project identifier.
    pub project: String,

    /// State file to create (default: ~/.keel/state/<project>.json).
    #[arg(long)]
    pub state: Option<PathBuf>,

    /// Overwrite an existing state file.
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let project = ProjectId::from(self.project);
        let path = super::state_path(self.state, &project)?;
        if path.exists() && !self.force {
            bail!(
                "state for '{project}' already exists at {} (use --force to reset)",
                path.display()
            );
        }

        store::save(&path, &StateDocument::empty(&project))
            .with_context(|| format!("failed to init state for '{project}'"))?;

        println!("✓ Initialized '{project}'");
        println!("  Saved to: {}", path.display());
        Ok(())
    }
}
