pub mod apply;
pub mod init;
pub mod plan;
pub mod show;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use keel_core::{desired, settings, DesiredState, ProjectId, Settings};
use keel_reconcile::{store, ComponentRegistry, MemoryGateway, Reconciler, StateDocument};

pub(crate) fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}

/// `--state` if given, else `~/.keel/state/<project>.json`.
pub(crate) fn state_path(explicit: Option<PathBuf>, project: &ProjectId) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => Ok(store::store_path_at(&home_dir()?, project)),
    }
}

pub(crate) fn load_settings() -> Result<Settings> {
    let home = home_dir()?;
    settings::load_at(&home).with_context(|| {
        format!(
            "failed to load {}",
            settings::config_path_at(&home).display()
        )
    })
}

pub(crate) fn load_desired(path: &Path) -> Result<DesiredState> {
    desired::load_desired(path)
        .with_context(|| format!("failed to load desired state '{}'", path.display()))
}

/// Load the recorded document and wrap it in a reconciler.
pub(crate) fn open(
    path: &Path,
    project: &ProjectId,
    settings: &Settings,
) -> Result<Reconciler<MemoryGateway>> {
    let doc = store::load(path, project)
        .with_context(|| format!("failed to load state '{}'", path.display()))?;
    Ok(Reconciler::new(
        doc.to_gateway(),
        ComponentRegistry::standard(),
        settings,
    ))
}

pub(crate) fn persist(path: &Path, gateway: &MemoryGateway) -> Result<()> {
    store::save(path, &StateDocument::from_gateway(gateway))
        .with_context(|| format!("failed to save state '{}'", path.display()))
}

pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}
