//! Local state store.
//!
//! Persists a project's recorded actual state as a `StateDocument` JSON file
//! at `<home>/.keel/state/<project>.json`, so the CLI can reconcile against a
//! local stand-in for the provider. Writes go to `<path>.tmp` and are renamed
//! into place.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use keel_core::{ActionRecord, ActualState, ProjectId, ProjectSnapshot};

use crate::error::{io_err, StoreError};
use crate::memory::MemoryGateway;

/// On-disk payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDocument {
    pub recorded_at: DateTime<Utc>,
    pub last_action: ActionRecord,
    pub state: ActualState,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StateDocumentCompat {
    Structured(StateDocument),
    // A bare snapshot, as written by `keel show --json`.
    Bare(ProjectSnapshot),
}

impl StateDocument {
    pub fn empty(project: &ProjectId) -> Self {
        Self {
            recorded_at: Utc::now(),
            last_action: ActionRecord::idle(),
            state: ProjectSnapshot::empty(project.clone()),
        }
    }

    /// A gateway serving this document's state.
    pub fn to_gateway(&self) -> MemoryGateway {
        MemoryGateway::with_last_action(self.state.clone(), self.last_action.clone())
    }

    /// Capture what a gateway currently records.
    pub fn from_gateway(gateway: &MemoryGateway) -> Self {
        Self {
            recorded_at: Utc::now(),
            last_action: gateway.last_action(),
            state: gateway.snapshot(),
        }
    }
}

/// `<home>/.keel/state/<project>.json`
pub fn store_path_at(home: &Path, project: &ProjectId) -> PathBuf {
    home.join(".keel")
        .join("state")
        .join(format!("{project}.json"))
}

/// Load the document at `path`.
///
/// Returns an empty document for `project` if the file does not yet exist.
pub fn load(path: &Path, project: &ProjectId) -> Result<StateDocument, StoreError> {
    if !path.exists() {
        return Ok(StateDocument::empty(project));
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    match serde_json::from_str::<StateDocumentCompat>(&contents)? {
        StateDocumentCompat::Structured(doc) => Ok(doc),
        StateDocumentCompat::Bare(state) => Ok(StateDocument {
            recorded_at: Utc::now(),
            last_action: ActionRecord::idle(),
            state,
        }),
    }
}

/// Save `doc` to `path` atomically.
pub fn save(path: &Path, doc: &StateDocument) -> Result<(), StoreError> {
    let Some(dir) = path.parent() else {
        return Err(io_err(path, std::io::Error::other("invalid state store path")));
    };
    if !dir.as_os_str().is_empty() {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }

    let json = serde_json::to_string_pretty(doc)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| io_err(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use keel_core::{ActionStatus, Component, SingletonComponent};
    use tempfile::TempDir;

    use super::*;

    fn project() -> ProjectId {
        ProjectId::from("payments")
    }

    #[test]
    fn empty_document_when_file_missing() {
        let tmp = TempDir::new().unwrap();
        let path = store_path_at(tmp.path(), &project());
        let doc = load(&path, &project()).unwrap();
        assert_eq!(doc.state, ProjectSnapshot::empty("payments"));
        assert_eq!(doc.last_action.status, ActionStatus::Idle);
    }

    #[test]
    fn save_then_load_keeps_state() {
        let tmp = TempDir::new().unwrap();
        let path = store_path_at(tmp.path(), &project());
        let mut doc = StateDocument::empty(&project());
        doc.state = doc.state.with_component(
            "mesh",
            Component::Singleton(SingletonComponent {
                control_plane: "cp-a".into(),
                role_bindings: vec![],
            }),
        );

        save(&path, &doc).unwrap();
        let loaded = load(&path, &project()).unwrap();

        assert_eq!(loaded, doc);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn bare_snapshot_file_is_accepted() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("payments.json");
        let bare = serde_json::to_string(&ProjectSnapshot::empty("payments")).unwrap();
        std::fs::write(&path, bare).unwrap();

        let doc = load(&path, &project()).unwrap();

        assert_eq!(doc.state.id(), &project());
    }

    #[test]
    fn garbage_is_a_json_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("payments.json");
        std::fs::write(&path, "not json").unwrap();

        let err = load(&path, &project()).unwrap_err();

        assert!(matches!(err, StoreError::Json(_)));
    }

    #[tokio::test]
    async fn gateway_roundtrip_keeps_last_action() {
        use crate::gateway::RemoteGateway;

        let doc = StateDocument::empty(&project());
        let gw = doc.to_gateway();
        gw.enable_simple(
            &project(),
            &"namespace_isolation".into(),
            &keel_core::SimpleComponent {
                value: "payments".into(),
            },
        )
        .await
        .unwrap();

        let after = StateDocument::from_gateway(&gw);

        assert_eq!(after.last_action.status, ActionStatus::Succeeded);
        assert_eq!(after.state.components.len(), 1);
    }
}
