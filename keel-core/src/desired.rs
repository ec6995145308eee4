//! Desired-state documents.
//!
//! A desired state is a YAML document shaped like [`ProjectSnapshot`]:
//!
//! ```yaml
//! core:
//!   id: payments
//! components:
//!   namespace_isolation:
//!     shape: simple
//!     value: payments
//!   mesh:
//!     shape: singleton
//!     control_plane: cp-a
//!     role_bindings:
//!       - role: mesh-admin
//!         groups: [platform]
//! ```

use std::path::Path;

use crate::error::ConfigError;
use crate::types::DesiredState;

/// Load a desired state from a YAML file.
///
/// Returns `ConfigError::NotFound` if absent and `ConfigError::Parse` (with
/// path and serde_yaml line context) if malformed.
pub fn load_desired(path: &Path) -> Result<DesiredState, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path)?;
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Render a desired state back to YAML.
pub fn to_yaml(state: &DesiredState) -> Result<String, ConfigError> {
    Ok(serde_yaml::to_string(state)?)
}
