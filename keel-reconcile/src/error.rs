//! Error types for keel-reconcile.

use std::path::PathBuf;

use thiserror::Error;

use keel_core::{ComponentName, GatewayError, Shape};

/// All errors that can stop a reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// Cancellation was requested. Never retried.
    #[error("reconciliation cancelled")]
    Cancelled,

    /// A provider call failed. Only the `Conflict` kind is ever retried.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// The provider kept reporting a conflict past the retry budget.
    #[error("retry budget exhausted after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: GatewayError,
    },

    /// The desired state names a component the registry does not declare.
    #[error("unknown component '{0}'")]
    UnknownComponent(ComponentName),

    /// A snapshot holds a component in a shape other than the declared one.
    #[error("component '{component}' is declared {expected} but holds {found}")]
    ShapeMismatch {
        component: ComponentName,
        expected: Shape,
        found: Shape,
    },

    /// A desired keyed list repeats a member key.
    #[error("component '{component}' lists member '{key}' more than once")]
    DuplicateMemberKey { component: ComponentName, key: String },
}

impl ReconcileError {
    /// The retry predicate used for every mutation.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ReconcileError::Gateway(err) if err.is_conflict())
    }

    /// Short kind label used in diagnostics.
    pub fn class(&self) -> &'static str {
        match self {
            ReconcileError::Cancelled => "cancelled",
            ReconcileError::Gateway(err) if err.is_conflict() => "conflict",
            ReconcileError::Exhausted { .. } => "exhausted",
            ReconcileError::Gateway(_) => "terminal",
            ReconcileError::UnknownComponent(_)
            | ReconcileError::ShapeMismatch { .. }
            | ReconcileError::DuplicateMemberKey { .. } => "validation",
        }
    }
}

/// Errors from the local state store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error.
    #[error("state store JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience constructor for [`StoreError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}
