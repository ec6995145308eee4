//! # keel-reconcile
//!
//! Diff-classify-and-apply engine for composite projects.
//!
//! [`Reconciler::reconcile`] fetches the actual state through a
//! [`RemoteGateway`], classifies each registered component into a
//! [`ChangeSet`], and applies it in order through the remote mutex guard and
//! retry governor, stopping at the first failure.

pub mod change;
pub mod diagnostics;
pub mod diff;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod guard;
pub mod memory;
pub mod reconciler;
pub mod registry;
pub mod retry;
pub mod store;

pub use change::{Change, ChangeOp, ChangeSet, OperationKind, Payload, Removal};
pub use diagnostics::{Diagnostic, Severity};
pub use dispatch::{ApplyFailure, DispatchOutcome, Dispatcher};
pub use error::{ReconcileError, StoreError};
pub use gateway::RemoteGateway;
pub use guard::RemoteMutexGuard;
pub use memory::{CallKind, GatewayCall, MemoryGateway};
pub use reconciler::{ReconcileReport, Reconciler};
pub use registry::{ComponentRegistry, ComponentSpec};
pub use retry::{RetryError, RetryPolicy};
pub use store::StateDocument;
