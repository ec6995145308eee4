//! Apply dispatcher.
//!
//! Turns each [`Change`] into one gateway call and runs the calls strictly in
//! change-set order. Every call goes through the remote mutex guard and the
//! retry governor; the first failure stops the run.

use tokio_util::sync::CancellationToken;

use keel_core::{ProjectId, Settings};

use crate::change::{Change, ChangeOp, ChangeSet, OperationKind, Payload, Removal};
use crate::error::ReconcileError;
use crate::gateway::RemoteGateway;
use crate::guard::RemoteMutexGuard;
use crate::retry::{self, RetryError, RetryPolicy};

/// The change that stopped a run, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyFailure {
    pub change: Change,
    pub error: ReconcileError,
}

impl ApplyFailure {
    pub fn kind(&self) -> OperationKind {
        self.change.kind()
    }
}

/// Result of dispatching a change set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Changes the provider accepted, in order.
    pub applied: Vec<Change>,
    /// Set when a change failed; later changes were not attempted.
    pub failure: Option<ApplyFailure>,
}

impl DispatchOutcome {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Dispatcher {
    guard: RemoteMutexGuard,
    mutate: RetryPolicy,
    delete: RetryPolicy,
}

impl Dispatcher {
    pub fn new(guard: RemoteMutexGuard, mutate: RetryPolicy, delete: RetryPolicy) -> Self {
        Self {
            guard,
            mutate,
            delete,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            RemoteMutexGuard::from_settings(settings),
            RetryPolicy::mutate(settings),
            RetryPolicy::delete(settings),
        )
    }

    /// Policy a change runs under. Deletes back off longer.
    pub fn policy_for(&self, change: &Change) -> RetryPolicy {
        match change.kind() {
            OperationKind::Remove => self.delete,
            OperationKind::Add | OperationKind::Update => self.mutate,
        }
    }

    /// Apply `changes` in order, stopping at the first failure.
    pub async fn apply<G>(
        &self,
        gateway: &G,
        project: &ProjectId,
        changes: &ChangeSet,
        cancel: &CancellationToken,
    ) -> DispatchOutcome
    where
        G: RemoteGateway + ?Sized,
    {
        let mut outcome = DispatchOutcome::default();
        for change in changes {
            match self.apply_one(gateway, project, change, cancel).await {
                Ok(()) => {
                    tracing::info!(project = %project, change = %change, "applied");
                    outcome.applied.push(change.clone());
                }
                Err(error) => {
                    tracing::error!(
                        project = %project,
                        change = %change,
                        class = error.class(),
                        error = %error,
                        "apply failed; stopping",
                    );
                    outcome.failure = Some(ApplyFailure {
                        change: change.clone(),
                        error,
                    });
                    break;
                }
            }
        }
        outcome
    }

    /// Apply a single change: wait for the project to go idle, then issue
    /// the call, retrying both on conflict.
    pub async fn apply_one<G>(
        &self,
        gateway: &G,
        project: &ProjectId,
        change: &Change,
        cancel: &CancellationToken,
    ) -> Result<(), ReconcileError>
    where
        G: RemoteGateway + ?Sized,
    {
        let result = retry::attempt(
            self.policy_for(change),
            cancel,
            || async move {
                self.guard.wait_until_idle(gateway, project, cancel).await?;
                issue(gateway, project, change).await
            },
            ReconcileError::is_conflict,
        )
        .await;

        match result {
            Ok(()) => Ok(()),
            Err(RetryError::Cancelled) => Err(ReconcileError::Cancelled),
            Err(RetryError::Terminal(err)) => Err(err),
            Err(RetryError::Exhausted { attempts, last }) => match last {
                ReconcileError::Gateway(source) => Err(ReconcileError::Exhausted { attempts, source }),
                other => Err(other),
            },
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Map a change to its gateway call.
async fn issue<G>(gateway: &G, project: &ProjectId, change: &Change) -> Result<(), ReconcileError>
where
    G: RemoteGateway + ?Sized,
{
    let component = &change.component;
    match &change.op {
        ChangeOp::Add(Payload::Simple(value)) => {
            gateway.enable_simple(project, component, value).await?
        }
        ChangeOp::Add(Payload::Full(value)) => gateway.add_full(project, component, value).await?,
        ChangeOp::Add(Payload::Singleton(value)) => {
            gateway.add_singleton(project, component, value).await?
        }
        ChangeOp::Add(Payload::Member(member)) => {
            gateway.add_member(project, component, member).await?
        }
        ChangeOp::Remove(Removal::Simple) => gateway.disable_simple(project, component).await?,
        ChangeOp::Remove(Removal::Full) => gateway.delete_full(project, component).await?,
        ChangeOp::Remove(Removal::Singleton) => {
            gateway.delete_singleton(project, component).await?
        }
        ChangeOp::Remove(Removal::Member { key }) => {
            gateway.delete_member(project, component, key).await?
        }
        ChangeOp::UpdateRoles { role_bindings, .. } => {
            gateway.update_roles(project, component, role_bindings).await?
        }
    }
    Ok(())
}
