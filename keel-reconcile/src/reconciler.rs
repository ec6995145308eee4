//! Reconciliation entry point shared by the CLI and embedders.

use tokio_util::sync::CancellationToken;

use keel_core::{DesiredState, ProjectId, Settings};

use crate::change::{Change, ChangeSet};
use crate::diagnostics::{Diagnostic, Severity};
use crate::diff;
use crate::dispatch::{ApplyFailure, Dispatcher};
use crate::error::ReconcileError;
use crate::gateway::RemoteGateway;
use crate::registry::ComponentRegistry;

/// What one reconciliation run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub project: ProjectId,
    /// Changes applied, in order.
    pub applied: Vec<Change>,
    /// Changes left unattempted after a failure.
    pub pending: Vec<Change>,
    pub failure: Option<ApplyFailure>,
    /// Ordered, one entry per applied change plus warnings and the failure.
    pub diagnostics: Vec<Diagnostic>,
}

impl ReconcileReport {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }
}

/// Drives one project through plan and apply against an injected gateway.
pub struct Reconciler<G> {
    gateway: G,
    registry: ComponentRegistry,
    dispatcher: Dispatcher,
}

impl<G: RemoteGateway> Reconciler<G> {
    pub fn new(gateway: G, registry: ComponentRegistry, settings: &Settings) -> Self {
        Self::with_dispatcher(gateway, registry, Dispatcher::from_settings(settings))
    }

    pub fn with_dispatcher(gateway: G, registry: ComponentRegistry, dispatcher: Dispatcher) -> Self {
        Self {
            gateway,
            registry,
            dispatcher,
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn into_gateway(self) -> G {
        self.gateway
    }

    /// Fetch the actual state and compute the change set without applying it.
    pub async fn plan(&self, desired: &DesiredState) -> Result<ChangeSet, ReconcileError> {
        let actual = self.gateway.fetch_actual(desired.id()).await?;
        diff::plan(&self.registry, desired, &actual)
    }

    /// Converge the remote project towards `desired`.
    ///
    /// Errors raised before the first mutation (fetch, validation,
    /// cancellation) are returned as `Err`. Once dispatch starts the outcome
    /// is always a report; a failed change shows up in `failure`.
    pub async fn reconcile(
        &self,
        desired: &DesiredState,
        cancel: &CancellationToken,
    ) -> Result<ReconcileReport, ReconcileError> {
        let project = desired.id().clone();
        let changes = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ReconcileError::Cancelled),
            planned = self.plan(desired) => planned?,
        };
        tracing::info!(
            project = %project,
            changes = changes.len(),
            ignored = changes.ignored.len(),
            "planned",
        );

        let mut diagnostics: Vec<Diagnostic> = changes
            .ignored
            .iter()
            .map(|name| {
                Diagnostic::new(
                    Severity::Warning,
                    name.to_string(),
                    "recorded remotely but not declared; left untouched",
                )
            })
            .collect();

        if changes.is_empty() {
            diagnostics.push(Diagnostic::new(
                Severity::Info,
                project.to_string(),
                "already in sync",
            ));
            return Ok(ReconcileReport {
                project,
                applied: Vec::new(),
                pending: Vec::new(),
                failure: None,
                diagnostics,
            });
        }

        let outcome = self
            .dispatcher
            .apply(&self.gateway, &project, &changes, cancel)
            .await;

        diagnostics.extend(outcome.applied.iter().map(Diagnostic::applied));
        let pending = match &outcome.failure {
            Some(failure) => {
                diagnostics.push(Diagnostic::failed(failure));
                let done = outcome.applied.len() + 1;
                changes.changes[done.min(changes.len())..].to_vec()
            }
            None => Vec::new(),
        };
        if !pending.is_empty() {
            diagnostics.push(Diagnostic::new(
                Severity::Warning,
                project.to_string(),
                format!("{} change(s) not attempted; re-run to continue", pending.len()),
            ));
        }

        Ok(ReconcileReport {
            project,
            applied: outcome.applied,
            pending,
            failure: outcome.failure,
            diagnostics,
        })
    }
}
