//! In-process [`RemoteGateway`].
//!
//! Holds one project's actual state in memory and applies mutations to it the
//! way the provider would. Every mutation call is logged, and faults can be
//! scripted per call kind, so tests can replay conflicts, terminal errors and
//! in-flight actions. The CLI uses it over the local state store.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use keel_core::{
    ActionRecord, ActionStatus, ActualState, Component, ComponentName, FullComponent,
    GatewayError, KeyedListComponent, KeyedMember, ProjectId, RoleBinding, SimpleComponent,
    SingletonComponent,
};

use crate::gateway::RemoteGateway;

/// The mutation a logged call performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    EnableSimple,
    DisableSimple,
    AddFull,
    DeleteFull,
    AddSingleton,
    DeleteSingleton,
    UpdateRoles,
    AddMember,
    DeleteMember,
}

impl CallKind {
    fn label(self) -> &'static str {
        match self {
            CallKind::EnableSimple => "enable_simple",
            CallKind::DisableSimple => "disable_simple",
            CallKind::AddFull => "add_full",
            CallKind::DeleteFull => "delete_full",
            CallKind::AddSingleton => "add_singleton",
            CallKind::DeleteSingleton => "delete_singleton",
            CallKind::UpdateRoles => "update_roles",
            CallKind::AddMember => "add_member",
            CallKind::DeleteMember => "delete_member",
        }
    }
}

/// One logged mutation call, successful or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayCall {
    pub kind: CallKind,
    pub component: ComponentName,
    pub key: Option<String>,
}

#[derive(Debug)]
struct MemoryState {
    actual: ActualState,
    last_action: ActionRecord,
    calls: Vec<GatewayCall>,
    faults: HashMap<CallKind, VecDeque<GatewayError>>,
    status_faults: VecDeque<GatewayError>,
    statuses: VecDeque<ActionStatus>,
    status_polls: usize,
}

#[derive(Debug)]
pub struct MemoryGateway {
    inner: Mutex<MemoryState>,
}

impl MemoryGateway {
    pub fn new(actual: ActualState) -> Self {
        Self::with_last_action(actual, ActionRecord::idle())
    }

    pub fn with_last_action(actual: ActualState, last_action: ActionRecord) -> Self {
        Self {
            inner: Mutex::new(MemoryState {
                actual,
                last_action,
                calls: Vec::new(),
                faults: HashMap::new(),
                status_faults: VecDeque::new(),
                statuses: VecDeque::new(),
                status_polls: 0,
            }),
        }
    }

    /// Current recorded state.
    pub fn snapshot(&self) -> ActualState {
        self.inner.lock().actual.clone()
    }

    /// Overwrite the recorded state, as an external writer would.
    pub fn set_actual(&self, actual: ActualState) {
        self.inner.lock().actual = actual;
    }

    pub fn last_action(&self) -> ActionRecord {
        self.inner.lock().last_action.clone()
    }

    /// Every mutation call so far, in order.
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.inner.lock().calls.clone()
    }

    pub fn calls_of(&self, kind: CallKind) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| c.kind == kind)
            .count()
    }

    pub fn status_polls(&self) -> usize {
        self.inner.lock().status_polls
    }

    /// Fail the next call of `kind` with `error`.
    pub fn fail_next(&self, kind: CallKind, error: GatewayError) {
        self.fail_times(kind, 1, error);
    }

    /// Fail the next `times` calls of `kind` with `error`.
    pub fn fail_times(&self, kind: CallKind, times: usize, error: GatewayError) {
        let mut state = self.inner.lock();
        let queue = state.faults.entry(kind).or_default();
        queue.extend(std::iter::repeat(error).take(times));
    }

    /// Fail the next status poll with `error`.
    pub fn fail_status_next(&self, error: GatewayError) {
        self.inner.lock().status_faults.push_back(error);
    }

    /// Statuses returned by the next polls, before falling back to the
    /// last recorded action.
    pub fn queue_statuses(&self, statuses: impl IntoIterator<Item = ActionStatus>) {
        self.inner.lock().statuses.extend(statuses);
    }

    fn mutate<F>(
        &self,
        project: &ProjectId,
        kind: CallKind,
        component: &ComponentName,
        key: Option<&str>,
        apply: F,
    ) -> Result<(), GatewayError>
    where
        F: FnOnce(&mut ActualState) -> Result<(), GatewayError>,
    {
        let mut state = self.inner.lock();
        state.calls.push(GatewayCall {
            kind,
            component: component.clone(),
            key: key.map(str::to_string),
        });
        if let Some(err) = state.faults.get_mut(&kind).and_then(VecDeque::pop_front) {
            return Err(err);
        }
        if state.actual.id() != project {
            return Err(GatewayError::NotFound(format!("project {project}")));
        }

        apply(&mut state.actual)?;
        state.last_action = ActionRecord {
            status: ActionStatus::Succeeded,
            action: Some(format!("{} {component}", kind.label())),
            updated_at: Utc::now(),
        };
        Ok(())
    }
}

#[async_trait]
impl RemoteGateway for MemoryGateway {
    async fn fetch_actual(&self, project: &ProjectId) -> Result<ActualState, GatewayError> {
        let state = self.inner.lock();
        if state.actual.id() != project {
            return Err(GatewayError::NotFound(format!("project {project}")));
        }
        Ok(state.actual.clone())
    }

    async fn fetch_last_action_status(
        &self,
        project: &ProjectId,
    ) -> Result<ActionStatus, GatewayError> {
        let mut state = self.inner.lock();
        state.status_polls += 1;
        if let Some(err) = state.status_faults.pop_front() {
            return Err(err);
        }
        if state.actual.id() != project {
            return Err(GatewayError::NotFound(format!("project {project}")));
        }
        let recorded = state.last_action.status;
        Ok(state.statuses.pop_front().unwrap_or(recorded))
    }

    async fn enable_simple(
        &self,
        project: &ProjectId,
        component: &ComponentName,
        value: &SimpleComponent,
    ) -> Result<(), GatewayError> {
        self.mutate(project, CallKind::EnableSimple, component, None, |actual| {
            actual
                .components
                .insert(component.clone(), Component::Simple(value.clone()));
            Ok(())
        })
    }

    async fn disable_simple(
        &self,
        project: &ProjectId,
        component: &ComponentName,
    ) -> Result<(), GatewayError> {
        self.mutate(project, CallKind::DisableSimple, component, None, |actual| {
            actual.components.remove(component);
            Ok(())
        })
    }

    async fn add_full(
        &self,
        project: &ProjectId,
        component: &ComponentName,
        value: &FullComponent,
    ) -> Result<(), GatewayError> {
        self.mutate(project, CallKind::AddFull, component, None, |actual| {
            actual
                .components
                .insert(component.clone(), Component::Full(value.clone()));
            Ok(())
        })
    }

    async fn delete_full(
        &self,
        project: &ProjectId,
        component: &ComponentName,
    ) -> Result<(), GatewayError> {
        self.mutate(project, CallKind::DeleteFull, component, None, |actual| {
            actual.components.remove(component);
            Ok(())
        })
    }

    async fn add_singleton(
        &self,
        project: &ProjectId,
        component: &ComponentName,
        value: &SingletonComponent,
    ) -> Result<(), GatewayError> {
        self.mutate(project, CallKind::AddSingleton, component, None, |actual| {
            match actual.components.get(component) {
                Some(Component::Singleton(existing))
                    if existing.control_plane != value.control_plane =>
                {
                    Err(GatewayError::Validation(format!(
                        "{component} is bound to control plane {}",
                        existing.control_plane
                    )))
                }
                _ => {
                    actual
                        .components
                        .insert(component.clone(), Component::Singleton(value.clone()));
                    Ok(())
                }
            }
        })
    }

    async fn delete_singleton(
        &self,
        project: &ProjectId,
        component: &ComponentName,
    ) -> Result<(), GatewayError> {
        self.mutate(project, CallKind::DeleteSingleton, component, None, |actual| {
            actual.components.remove(component);
            Ok(())
        })
    }

    async fn update_roles(
        &self,
        project: &ProjectId,
        component: &ComponentName,
        role_bindings: &[RoleBinding],
    ) -> Result<(), GatewayError> {
        self.mutate(project, CallKind::UpdateRoles, component, None, |actual| {
            match actual.components.get_mut(component) {
                Some(Component::Full(full)) => {
                    full.role_bindings = role_bindings.to_vec();
                    Ok(())
                }
                Some(Component::Singleton(mesh)) => {
                    mesh.role_bindings = role_bindings.to_vec();
                    Ok(())
                }
                Some(other) => Err(GatewayError::Validation(format!(
                    "{component} is {} and has no role bindings",
                    other.shape()
                ))),
                None => Err(GatewayError::NotFound(component.to_string())),
            }
        })
    }

    async fn add_member(
        &self,
        project: &ProjectId,
        component: &ComponentName,
        member: &KeyedMember,
    ) -> Result<(), GatewayError> {
        self.mutate(
            project,
            CallKind::AddMember,
            component,
            Some(&member.key),
            |actual| {
                let slot = actual
                    .components
                    .entry(component.clone())
                    .or_insert_with(|| Component::KeyedList(KeyedListComponent::default()));
                let Component::KeyedList(list) = slot else {
                    return Err(GatewayError::Validation(format!(
                        "{component} is not a keyed list"
                    )));
                };
                if list.member(&member.key).is_none() {
                    list.members.push(member.clone());
                }
                Ok(())
            },
        )
    }

    async fn delete_member(
        &self,
        project: &ProjectId,
        component: &ComponentName,
        key: &str,
    ) -> Result<(), GatewayError> {
        self.mutate(project, CallKind::DeleteMember, component, Some(key), |actual| {
            let emptied = match actual.components.get_mut(component) {
                Some(Component::KeyedList(list)) => {
                    list.members.retain(|m| m.key != key);
                    list.members.is_empty()
                }
                _ => false,
            };
            if emptied {
                actual.components.remove(component);
            }
            Ok(())
        })
    }
}
