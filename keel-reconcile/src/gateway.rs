//! Provider-facing capability trait.
//!
//! Everything the engine knows about the provider goes through
//! [`RemoteGateway`]. Every mutation must be safe to re-issue: repeating an
//! applied add or delete either succeeds as a no-op or reports
//! [`GatewayError::Conflict`].

use async_trait::async_trait;

use keel_core::{
    ActionStatus, ActualState, ComponentName, FullComponent, GatewayError, KeyedMember,
    ProjectId, RoleBinding, SimpleComponent, SingletonComponent,
};

#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Fetch the recorded configuration of a project.
    async fn fetch_actual(&self, project: &ProjectId) -> Result<ActualState, GatewayError>;

    /// Status of the last action run against the project.
    async fn fetch_last_action_status(
        &self,
        project: &ProjectId,
    ) -> Result<ActionStatus, GatewayError>;

    async fn enable_simple(
        &self,
        project: &ProjectId,
        component: &ComponentName,
        value: &SimpleComponent,
    ) -> Result<(), GatewayError>;

    async fn disable_simple(
        &self,
        project: &ProjectId,
        component: &ComponentName,
    ) -> Result<(), GatewayError>;

    async fn add_full(
        &self,
        project: &ProjectId,
        component: &ComponentName,
        value: &FullComponent,
    ) -> Result<(), GatewayError>;

    async fn delete_full(
        &self,
        project: &ProjectId,
        component: &ComponentName,
    ) -> Result<(), GatewayError>;

    async fn add_singleton(
        &self,
        project: &ProjectId,
        component: &ComponentName,
        value: &SingletonComponent,
    ) -> Result<(), GatewayError>;

    async fn delete_singleton(
        &self,
        project: &ProjectId,
        component: &ComponentName,
    ) -> Result<(), GatewayError>;

    /// Move a singleton to a new owner.
    ///
    /// Providers without a native call get delete followed by add. The
    /// dispatcher never calls this; it issues the two halves as separate
    /// changes so a failed add is picked up as a plain add next time.
    async fn replace_singleton(
        &self,
        project: &ProjectId,
        component: &ComponentName,
        value: &SingletonComponent,
    ) -> Result<(), GatewayError> {
        self.delete_singleton(project, component).await?;
        self.add_singleton(project, component, value).await
    }

    /// Replace the role bindings of a Full or Singleton component.
    async fn update_roles(
        &self,
        project: &ProjectId,
        component: &ComponentName,
        role_bindings: &[RoleBinding],
    ) -> Result<(), GatewayError>;

    async fn add_member(
        &self,
        project: &ProjectId,
        component: &ComponentName,
        member: &KeyedMember,
    ) -> Result<(), GatewayError>;

    async fn delete_member(
        &self,
        project: &ProjectId,
        component: &ComponentName,
        key: &str,
    ) -> Result<(), GatewayError>;
}
