//! keel core library: project snapshot types, settings, errors.
//!
//! - [`types`]: newtypes, component shapes and snapshots
//! - [`error`]: [`ConfigError`] and the provider-facing [`GatewayError`]
//! - [`settings`]: retry and polling tunables from `~/.keel/config.yaml`
//! - [`desired`]: desired-state YAML loading

pub mod desired;
pub mod error;
pub mod settings;
pub mod types;

pub use error::{ConfigError, GatewayError};
pub use settings::Settings;
pub use types::{
    ActionRecord, ActionStatus, ActualState, Component, ComponentName, DesiredState,
    FullComponent, KeyedListComponent, KeyedMember, ProjectCore, ProjectId, ProjectSnapshot,
    RoleBinding, Shape, SimpleComponent, SingletonComponent,
};
