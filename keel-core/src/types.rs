//! Domain types for project snapshots.
//!
//! A snapshot is a fixed project core plus a map of optional components. The
//! same type describes both the declared (desired) and the recorded (actual)
//! side of a reconciliation. All types round-trip through serde.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed identifier for a platform project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectId(pub String);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ProjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProjectId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A strongly-typed name for a component slot of a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentName(pub String);

impl fmt::Display for ComponentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ComponentName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ComponentName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Component payloads
// ---------------------------------------------------------------------------

/// A role granted to a list of groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleBinding {
    pub role: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

impl RoleBinding {
    pub fn new<I, S>(role: impl Into<String>, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            role: role.into(),
            groups: groups.into_iter().map(Into::into).collect(),
        }
    }
}

/// Presence-only component. Present iff `value` is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleComponent {
    pub value: String,
}

/// Component owned by an identity and carrying role bindings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullComponent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    #[serde(default)]
    pub role_bindings: Vec<RoleBinding>,
}

/// The mesh control-plane binding. `control_plane` is the ownership key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingletonComponent {
    pub control_plane: String,
    #[serde(default)]
    pub role_bindings: Vec<RoleBinding>,
}

/// One member of a keyed list. `key` is its only identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyedMember {
    pub key: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl KeyedMember {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// List of members identified by natural key.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyedListComponent {
    #[serde(default)]
    pub members: Vec<KeyedMember>,
}

impl KeyedListComponent {
    pub fn member(&self, key: &str) -> Option<&KeyedMember> {
        self.members.iter().find(|m| m.key == key)
    }
}

// ---------------------------------------------------------------------------
// Shapes
// ---------------------------------------------------------------------------

/// The shape of a component slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Simple,
    Full,
    Singleton,
    KeyedList,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Simple => write!(f, "simple"),
            Shape::Full => write!(f, "full"),
            Shape::Singleton => write!(f, "singleton"),
            Shape::KeyedList => write!(f, "keyed_list"),
        }
    }
}

/// A component value, tagged by shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Component {
    Simple(SimpleComponent),
    Full(FullComponent),
    Singleton(SingletonComponent),
    KeyedList(KeyedListComponent),
}

impl Component {
    pub fn shape(&self) -> Shape {
        match self {
            Component::Simple(_) => Shape::Simple,
            Component::Full(_) => Shape::Full,
            Component::Singleton(_) => Shape::Singleton,
            Component::KeyedList(_) => Shape::KeyedList,
        }
    }

    /// `None` when the value carries nothing that makes it logically present.
    pub fn normalized(&self) -> Option<&Component> {
        let present = match self {
            Component::Simple(simple) => !simple.value.is_empty(),
            Component::Full(_) => true,
            Component::Singleton(singleton) => !singleton.control_plane.is_empty(),
            Component::KeyedList(list) => !list.members.is_empty(),
        };
        present.then_some(self)
    }
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Fixed project attributes. Carried through, never reconciled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectCore {
    pub id: ProjectId,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A project and its optional components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub core: ProjectCore,
    #[serde(default)]
    pub components: BTreeMap<ComponentName, Component>,
}

/// Snapshot declared by the caller.
pub type DesiredState = ProjectSnapshot;

/// Snapshot recorded by the provider.
pub type ActualState = ProjectSnapshot;

impl ProjectSnapshot {
    /// A snapshot with no components.
    pub fn empty(id: impl Into<ProjectId>) -> Self {
        let id = id.into();
        Self {
            core: ProjectCore {
                display_name: id.0.clone(),
                id,
                description: None,
            },
            components: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &ProjectId {
        &self.core.id
    }

    /// The normalized component stored under `name`, if logically present.
    pub fn component(&self, name: &ComponentName) -> Option<&Component> {
        self.components.get(name).and_then(Component::normalized)
    }

    pub fn with_component(mut self, name: impl Into<ComponentName>, component: Component) -> Self {
        self.components.insert(name.into(), component);
        self
    }
}

// ---------------------------------------------------------------------------
// Remote action status
// ---------------------------------------------------------------------------

/// Status of the last action the provider ran against a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    #[default]
    Idle,
    InProgress,
    Succeeded,
    Failed,
}

impl ActionStatus {
    /// Only `InProgress` blocks a new mutation.
    pub fn is_terminal(self) -> bool {
        !matches!(self, ActionStatus::InProgress)
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionStatus::Idle => write!(f, "idle"),
            ActionStatus::InProgress => write!(f, "in_progress"),
            ActionStatus::Succeeded => write!(f, "succeeded"),
            ActionStatus::Failed => write!(f, "failed"),
        }
    }
}

/// The last action recorded against a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub status: ActionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ActionRecord {
    pub fn idle() -> Self {
        Self {
            status: ActionStatus::Idle,
            action: None,
            updated_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
