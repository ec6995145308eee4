//! Change-set types produced by the classifier and consumed by the dispatcher.

use std::fmt;

use serde::Serialize;

use keel_core::{
    ComponentName, FullComponent, KeyedMember, RoleBinding, Shape, SimpleComponent,
    SingletonComponent,
};

/// What an add call carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Payload {
    Simple(SimpleComponent),
    Full(FullComponent),
    Singleton(SingletonComponent),
    Member(KeyedMember),
}

/// What a remove call targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Removal {
    Simple,
    Full,
    Singleton,
    Member { key: String },
}

/// One remote mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOp {
    Add(Payload),
    Remove(Removal),
    /// Replace the role bindings of a Full or Singleton component in place.
    UpdateRoles {
        shape: Shape,
        role_bindings: Vec<RoleBinding>,
    },
}

/// The coarse kind of a change, used for diagnostics and retry intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Add,
    Remove,
    Update,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Add => write!(f, "add"),
            OperationKind::Remove => write!(f, "remove"),
            OperationKind::Update => write!(f, "update"),
        }
    }
}

/// A mutation against one component slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    pub component: ComponentName,
    pub op: ChangeOp,
}

impl Change {
    pub fn add(component: &ComponentName, payload: Payload) -> Self {
        Self {
            component: component.clone(),
            op: ChangeOp::Add(payload),
        }
    }

    pub fn remove(component: &ComponentName, removal: Removal) -> Self {
        Self {
            component: component.clone(),
            op: ChangeOp::Remove(removal),
        }
    }

    pub fn update_roles(
        component: &ComponentName,
        shape: Shape,
        role_bindings: Vec<RoleBinding>,
    ) -> Self {
        Self {
            component: component.clone(),
            op: ChangeOp::UpdateRoles {
                shape,
                role_bindings,
            },
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self.op {
            ChangeOp::Add(_) => OperationKind::Add,
            ChangeOp::Remove(_) => OperationKind::Remove,
            ChangeOp::UpdateRoles { .. } => OperationKind::Update,
        }
    }

    /// `component` or `component/member-key` for keyed list members.
    pub fn subject(&self) -> String {
        match &self.op {
            ChangeOp::Add(Payload::Member(member)) => format!("{}/{}", self.component, member.key),
            ChangeOp::Remove(Removal::Member { key }) => format!("{}/{key}", self.component),
            _ => self.component.to_string(),
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.op {
            ChangeOp::Add(Payload::Singleton(mesh)) => {
                write!(f, "add {} (control plane {})", self.subject(), mesh.control_plane)
            }
            ChangeOp::Add(Payload::Full(FullComponent {
                identity: Some(identity),
                ..
            })) => write!(f, "add {} (identity {identity})", self.subject()),
            ChangeOp::UpdateRoles { role_bindings, .. } => write!(
                f,
                "update {} ({} role binding(s))",
                self.subject(),
                role_bindings.len()
            ),
            _ => write!(f, "{} {}", self.kind(), self.subject()),
        }
    }
}

/// Ordered list of changes for one project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub changes: Vec<Change>,
    /// Components recorded remotely that the registry does not declare.
    /// They are left untouched.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ignored: Vec<ComponentName>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Change> {
        self.changes.iter()
    }

    pub fn count(&self, kind: OperationKind) -> usize {
        self.changes.iter().filter(|c| c.kind() == kind).count()
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a Change;
    type IntoIter = std::slice::Iter<'a, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}
