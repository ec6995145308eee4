//! Component registry.
//!
//! Maps each component slot of a project to a [`ComponentSpec`]: its declared
//! shape, how to pull it out of a snapshot, and how to diff it. The registry
//! order is the order in which changes are planned and applied.

use keel_core::{Component, ComponentName, ProjectSnapshot, Shape};

use crate::change::Change;
use crate::diff;
use crate::error::ReconcileError;

/// Diff function for one component slot.
///
/// Receives the normalized desired and actual values and returns the ordered
/// changes that align actual with desired. An empty vector means no change.
pub type ClassifyFn = fn(
    &ComponentName,
    Option<&Component>,
    Option<&Component>,
) -> Result<Vec<Change>, ReconcileError>;

/// Declaration of one component slot.
#[derive(Debug, Clone)]
pub struct ComponentSpec {
    pub name: ComponentName,
    pub shape: Shape,
    pub description: &'static str,
    pub classify: ClassifyFn,
}

impl ComponentSpec {
    /// A spec using the default classifier for `shape`.
    pub fn new(name: impl Into<ComponentName>, shape: Shape, description: &'static str) -> Self {
        Self {
            name: name.into(),
            shape,
            description,
            classify: diff::classifier_for(shape),
        }
    }

    pub fn with_classifier(mut self, classify: ClassifyFn) -> Self {
        self.classify = classify;
        self
    }

    /// The normalized component for this slot, checked against the declared shape.
    pub fn extract<'a>(
        &self,
        snapshot: &'a ProjectSnapshot,
    ) -> Result<Option<&'a Component>, ReconcileError> {
        let Some(component) = snapshot.component(&self.name) else {
            return Ok(None);
        };
        if component.shape() != self.shape {
            return Err(ReconcileError::ShapeMismatch {
                component: self.name.clone(),
                expected: self.shape,
                found: component.shape(),
            });
        }
        Ok(Some(component))
    }
}

/// Ordered set of component specs.
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    specs: Vec<ComponentSpec>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The components of a platform project, in apply order.
    pub fn standard() -> Self {
        Self::new()
            .with(ComponentSpec::new(
                "namespace_isolation",
                Shape::Simple,
                "namespace-bound isolation flag",
            ))
            .with(ComponentSpec::new(
                "access_control",
                Shape::Full,
                "access-control role bindings",
            ))
            .with(ComponentSpec::new(
                "operator",
                Shape::Full,
                "identity-bound operator",
            ))
            .with(ComponentSpec::new(
                "mesh",
                Shape::Singleton,
                "mesh control-plane binding",
            ))
            .with(ComponentSpec::new(
                "certificates",
                Shape::KeyedList,
                "certificate grants keyed by grant name",
            ))
    }

    /// Add a spec, replacing any existing spec with the same name in place.
    pub fn with(mut self, spec: ComponentSpec) -> Self {
        match self.specs.iter_mut().find(|s| s.name == spec.name) {
            Some(existing) => *existing = spec,
            None => self.specs.push(spec),
        }
        self
    }

    pub fn get(&self, name: &ComponentName) -> Option<&ComponentSpec> {
        self.specs.iter().find(|s| &s.name == name)
    }

    pub fn contains(&self, name: &ComponentName) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ComponentSpec> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
