//! Diff classifier.
//!
//! Per component slot:
//! 1. absent on both sides → no change
//! 2. desired only → add
//! 3. actual only → remove
//! 4. both present → shape-specific:
//!    - Simple: presence only, never updated
//!    - Full / Singleton: ownership key present on both sides and different →
//!      remove then add; otherwise an order-sensitive role-binding comparison
//!      decides between update and no change
//!    - KeyedList: symmetric difference of member keys; shared keys are
//!      never compared further

use std::collections::{BTreeMap, BTreeSet};

use keel_core::{
    ActualState, Component, ComponentName, DesiredState, KeyedListComponent, RoleBinding, Shape,
};

use crate::change::{Change, ChangeSet, Payload, Removal};
use crate::error::ReconcileError;
use crate::registry::{ClassifyFn, ComponentRegistry, ComponentSpec};

/// Build the ordered change-set for a project.
///
/// Walks the registry in declaration order. Desired components unknown to the
/// registry are rejected; actual components unknown to the registry are
/// listed in [`ChangeSet::ignored`] and left alone.
pub fn plan(
    registry: &ComponentRegistry,
    desired: &DesiredState,
    actual: &ActualState,
) -> Result<ChangeSet, ReconcileError> {
    if let Some(unknown) = desired
        .components
        .keys()
        .find(|name| !registry.contains(name))
    {
        return Err(ReconcileError::UnknownComponent(unknown.clone()));
    }

    let mut set = ChangeSet::default();
    for spec in registry.iter() {
        let changes = classify(spec, desired, actual)?;
        if !changes.is_empty() {
            tracing::debug!(component = %spec.name, changes = changes.len(), "classified");
        }
        set.changes.extend(changes);
    }

    set.ignored = actual
        .components
        .keys()
        .filter(|name| !registry.contains(name))
        .cloned()
        .collect();
    for name in &set.ignored {
        tracing::warn!(component = %name, "actual component not declared in registry; skipping");
    }
    Ok(set)
}

/// Classify one component slot.
pub fn classify(
    spec: &ComponentSpec,
    desired: &DesiredState,
    actual: &ActualState,
) -> Result<Vec<Change>, ReconcileError> {
    let wanted = spec.extract(desired)?;
    let current = spec.extract(actual)?;
    (spec.classify)(&spec.name, wanted, current)
}

/// The default classifier for a shape.
pub fn classifier_for(shape: Shape) -> ClassifyFn {
    match shape {
        Shape::Simple => classify_simple,
        Shape::Full => classify_full,
        Shape::Singleton => classify_singleton,
        Shape::KeyedList => classify_keyed_list,
    }
}

fn classify_simple(
    name: &ComponentName,
    desired: Option<&Component>,
    actual: Option<&Component>,
) -> Result<Vec<Change>, ReconcileError> {
    match (desired, actual) {
        (None, None) => Ok(vec![]),
        (Some(Component::Simple(simple)), None) => {
            Ok(vec![Change::add(name, Payload::Simple(simple.clone()))])
        }
        (None, Some(Component::Simple(_))) => Ok(vec![Change::remove(name, Removal::Simple)]),
        (Some(Component::Simple(_)), Some(Component::Simple(_))) => Ok(vec![]),
        (desired, actual) => Err(mismatch(name, Shape::Simple, desired, actual)),
    }
}

fn classify_full(
    name: &ComponentName,
    desired: Option<&Component>,
    actual: Option<&Component>,
) -> Result<Vec<Change>, ReconcileError> {
    match (desired, actual) {
        (None, None) => Ok(vec![]),
        (Some(Component::Full(full)), None) => {
            Ok(vec![Change::add(name, Payload::Full(full.clone()))])
        }
        (None, Some(Component::Full(_))) => Ok(vec![Change::remove(name, Removal::Full)]),
        (Some(Component::Full(want)), Some(Component::Full(have))) => {
            if owner_changed(want.identity.as_deref(), have.identity.as_deref()) {
                return Ok(vec![
                    Change::remove(name, Removal::Full),
                    Change::add(name, Payload::Full(want.clone())),
                ]);
            }
            Ok(roles_delta(
                name,
                Shape::Full,
                &want.role_bindings,
                &have.role_bindings,
            ))
        }
        (desired, actual) => Err(mismatch(name, Shape::Full, desired, actual)),
    }
}

fn classify_singleton(
    name: &ComponentName,
    desired: Option<&Component>,
    actual: Option<&Component>,
) -> Result<Vec<Change>, ReconcileError> {
    match (desired, actual) {
        (None, None) => Ok(vec![]),
        (Some(Component::Singleton(mesh)), None) => {
            Ok(vec![Change::add(name, Payload::Singleton(mesh.clone()))])
        }
        (None, Some(Component::Singleton(_))) => {
            Ok(vec![Change::remove(name, Removal::Singleton)])
        }
        (Some(Component::Singleton(want)), Some(Component::Singleton(have))) => {
            if owner_changed(Some(&want.control_plane), Some(&have.control_plane)) {
                return Ok(vec![
                    Change::remove(name, Removal::Singleton),
                    Change::add(name, Payload::Singleton(want.clone())),
                ]);
            }
            Ok(roles_delta(
                name,
                Shape::Singleton,
                &want.role_bindings,
                &have.role_bindings,
            ))
        }
        (desired, actual) => Err(mismatch(name, Shape::Singleton, desired, actual)),
    }
}

fn classify_keyed_list(
    name: &ComponentName,
    desired: Option<&Component>,
    actual: Option<&Component>,
) -> Result<Vec<Change>, ReconcileError> {
    let empty = KeyedListComponent::default();
    let want = match desired {
        None => &empty,
        Some(Component::KeyedList(list)) => list,
        Some(other) => return Err(mismatch(name, Shape::KeyedList, Some(other), actual)),
    };
    let have = match actual {
        None => &empty,
        Some(Component::KeyedList(list)) => list,
        Some(other) => return Err(mismatch(name, Shape::KeyedList, desired, Some(other))),
    };

    let mut wanted = BTreeMap::new();
    for member in &want.members {
        if wanted.insert(member.key.as_str(), member).is_some() {
            return Err(ReconcileError::DuplicateMemberKey {
                component: name.clone(),
                key: member.key.clone(),
            });
        }
    }
    let present: BTreeSet<&str> = have.members.iter().map(|m| m.key.as_str()).collect();

    let mut changes = Vec::new();
    for key in present.iter().filter(|key| !wanted.contains_key(*key)) {
        changes.push(Change::remove(
            name,
            Removal::Member {
                key: (*key).to_string(),
            },
        ));
    }
    for (_, member) in wanted.iter().filter(|(key, _)| !present.contains(*key)) {
        changes.push(Change::add(name, Payload::Member((*member).clone())));
    }
    Ok(changes)
}

/// Ownership changes only when both sides name an owner and the names differ.
/// A blank owner counts as no owner.
fn owner_changed(desired: Option<&str>, actual: Option<&str>) -> bool {
    fn named(owner: Option<&str>) -> Option<&str> {
        owner.filter(|s| !s.is_empty())
    }
    matches!((named(desired), named(actual)), (Some(want), Some(have)) if want != have)
}

/// Role bindings compare by full structural equality, order included.
fn roles_delta(
    name: &ComponentName,
    shape: Shape,
    desired: &[RoleBinding],
    actual: &[RoleBinding],
) -> Vec<Change> {
    if desired == actual {
        return vec![];
    }
    vec![Change::update_roles(name, shape, desired.to_vec())]
}

fn mismatch(
    name: &ComponentName,
    expected: Shape,
    desired: Option<&Component>,
    actual: Option<&Component>,
) -> ReconcileError {
    let found = [desired, actual]
        .into_iter()
        .flatten()
        .map(Component::shape)
        .find(|shape| *shape != expected)
        .unwrap_or(expected);
    ReconcileError::ShapeMismatch {
        component: name.clone(),
        expected,
        found,
    }
}
