// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Structural, identity-aware comparison of resource documents.
//!
//! Changes are reported depth-first in desired-document field order, with
//! fields only present in the current document reported after the desired
//! ones at the same level. Sequences the kind policy declares identity-keyed
//! are matched by key value so reordering never shows up as a change.

pub mod patch;
pub mod path;

pub use patch::merge_patch;
pub use path::{Path, Segment};

use crate::document::is_blank;
use crate::policy::KindPolicy;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Change {
    pub path: Path,
    pub kind: ChangeKind,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
}

impl Change {
    fn added(path: Path, value: &Value) -> Self {
        Self {
            path,
            kind: ChangeKind::Added,
            old_value: None,
            new_value: Some(value.clone()),
        }
    }

    fn removed(path: Path, value: &Value) -> Self {
        Self {
            path,
            kind: ChangeKind::Removed,
            old_value: Some(value.clone()),
            new_value: None,
        }
    }

    fn modified(path: Path, old: &Value, new: &Value) -> Self {
        Self {
            path,
            kind: ChangeKind::Modified,
            old_value: Some(old.clone()),
            new_value: Some(new.clone()),
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |value: &Option<Value>| value.as_ref().map(Value::to_string).unwrap_or_default();
        match self.kind {
            ChangeKind::Added => write!(f, "+ {}: {}", self.path, show(&self.new_value)),
            ChangeKind::Removed => write!(f, "- {}: {}", self.path, show(&self.old_value)),
            ChangeKind::Modified => write!(
                f,
                "~ {}: {} -> {}",
                self.path,
                show(&self.old_value),
                show(&self.new_value)
            ),
        }
    }
}

/// Compare a current document against a desired one.
pub fn diff(current: &Value, desired: &Value, policy: &KindPolicy) -> Vec<Change> {
    let mut differ = Differ {
        policy,
        changes: Vec::new(),
    };
    differ.compare(&Path::root(), current, desired);
    differ.changes
}

/// Whether any change alters a field the policy marks immutable.
pub fn touches_immutable(changes: &[Change], policy: &KindPolicy) -> bool {
    changes
        .iter()
        .any(|change| policy.touches_immutable(&change.path.field_path()))
}

/// Restrict a live document to the fields keel manages, using the document
/// it last applied.
///
/// A field only the live side carries is kept when `last_applied` set it, so
/// dropping it from the definition is still reported as a removal. Anything
/// else only the live side carries was filled in by the server or another
/// writer and is left out, including identity-keyed sequence elements.
/// Without a last-applied document nothing is reported as removed.
pub fn managed_state(
    current: &Value,
    desired: &Value,
    last_applied: Option<&Value>,
    policy: &KindPolicy,
) -> Value {
    prune(&Path::root(), current, desired, last_applied, policy)
}

fn prune(
    path: &Path,
    current: &Value,
    desired: &Value,
    applied: Option<&Value>,
    policy: &KindPolicy,
) -> Value {
    match (current, desired) {
        (Value::Object(current), Value::Object(desired)) => {
            let applied = applied.and_then(Value::as_object);
            Value::Object(
                current
                    .iter()
                    .filter_map(|(key, value)| {
                        let previous = applied.and_then(|a| a.get(key));
                        match desired.get(key) {
                            Some(wanted) => Some((
                                key.clone(),
                                prune(&path.key(key), value, wanted, previous, policy),
                            )),
                            None => previous.map(|_| (key.clone(), value.clone())),
                        }
                    })
                    .collect(),
            )
        }
        (Value::Array(current), Value::Array(desired)) => Value::Array(prune_sequence(
            path,
            current,
            desired,
            applied.and_then(Value::as_array),
            policy,
        )),
        _ => current.clone(),
    }
}

fn prune_sequence(
    path: &Path,
    current: &[Value],
    desired: &[Value],
    applied: Option<&Vec<Value>>,
    policy: &KindPolicy,
) -> Vec<Value> {
    let keyed = policy
        .identity_key(&path.field_path())
        .filter(|key| identities(current, key).is_some() && identities(desired, key).is_some());

    let Some(key) = keyed else {
        return current
            .iter()
            .enumerate()
            .map(|(index, item)| match desired.get(index) {
                Some(wanted) => prune(
                    &path.index(index),
                    item,
                    wanted,
                    applied.and_then(|a| a.get(index)),
                    policy,
                ),
                None => item.clone(),
            })
            .collect();
    };

    current
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let id = item.get(key)?;
            let previous = applied.and_then(|a| find_by_key(a, key, id));
            match find_by_key(desired, key, id) {
                Some(wanted) => Some(prune(&path.index(index), item, wanted, previous, policy)),
                None => previous.map(|_| item.clone()),
            }
        })
        .collect()
}

fn find_by_key<'v>(items: &'v [Value], key: &str, id: &Value) -> Option<&'v Value> {
    items.iter().find(|item| item.get(key) == Some(id))
}

struct Differ<'a> {
    policy: &'a KindPolicy,
    changes: Vec<Change>,
}

impl Differ<'_> {
    /// Blank and absent are interchangeable outside immutable fields.
    fn blank_is_absent(&self, path: &Path) -> bool {
        !self.policy.is_immutable(&path.field_path())
    }

    fn compare(&mut self, path: &Path, current: &Value, desired: &Value) {
        match (current, desired) {
            (Value::Object(current), Value::Object(desired)) => {
                self.compare_maps(path, current, desired)
            }
            (Value::Array(current), Value::Array(desired)) => {
                self.compare_sequences(path, current, desired)
            }
            _ if current == desired => {}
            _ if is_blank(current) && is_blank(desired) && self.blank_is_absent(path) => {}
            _ => self
                .changes
                .push(Change::modified(path.clone(), current, desired)),
        }
    }

    fn compare_maps(&mut self, path: &Path, current: &Map<String, Value>, desired: &Map<String, Value>) {
        for (key, desired_value) in desired {
            let child = path.key(key);
            match current.get(key) {
                Some(current_value) => self.compare(&child, current_value, desired_value),
                None if is_blank(desired_value) && self.blank_is_absent(&child) => {}
                None => self.changes.push(Change::added(child, desired_value)),
            }
        }

        for (key, current_value) in current {
            if desired.contains_key(key) {
                continue;
            }
            let child = path.key(key);
            if is_blank(current_value) && self.blank_is_absent(&child) {
                continue;
            }
            self.changes.push(Change::removed(child, current_value));
        }
    }

    fn compare_sequences(&mut self, path: &Path, current: &[Value], desired: &[Value]) {
        if let Some(key) = self.policy.identity_key(&path.field_path()) {
            if let (Some(current_ids), Some(desired_ids)) =
                (identities(current, key), identities(desired, key))
            {
                self.compare_keyed(path, current, desired, &current_ids, &desired_ids);
                return;
            }
        }

        for index in 0..current.len().max(desired.len()) {
            let child = path.index(index);
            match (current.get(index), desired.get(index)) {
                (Some(c), Some(d)) => self.compare(&child, c, d),
                (None, Some(d)) => self.changes.push(Change::added(child, d)),
                (Some(c), None) => self.changes.push(Change::removed(child, c)),
                (None, None) => {}
            }
        }
    }

    fn compare_keyed(
        &mut self,
        path: &Path,
        current: &[Value],
        desired: &[Value],
        current_ids: &[&Value],
        desired_ids: &[&Value],
    ) {
        let mut matched = vec![false; current.len()];

        for (index, desired_value) in desired.iter().enumerate() {
            let child = path.index(index);
            match current_ids.iter().position(|id| *id == desired_ids[index]) {
                Some(found) => {
                    matched[found] = true;
                    self.compare(&child, &current[found], desired_value);
                }
                None => self.changes.push(Change::added(child, desired_value)),
            }
        }

        for (index, current_value) in current.iter().enumerate() {
            if !matched[index] {
                self.changes
                    .push(Change::removed(path.index(index), current_value));
            }
        }
    }
}

/// Identity values of every element, or None when an element is not a map,
/// lacks the key, or repeats another element's key.
fn identities<'v>(items: &'v [Value], key: &str) -> Option<Vec<&'v Value>> {
    let mut ids: Vec<&Value> = Vec::with_capacity(items.len());
    for item in items {
        let id = item.as_object()?.get(key).filter(|id| !id.is_null())?;
        if ids.contains(&id) {
            return None;
        }
        ids.push(id);
    }
    Some(ids)
}
