// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Translation of a change-set into a JSON merge patch (RFC 7386).

use crate::diff::Change;
use serde_json::{Map, Value};

/// Build a merge patch touching only the changed paths.
///
/// Merge patches cannot address sequence elements, so a change inside a
/// sequence replaces the whole sequence with its desired value. Fields that
/// no longer exist in `desired` are set to null, which deletes them.
pub fn merge_patch(changes: &[Change], desired: &Value) -> Value {
    let mut patch = Value::Object(Map::new());

    for change in changes {
        let anchor = change.path.key_prefix();
        if anchor.is_empty() {
            return desired.clone();
        }

        let value = lookup(desired, &anchor).cloned().unwrap_or(Value::Null);
        insert(&mut patch, &anchor, value);
    }

    patch
}

fn lookup<'v>(document: &'v Value, keys: &[&str]) -> Option<&'v Value> {
    keys.iter().try_fold(document, |value, key| value.get(*key))
}

fn insert(patch: &mut Value, keys: &[&str], value: Value) {
    let Some((last, parents)) = keys.split_last() else {
        return;
    };

    let mut cursor = patch;
    for key in parents {
        let Value::Object(map) = cursor else {
            // An ancestor is already replaced wholesale.
            return;
        };
        cursor = map
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    if let Value::Object(map) = cursor {
        map.insert(last.to_string(), value);
    }
}
