// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Canonical resource documents and the fragments they are built from.

pub mod builders;
pub mod env;

use crate::constants::LAST_APPLIED_ANNOTATION;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A rendered resource: nested maps, sequences and scalars with stable key order.
pub type Document = Value;

/// Metadata keys populated by the API server rather than by a definition.
const SERVER_MANAGED_METADATA: &[&str] = &[
    "uid",
    "resourceVersion",
    "generation",
    "creationTimestamp",
    "deletionTimestamp",
    "deletionGracePeriodSeconds",
    "managedFields",
    "selfLink",
];

/// Identity of a resource in the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId {
    pub kind: String,
    pub name: String,
    pub namespace: String,
}

impl ResourceId {
    pub fn new(kind: &str, name: &str, namespace: &str) -> Self {
        Self {
            kind: kind.to_string(),
            name: name.to_string(),
            namespace: namespace.to_string(),
        }
    }

    /// Read the identity of a rendered document. Returns None when kind or
    /// name is missing; the namespace falls back to "default".
    pub fn from_document(document: &Document) -> Option<Self> {
        let kind = document.get("kind")?.as_str()?;
        let metadata = document.get("metadata")?;
        let name = metadata.get("name")?.as_str()?;
        let namespace = metadata
            .get("namespace")
            .and_then(Value::as_str)
            .unwrap_or("default");
        Some(Self::new(kind, name, namespace))
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}

/// Whether a value counts as absent: null, an empty string, sequence or map.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Build a map from key/value pairs, dropping blank values.
pub fn compact_map<K, I>(entries: I) -> Value
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Value)>,
{
    Value::Object(
        entries
            .into_iter()
            .filter(|(_, value)| !is_blank(value))
            .map(|(key, value)| (key.into(), value))
            .collect(),
    )
}

/// Recursively drop blank map entries. Sequence elements are kept in place.
pub fn compact(value: Value) -> Value {
    match value {
        Value::Object(map) => compact_map(map.into_iter().map(|(k, v)| (k, compact(v)))),
        Value::Array(items) => Value::Array(items.into_iter().map(compact).collect()),
        other => other,
    }
}

/// Strip status and server-managed metadata from a live document so it can be
/// compared against a rendered one.
pub fn observed_state(live: &Document) -> Document {
    let Value::Object(root) = live else {
        return live.clone();
    };

    let mut observed = Map::new();
    for (key, value) in root {
        match key.as_str() {
            "status" => {}
            "metadata" => {
                let metadata = match value {
                    Value::Object(fields) => Value::Object(
                        fields
                            .iter()
                            .filter(|(k, _)| !SERVER_MANAGED_METADATA.contains(&k.as_str()))
                            .filter_map(|(k, v)| match (k.as_str(), v) {
                                ("annotations", Value::Object(annotations)) => {
                                    let mut annotations = annotations.clone();
                                    annotations.remove(LAST_APPLIED_ANNOTATION);
                                    (!annotations.is_empty())
                                        .then(|| (k.clone(), Value::Object(annotations)))
                                }
                                _ => Some((k.clone(), v.clone())),
                            })
                            .collect(),
                    ),
                    other => other.clone(),
                };
                observed.insert(key.clone(), metadata);
            }
            _ => {
                observed.insert(key.clone(), value.clone());
            }
        }
    }
    Value::Object(observed)
}

/// Copy of `desired` that records itself in the last-applied annotation.
pub fn with_last_applied(desired: &Document) -> Document {
    let mut applied = desired.clone();
    if let Some(metadata) = applied.get_mut("metadata").and_then(Value::as_object_mut) {
        let annotations = metadata
            .entry("annotations")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(annotations) = annotations {
            annotations.insert(
                LAST_APPLIED_ANNOTATION.to_string(),
                Value::String(desired.to_string()),
            );
        }
    }
    applied
}

/// The document recorded by [`with_last_applied`], if the live object carries
/// a readable one.
pub fn last_applied(live: &Document) -> Option<Document> {
    let raw = live
        .get("metadata")?
        .get("annotations")?
        .get(LAST_APPLIED_ANNOTATION)?
        .as_str()?;
    serde_json::from_str(raw).ok()
}
