// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Constructors for pod spec fragments.
//!
//! Leaf fragments are built from `k8s-openapi` types so field names and
//! shapes follow the API exactly; wrappers are assembled as compact maps.

use crate::document::compact_map;
use crate::error::DefinitionError;
use k8s_openapi::api::core::v1::{
    AWSElasticBlockStoreVolumeSource, ContainerPort, EmptyDirVolumeSource,
    GCEPersistentDiskVolumeSource, HostPathVolumeSource, KeyToPath, SecretVolumeSource,
    Toleration, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelectorRequirement;
use serde::Serialize;
use serde_json::{json, Map, Value};

pub type FragmentResult = Result<Value, DefinitionError>;

const SELECTOR_OPERATORS: &[&str] = &["In", "NotIn", "Exists", "DoesNotExist"];
const PROTOCOLS: &[&str] = &["TCP", "UDP", "SCTP"];
const TAINT_EFFECTS: &[&str] = &["NoSchedule", "PreferNoSchedule", "NoExecute"];

fn fragment<T: Serialize>(value: &T) -> FragmentResult {
    serde_json::to_value(value).map_err(|e| DefinitionError::InvalidFragment(e.to_string()))
}

fn reject(message: String) -> FragmentResult {
    Err(DefinitionError::InvalidFragment(message))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

/// Container port, optionally named, with protocol TCP, UDP or SCTP.
pub fn container_port(port: i32, name: Option<&str>, protocol: Option<&str>) -> FragmentResult {
    if !(1..=65535).contains(&port) {
        return reject(format!("container port {} is out of range", port));
    }
    if let Some(protocol) = protocol {
        if !PROTOCOLS.contains(&protocol) {
            return reject(format!("unknown protocol '{}'", protocol));
        }
    }

    fragment(&ContainerPort {
        container_port: port,
        name: non_empty(name),
        protocol: non_empty(protocol),
        ..Default::default()
    })
}

pub fn volume_mount(name: &str, mount_path: &str, read_only: bool) -> FragmentResult {
    if !mount_path.starts_with('/') {
        return reject(format!("mount path '{}' must be absolute", mount_path));
    }

    fragment(&VolumeMount {
        name: name.to_string(),
        mount_path: mount_path.to_string(),
        read_only: read_only.then_some(true),
        ..Default::default()
    })
}

pub fn host_path_volume(name: &str, path: &str) -> FragmentResult {
    fragment(&Volume {
        name: name.to_string(),
        host_path: Some(HostPathVolumeSource {
            path: path.to_string(),
            type_: None,
        }),
        ..Default::default()
    })
}

/// Scratch volume; `medium` is "Memory" for a tmpfs-backed directory.
pub fn empty_dir_volume(name: &str, medium: Option<&str>) -> FragmentResult {
    if let Some(medium) = medium {
        if !medium.is_empty() && medium != "Memory" {
            return reject(format!("unknown emptyDir medium '{}'", medium));
        }
    }

    fragment(&Volume {
        name: name.to_string(),
        empty_dir: Some(EmptyDirVolumeSource {
            medium: non_empty(medium),
            size_limit: None,
        }),
        ..Default::default()
    })
}

fn key_to_paths(items: &[(&str, &str)]) -> Option<Vec<KeyToPath>> {
    (!items.is_empty()).then(|| {
        items
            .iter()
            .map(|(key, path)| KeyToPath {
                key: key.to_string(),
                path: path.to_string(),
                mode: None,
            })
            .collect()
    })
}

/// Secret-backed volume; `items` projects selected keys to paths.
pub fn secret_volume(name: &str, secret_name: &str, items: &[(&str, &str)]) -> FragmentResult {
    fragment(&Volume {
        name: name.to_string(),
        secret: Some(SecretVolumeSource {
            secret_name: Some(secret_name.to_string()),
            items: key_to_paths(items),
            ..Default::default()
        }),
        ..Default::default()
    })
}

pub fn config_map_volume(name: &str, config_map: &str, items: &[(&str, &str)]) -> FragmentResult {
    let items = match key_to_paths(items) {
        Some(items) => fragment(&items)?,
        None => Value::Null,
    };
    Ok(json!({
        "name": name,
        "configMap": compact_map([("name", json!(config_map)), ("items", items)]),
    }))
}

pub fn gce_disk_volume(
    name: &str,
    pd_name: &str,
    fs_type: Option<&str>,
    read_only: bool,
) -> FragmentResult {
    fragment(&Volume {
        name: name.to_string(),
        gce_persistent_disk: Some(GCEPersistentDiskVolumeSource {
            pd_name: pd_name.to_string(),
            fs_type: non_empty(fs_type),
            read_only: read_only.then_some(true),
            partition: None,
        }),
        ..Default::default()
    })
}

pub fn aws_ebs_volume(
    name: &str,
    volume_id: &str,
    fs_type: Option<&str>,
    read_only: bool,
) -> FragmentResult {
    fragment(&Volume {
        name: name.to_string(),
        aws_elastic_block_store: Some(AWSElasticBlockStoreVolumeSource {
            volume_id: volume_id.to_string(),
            fs_type: non_empty(fs_type),
            read_only: read_only.then_some(true),
            partition: None,
        }),
        ..Default::default()
    })
}

/// Set-based selector requirement. `In` and `NotIn` need at least one value;
/// `Exists` and `DoesNotExist` must not carry any.
pub fn match_expression(key: &str, operator: &str, values: &[&str]) -> FragmentResult {
    if !SELECTOR_OPERATORS.contains(&operator) {
        return reject(format!("unknown selector operator '{}'", operator));
    }
    match operator {
        "In" | "NotIn" if values.is_empty() => {
            return reject(format!("operator {} on '{}' requires values", operator, key));
        }
        "Exists" | "DoesNotExist" if !values.is_empty() => {
            return reject(format!(
                "operator {} on '{}' must not carry values",
                operator, key
            ));
        }
        _ => {}
    }

    fragment(&LabelSelectorRequirement {
        key: key.to_string(),
        operator: operator.to_string(),
        values: (!values.is_empty()).then(|| values.iter().map(|v| v.to_string()).collect()),
    })
}

/// Label selector combining equality matches and expression matches.
pub fn label_selector(match_labels: &Map<String, Value>, expressions: Vec<Value>) -> Value {
    compact_map([
        ("matchLabels", Value::Object(match_labels.clone())),
        ("matchExpressions", Value::Array(expressions)),
    ])
}

/// Toleration for a node taint. With operator `Exists` no value is allowed;
/// a missing key is only valid with `Exists`.
pub fn toleration(
    key: Option<&str>,
    operator: &str,
    value: Option<&str>,
    effect: Option<&str>,
    toleration_seconds: Option<i64>,
) -> FragmentResult {
    match operator {
        "Exists" if non_empty(value).is_some() => {
            return reject("toleration operator Exists must not carry a value".to_string());
        }
        "Equal" if non_empty(key).is_none() => {
            return reject("toleration operator Equal requires a key".to_string());
        }
        "Exists" | "Equal" => {}
        other => return reject(format!("unknown toleration operator '{}'", other)),
    }
    if let Some(effect) = effect {
        if !TAINT_EFFECTS.contains(&effect) {
            return reject(format!("unknown taint effect '{}'", effect));
        }
    }
    if toleration_seconds.is_some() && effect != Some("NoExecute") {
        return reject("tolerationSeconds is only valid with effect NoExecute".to_string());
    }

    fragment(&Toleration {
        key: non_empty(key),
        operator: Some(operator.to_string()),
        value: non_empty(value),
        effect: non_empty(effect),
        toleration_seconds,
    })
}

/// Node selector term made of match expressions.
pub fn node_selector_term(expressions: Vec<Value>) -> FragmentResult {
    if expressions.is_empty() {
        return reject("node selector term needs at least one expression".to_string());
    }
    Ok(json!({ "matchExpressions": expressions }))
}

/// Pod (anti-)affinity term: pods matching `selector` within `topology_key`.
pub fn pod_affinity_term(
    selector: Value,
    topology_key: &str,
    namespaces: &[&str],
) -> FragmentResult {
    if topology_key.is_empty() {
        return reject("pod affinity term requires a topology key".to_string());
    }
    Ok(compact_map([
        ("labelSelector", selector),
        ("namespaces", json!(namespaces)),
        ("topologyKey", json!(topology_key)),
    ]))
}

fn check_weight(weight: i32) -> Result<(), DefinitionError> {
    if (1..=100).contains(&weight) {
        Ok(())
    } else {
        Err(DefinitionError::InvalidFragment(format!(
            "affinity weight {} must be between 1 and 100",
            weight
        )))
    }
}

/// Weighted node selector term for preferred node affinity.
pub fn weighted_preference(weight: i32, term: Value) -> FragmentResult {
    check_weight(weight)?;
    Ok(json!({ "weight": weight, "preference": term }))
}

/// Weighted pod affinity term for preferred pod (anti-)affinity.
pub fn weighted_pod_affinity_term(weight: i32, term: Value) -> FragmentResult {
    check_weight(weight)?;
    Ok(json!({ "weight": weight, "podAffinityTerm": term }))
}

/// Whether a scheduling rule is a hard requirement or a weighted preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulingPreference {
    Required,
    Preferred,
}

impl SchedulingPreference {
    pub fn key(self) -> &'static str {
        match self {
            Self::Required => "requiredDuringSchedulingIgnoredDuringExecution",
            Self::Preferred => "preferredDuringSchedulingIgnoredDuringExecution",
        }
    }
}

/// Node affinity from required node selector terms and weighted preferences.
pub fn node_affinity(required: Vec<Value>, preferred: Vec<Value>) -> Value {
    let required = if required.is_empty() {
        Value::Null
    } else {
        json!({ "nodeSelectorTerms": required })
    };
    compact_map([
        (SchedulingPreference::Required.key(), required),
        (SchedulingPreference::Preferred.key(), Value::Array(preferred)),
    ])
}

/// Pod affinity or anti-affinity from required terms and weighted terms.
pub fn pod_affinity(required: Vec<Value>, preferred: Vec<Value>) -> Value {
    compact_map([
        (SchedulingPreference::Required.key(), Value::Array(required)),
        (SchedulingPreference::Preferred.key(), Value::Array(preferred)),
    ])
}

/// Complete affinity block; blank parts are dropped.
pub fn affinity(node: Value, pod: Value, pod_anti: Value) -> Value {
    compact_map([
        ("nodeAffinity", node),
        ("podAffinity", pod),
        ("podAntiAffinity", pod_anti),
    ])
}
