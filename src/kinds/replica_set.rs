// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Scalable replica controllers: ReplicaSet and ReplicationController.

use crate::attributes::AttributeGraph;
use crate::document::builders::label_selector;
use crate::kinds::{base, container, pod};
use serde_json::{json, Value};

pub fn install(graph: &mut AttributeGraph) {
    base::install(graph, "apps/v1", "ReplicaSet");
    install_scalable(graph);
    graph
        .optional("match_expressions", json!([]))
        .define("selector", |s| {
            let labels = s.get_map("match_labels")?;
            let expressions = s.get_list("match_expressions")?;
            Ok(label_selector(&labels, expressions))
        });
}

/// ReplicationController selects pods with a plain label map.
pub fn install_replication_controller(graph: &mut AttributeGraph) {
    base::install(graph, "v1", "ReplicationController");
    install_scalable(graph);
    graph.define("selector", |s| s.get("match_labels"));
}

fn install_scalable(graph: &mut AttributeGraph) {
    container::install(graph);
    pod::install_pod_spec(graph);
    graph
        .required("replicas")
        .required("match_labels")
        .define("pod_labels", |s| {
            let mut labels = s.get_map("labels")?;
            for (key, value) in s.get_map("match_labels")? {
                labels.insert(key, value);
            }
            Ok(Value::Object(labels))
        })
        .optional("pod_annotations", json!({}))
        .define("pod_metadata", |s| {
            s.compact(&[("labels", "pod_labels"), ("annotations", "pod_annotations")])
        })
        .define("template", |s| {
            s.compact(&[("metadata", "pod_metadata"), ("spec", "pod_spec")])
        })
        .define("spec", |s| {
            s.compact(&[
                ("replicas", "replicas"),
                ("selector", "selector"),
                ("template", "template"),
            ])
        });
}
