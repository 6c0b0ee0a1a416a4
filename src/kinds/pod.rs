// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

use crate::attributes::AttributeGraph;
use crate::kinds::{base, container};
use serde_json::{json, Value};

pub fn install(graph: &mut AttributeGraph) {
    base::install(graph, "v1", "Pod");
    container::install(graph);
    install_pod_spec(graph);
    graph.define("spec", |s| s.get("pod_spec"));
}

/// Pod spec attributes, shared with the pod templates of replica controllers.
pub fn install_pod_spec(graph: &mut AttributeGraph) {
    graph
        .optional("volumes", json!([]))
        .optional("node_selector", json!({}))
        .optional("tolerations", json!([]))
        .optional("affinity", json!({}))
        .optional("restart_policy", Value::Null)
        .optional("image_pull_secrets", json!([]))
        .define("pod_spec", |s| {
            s.compact(&[
                ("containers", "containers"),
                ("volumes", "volumes"),
                ("nodeSelector", "node_selector"),
                ("tolerations", "tolerations"),
                ("affinity", "affinity"),
                ("restartPolicy", "restart_policy"),
                ("imagePullSecrets", "image_pull_secrets"),
            ])
        });
}
