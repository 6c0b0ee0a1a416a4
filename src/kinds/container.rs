// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Attributes describing the single main container of a pod.

use crate::attributes::AttributeGraph;
use crate::document::env::expand_env_sorted;
use crate::error::DefinitionError;
use serde_json::{json, Value};

pub fn install(graph: &mut AttributeGraph) {
    graph
        .define("container_name", |s| s.get("name"))
        .required("image_name")
        .optional("image_tag", "latest")
        .define("image", |s| {
            let name = s
                .get_str("image_name")?
                .ok_or_else(|| DefinitionError::MissingAttribute("image_name".to_string()))?;
            Ok(match s.get_str("image_tag")? {
                Some(tag) => json!(format!("{}:{}", name, tag)),
                None => json!(name),
            })
        })
        .optional("image_pull_policy", Value::Null)
        .optional("command", json!([]))
        .optional("args", json!([]))
        .optional("ports", json!([]))
        .optional("env", json!({}))
        .define("container_env", |s| {
            let env = s.get_map("env")?;
            expand_env_sorted(&env)
        })
        .optional("volume_mounts", json!([]))
        .optional("cpu_limit", Value::Null)
        .optional("mem_limit", Value::Null)
        .define("cpu_request", |s| s.get("cpu_limit"))
        .define("mem_request", |s| s.get("mem_limit"))
        .define("resource_requests", |s| {
            s.compact(&[("cpu", "cpu_request"), ("memory", "mem_request")])
        })
        .define("resource_limits", |s| {
            s.compact(&[("cpu", "cpu_limit"), ("memory", "mem_limit")])
        })
        .define("resources", |s| {
            s.compact(&[("requests", "resource_requests"), ("limits", "resource_limits")])
        })
        .define("container", |s| {
            s.compact(&[
                ("name", "container_name"),
                ("image", "image"),
                ("imagePullPolicy", "image_pull_policy"),
                ("command", "command"),
                ("args", "args"),
                ("ports", "ports"),
                ("env", "container_env"),
                ("volumeMounts", "volume_mounts"),
                ("resources", "resources"),
            ])
        })
        .define("containers", |s| Ok(json!([s.get("container")?])));
}
