// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Attributes shared by every kind: identity, metadata and the root document.

use crate::attributes::{AttributeGraph, ROOT};
use crate::constants::DEFAULT_NAMESPACE;
use serde_json::json;

pub fn install(graph: &mut AttributeGraph, api_version: &str, kind: &str) {
    graph
        .optional("api_version", api_version)
        .optional("kind", kind)
        .required("name")
        .optional("namespace", DEFAULT_NAMESPACE)
        .optional("labels", json!({}))
        .optional("annotations", json!({}))
        .define("metadata", |s| {
            s.compact(&[
                ("name", "name"),
                ("namespace", "namespace"),
                ("labels", "labels"),
                ("annotations", "annotations"),
            ])
        })
        .required("spec")
        .define(ROOT, |s| {
            s.compact(&[
                ("apiVersion", "api_version"),
                ("kind", "kind"),
                ("metadata", "metadata"),
                ("spec", "spec"),
            ])
        });
}
