// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Resource declarations and the registry that turns them into attribute graphs.

pub mod base;
pub mod container;
pub mod pod;
pub mod replica_set;

use crate::attributes::{AttributeGraph, ROOT};
use crate::constants::DEFAULT_NAMESPACE;
use crate::document::{Document, ResourceId};
use crate::error::DefinitionError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A resource to converge: which definition to use and the attribute
/// overrides to apply on top of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl Declaration {
    pub fn new(kind: &str, name: &str) -> Self {
        Self {
            kind: kind.to_string(),
            name: name.to_string(),
            namespace: None,
            attributes: Map::new(),
        }
    }

    pub fn namespace(mut self, namespace: &str) -> Self {
        self.namespace = Some(namespace.to_string());
        self
    }

    pub fn attribute(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    /// Identity as declared, before rendering.
    pub fn id(&self) -> ResourceId {
        ResourceId::new(
            &self.kind,
            &self.name,
            self.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE),
        )
    }
}

/// Installs attribute definitions into a graph.
pub type Constructor = Arc<dyn Fn(&mut AttributeGraph) + Send + Sync>;

/// Explicit mapping from kinds and named definitions to their constructors.
///
/// A declaration is instantiated from its kind's base constructor, then the
/// constructor registered for its exact kind and name, then its own
/// attribute overrides.
#[derive(Clone, Default)]
pub struct Registry {
    kinds: HashMap<String, Constructor>,
    definitions: HashMap<(String, String), Constructor>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with base constructors for Pod, ReplicaSet and ReplicationController.
    pub fn with_builtin_kinds() -> Self {
        let mut registry = Self::new();
        registry
            .register_kind("Pod", pod::install)
            .register_kind("ReplicaSet", replica_set::install)
            .register_kind(
                "ReplicationController",
                replica_set::install_replication_controller,
            );
        registry
    }

    pub fn register_kind<F>(&mut self, kind: &str, constructor: F) -> &mut Self
    where
        F: Fn(&mut AttributeGraph) + Send + Sync + 'static,
    {
        self.kinds.insert(kind.to_string(), Arc::new(constructor));
        self
    }

    pub fn register<F>(&mut self, kind: &str, name: &str, constructor: F) -> &mut Self
    where
        F: Fn(&mut AttributeGraph) + Send + Sync + 'static,
    {
        self.definitions
            .insert((kind.to_string(), name.to_string()), Arc::new(constructor));
        self
    }

    /// Build the attribute graph for a declaration.
    pub fn instantiate(&self, declaration: &Declaration) -> Result<AttributeGraph, DefinitionError> {
        let base = self.kinds.get(&declaration.kind);
        let named = self
            .definitions
            .get(&(declaration.kind.clone(), declaration.name.clone()));

        if base.is_none() && named.is_none() {
            return Err(DefinitionError::UnknownDefinition {
                kind: declaration.kind.clone(),
                name: declaration.name.clone(),
            });
        }

        let mut graph = AttributeGraph::new();
        for constructor in base.into_iter().chain(named) {
            constructor(&mut graph);
        }

        graph.define_value("name", declaration.name.as_str());
        if let Some(namespace) = &declaration.namespace {
            graph.define_value("namespace", namespace.as_str());
        }
        for (attribute, value) in &declaration.attributes {
            graph.define_value(attribute, value.clone());
        }

        Ok(graph)
    }

    /// Render the complete document for a declaration.
    pub fn render(&self, declaration: &Declaration) -> Result<Document, DefinitionError> {
        self.instantiate(declaration)?.evaluate(ROOT)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("kinds", &self.kinds.keys().collect::<Vec<_>>())
            .field("definitions", &self.definitions.keys().collect::<Vec<_>>())
            .finish()
    }
}
