// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Lazily evaluated, memoized, overridable attributes.
//!
//! Every attribute is a node holding a stack of evaluators. Defining an
//! attribute that already exists pushes a new layer on top, and evaluation
//! always starts at the top layer. A layer can reach the one beneath it
//! through [`Scope::overridden`], which is how a definition extends the
//! value it shadows instead of replacing it.

use crate::document::compact_map;
use crate::error::DefinitionError;
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

pub type EvalResult = std::result::Result<Value, DefinitionError>;

/// A single definition layer of an attribute.
pub type Evaluator = Arc<dyn Fn(&mut Scope<'_>) -> EvalResult + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

struct Node {
    name: String,
    layers: Vec<Evaluator>,
}

#[derive(Default)]
pub struct AttributeGraph {
    nodes: Vec<Node>,
    ids: HashMap<String, NodeId>,
    memo: HashMap<NodeId, Value>,
    edges: HashMap<NodeId, BTreeSet<NodeId>>,
    /// Node layers currently on the evaluation stack, outermost first
    in_progress: Vec<(NodeId, usize)>,
}

fn layer<F>(evaluator: F) -> Evaluator
where
    F: Fn(&mut Scope<'_>) -> EvalResult + Send + Sync + 'static,
{
    Arc::new(evaluator)
}

impl AttributeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define an attribute, or override it if it already exists.
    pub fn define<F>(&mut self, name: &str, evaluator: F) -> &mut Self
    where
        F: Fn(&mut Scope<'_>) -> EvalResult + Send + Sync + 'static,
    {
        let id = self.node_id_or_insert(name);
        self.nodes[id.0].layers.push(layer(evaluator));
        self.invalidate();
        self
    }

    /// Define an attribute with a constant value.
    pub fn define_value(&mut self, name: &str, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        self.define(name, move |_| Ok(value.clone()))
    }

    /// Declare an attribute that must be overridden before it is evaluated.
    ///
    /// The failing layer always sits at the bottom of the stack, so an
    /// override registered earlier still wins.
    pub fn required(&mut self, name: &str) -> &mut Self {
        let id = self.node_id_or_insert(name);
        let missing = name.to_string();
        self.nodes[id.0].layers.insert(
            0,
            layer(move |_| Err(DefinitionError::MissingAttribute(missing.clone()))),
        );
        self.invalidate();
        self
    }

    /// Declare an attribute with a default value.
    pub fn optional(&mut self, name: &str, default: impl Into<Value>) -> &mut Self {
        self.define_value(name, default)
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.ids.contains_key(name)
    }

    /// Evaluate an attribute, returning the memoized value when available.
    pub fn evaluate(&mut self, name: &str) -> EvalResult {
        let id = self.lookup(name)?;
        self.evaluate_node(id)
    }

    /// Names of the attributes `name` referenced during its last evaluation.
    pub fn dependencies(&self, name: &str) -> Result<Vec<String>, DefinitionError> {
        let id = self.lookup(name)?;
        Ok(self
            .edges
            .get(&id)
            .map(|deps| deps.iter().map(|dep| self.nodes[dep.0].name.clone()).collect())
            .unwrap_or_default())
    }

    fn lookup(&self, name: &str) -> Result<NodeId, DefinitionError> {
        self.ids
            .get(name)
            .copied()
            .ok_or_else(|| DefinitionError::UndefinedAttribute(name.to_string()))
    }

    fn node_id_or_insert(&mut self, name: &str) -> NodeId {
        if let Some(id) = self.ids.get(name) {
            return *id;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name: name.to_string(),
            layers: Vec::new(),
        });
        self.ids.insert(name.to_string(), id);
        id
    }

    fn invalidate(&mut self) {
        self.memo.clear();
        self.edges.clear();
    }

    fn evaluate_node(&mut self, id: NodeId) -> EvalResult {
        if let Some(value) = self.memo.get(&id) {
            return Ok(value.clone());
        }

        let Some(top) = self.nodes[id.0].layers.len().checked_sub(1) else {
            return Err(DefinitionError::UndefinedAttribute(
                self.nodes[id.0].name.clone(),
            ));
        };

        let value = self.evaluate_layer(id, top)?;
        self.memo.insert(id, value.clone());
        Ok(value)
    }

    fn evaluate_layer(&mut self, id: NodeId, layer: usize) -> EvalResult {
        if let Some(start) = self.in_progress.iter().position(|entry| *entry == (id, layer)) {
            let mut chain: Vec<String> = self.in_progress[start..]
                .iter()
                .map(|(node, _)| self.nodes[node.0].name.clone())
                .collect();
            chain.push(self.nodes[id.0].name.clone());
            return Err(DefinitionError::CyclicAttribute(chain));
        }

        let evaluator = Arc::clone(&self.nodes[id.0].layers[layer]);
        self.in_progress.push((id, layer));
        let result = evaluator(&mut Scope {
            graph: self,
            node: id,
            layer,
        });
        self.in_progress.pop();
        result
    }
}

impl fmt::Debug for AttributeGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeGraph")
            .field(
                "attributes",
                &self.nodes.iter().map(|n| n.name.as_str()).collect::<Vec<_>>(),
            )
            .field("memoized", &self.memo.len())
            .finish()
    }
}

/// Evaluation context handed to an evaluator.
pub struct Scope<'g> {
    graph: &'g mut AttributeGraph,
    node: NodeId,
    layer: usize,
}

impl Scope<'_> {
    /// Name of the attribute being evaluated
    pub fn name(&self) -> &str {
        &self.graph.nodes[self.node.0].name
    }

    /// Evaluate a sibling attribute.
    pub fn get(&mut self, name: &str) -> EvalResult {
        let dependency = self.graph.lookup(name)?;
        self.graph
            .edges
            .entry(self.node)
            .or_default()
            .insert(dependency);
        self.graph.evaluate_node(dependency)
    }

    /// Evaluate the definition this layer overrides.
    pub fn overridden(&mut self) -> EvalResult {
        match self.layer.checked_sub(1) {
            Some(below) => self.graph.evaluate_layer(self.node, below),
            None => Err(DefinitionError::NoOverriddenDefinition(
                self.name().to_string(),
            )),
        }
    }

    /// Evaluate a sibling as an optional string. Numbers and booleans are
    /// rendered as their JSON text.
    pub fn get_str(&mut self, name: &str) -> Result<Option<String>, DefinitionError> {
        match self.get(name)? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            Value::Number(n) => Ok(Some(n.to_string())),
            Value::Bool(b) => Ok(Some(b.to_string())),
            other => Err(invalid(name, "a string", &other)),
        }
    }

    /// Evaluate a sibling as a map; null evaluates to an empty map.
    pub fn get_map(&mut self, name: &str) -> Result<Map<String, Value>, DefinitionError> {
        match self.get(name)? {
            Value::Null => Ok(Map::new()),
            Value::Object(map) => Ok(map),
            other => Err(invalid(name, "a map", &other)),
        }
    }

    /// Evaluate a sibling as a list; null evaluates to an empty list.
    pub fn get_list(&mut self, name: &str) -> Result<Vec<Value>, DefinitionError> {
        match self.get(name)? {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => Ok(items),
            other => Err(invalid(name, "a list", &other)),
        }
    }

    /// Build a compact map from `(key, attribute)` pairs, dropping blank values.
    pub fn compact(&mut self, fields: &[(&str, &str)]) -> EvalResult {
        let mut entries = Vec::with_capacity(fields.len());
        for (key, attribute) in fields {
            entries.push((*key, self.get(attribute)?));
        }
        Ok(compact_map(entries))
    }
}

fn invalid(name: &str, expected: &str, got: &Value) -> DefinitionError {
    DefinitionError::InvalidAttribute {
        name: name.to_string(),
        reason: format!("expected {}, got {}", expected, got),
    }
}
