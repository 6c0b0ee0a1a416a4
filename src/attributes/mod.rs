// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Attribute composition for resource definitions.

pub mod graph;

pub use graph::{AttributeGraph, EvalResult, Evaluator, NodeId, Scope};

/// Name of the attribute that renders the complete resource document.
pub const ROOT: &str = "document";
