// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::time::Duration;
use thiserror::Error;

/// Errors raised while evaluating a resource definition.
///
/// These are never retried: they point at a defect in the definition itself.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DefinitionError {
    #[error("Attribute '{0}' is required but was never defined")]
    MissingAttribute(String),

    #[error("Cyclic attribute evaluation: {}", .0.join(" -> "))]
    CyclicAttribute(Vec<String>),

    #[error("Attribute '{0}' is not defined")]
    UndefinedAttribute(String),

    #[error("Attribute '{0}' does not override an earlier definition")]
    NoOverriddenDefinition(String),

    #[error("Attribute '{name}' has an unexpected value: {reason}")]
    InvalidAttribute { name: String, reason: String },

    #[error("Invalid document fragment: {0}")]
    InvalidFragment(String),

    #[error("No definition registered for {kind} '{name}'")]
    UnknownDefinition { kind: String, name: String },
}

/// Errors raised by a cluster client.
#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Failed to convert document: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Kind '{0}' is not supported")]
    UnsupportedKind(String),

    #[error("Document has no kind or name")]
    UnidentifiedDocument,
}

#[derive(Error, Debug)]
pub enum KeelError {
    #[error("Definition error: {0}")]
    Definition(#[from] DefinitionError),

    #[error("Cluster query failed: {0}")]
    ClusterQuery(#[from] ClusterError),

    #[error("Recreation required but not allowed: {0}")]
    ConvergenceConflict(String),

    #[error("Timed out after {after:?} waiting for {waiting_for}")]
    Timeout {
        waiting_for: String,
        after: Duration,
    },
}

pub type Result<T> = std::result::Result<T, KeelError>;
