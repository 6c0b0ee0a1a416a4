// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::diff::Change;
use crate::document::ResourceId;
use crate::error::KeelError;
use std::fmt;

/// Caller controls for a convergence run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvergeOptions {
    /// Delete and create even when the live resource could be patched
    pub recreate: bool,
    /// Permit delete-then-create when a patch cannot express the changes
    pub allow_recreate: bool,
    /// Compute and report the plan without mutating the cluster
    pub dry_run: bool,
    /// After creating, wait for the resource to become ready
    pub wait_ready: bool,
}

impl Default for ConvergeOptions {
    fn default() -> Self {
        Self {
            recreate: false,
            allow_recreate: true,
            dry_run: false,
            wait_ready: false,
        }
    }
}

/// Step of a convergence run, reported with failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Render,
    Fetch,
    Create,
    Patch,
    Recreate,
    Delete,
    AwaitDeletion,
    AwaitReady,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Render => "render",
            Action::Fetch => "fetch",
            Action::Create => "create",
            Action::Patch => "patch",
            Action::Recreate => "recreate",
            Action::Delete => "delete",
            Action::AwaitDeletion => "await deletion",
            Action::AwaitReady => "await readiness",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub enum Outcome {
    /// The resource did not exist and was created
    Created,
    /// The live resource already matched its definition
    Unchanged,
    /// The listed changes were applied in place
    Patched { changes: Vec<Change> },
    /// The resource was deleted and created again
    Recreated { changes: Vec<Change> },
    Failed { action: Action, error: KeelError },
}

/// What happened to one declared resource.
#[derive(Debug)]
pub struct ConvergenceResult {
    pub resource: ResourceId,
    pub outcome: Outcome,
    /// Set when the outcome was planned but not applied
    pub dry_run: bool,
}

impl ConvergenceResult {
    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, Outcome::Failed { .. })
    }

    pub fn changes(&self) -> &[Change] {
        match &self.outcome {
            Outcome::Patched { changes } | Outcome::Recreated { changes } => changes,
            _ => &[],
        }
    }
}

impl fmt::Display for ConvergenceResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plan = if self.dry_run { " (dry run)" } else { "" };
        match &self.outcome {
            Outcome::Created => write!(f, "{}: created{}", self.resource, plan),
            Outcome::Unchanged => write!(f, "{}: unchanged", self.resource),
            Outcome::Patched { changes } => write!(
                f,
                "{}: patched {} field(s){}",
                self.resource,
                changes.len(),
                plan
            ),
            Outcome::Recreated { changes } => write!(
                f,
                "{}: recreated with {} change(s){}",
                self.resource,
                changes.len(),
                plan
            ),
            Outcome::Failed { action, error } => {
                write!(f, "{}: failed to {}: {}", self.resource, action, error)
            }
        }
    }
}
