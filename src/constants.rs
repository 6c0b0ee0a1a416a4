// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Field manager recorded on objects keel creates or patches
pub const FIELD_MANAGER: &str = "keel";

/// Annotation holding the document keel last applied
pub const LAST_APPLIED_ANNOTATION: &str = "keel.io/last-applied";

/// Namespace used when a declaration names none
pub const DEFAULT_NAMESPACE: &str = "default";

/// Polling used while waiting for deletion and readiness
pub mod poll {
    /// Interval between observations, in milliseconds
    pub const INTERVAL_MS: u64 = 1000;
    /// How long a deleted resource may take to disappear, in seconds
    pub const DELETE_TIMEOUT_SECS: u64 = 60;
    /// Number of readiness observations before giving up
    pub const READY_RETRIES: u32 = 60;
}
