// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Bounded polling for deletion and readiness.

use crate::constants::poll::{DELETE_TIMEOUT_SECS, INTERVAL_MS, READY_RETRIES};
use crate::document::{Document, ResourceId};
use crate::error::{KeelError, Result};
use crate::kubernetes::ClusterClient;
use crate::policy::Readiness;
use serde_json::Value;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Pause between observations
    pub interval: Duration,
    /// Upper bound on waiting for a deleted resource to disappear
    pub delete_timeout: Duration,
    /// Number of readiness observations before giving up
    pub ready_retries: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(INTERVAL_MS),
            delete_timeout: Duration::from_secs(DELETE_TIMEOUT_SECS),
            ready_retries: READY_RETRIES,
        }
    }
}

/// Wait until `id` can no longer be read from the cluster.
pub async fn wait_for_deletion<C: ClusterClient + ?Sized>(
    client: &C,
    id: &ResourceId,
    settings: &PollSettings,
) -> Result<()> {
    let deadline = deletion_deadline(Instant::now(), settings.delete_timeout);

    loop {
        if client.get(id).await?.is_none() {
            info!("{} is gone", id);
            return Ok(());
        }
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(KeelError::Timeout {
                waiting_for: format!("{} to be deleted", id),
                after: settings.delete_timeout,
            });
        }

        debug!("{} still terminating, waiting {:?}", id, settings.interval);
        sleep(settings.interval).await;
    }
}

/// Deadline for a deletion wait. None when the timeout reaches past what an
/// `Instant` can represent, in which case the wait is unbounded.
fn deletion_deadline(start: Instant, timeout: Duration) -> Option<Instant> {
    start.checked_add(timeout)
}

/// Time spent sleeping between readiness observations.
fn ready_budget(settings: &PollSettings) -> Duration {
    settings
        .interval
        .saturating_mul(settings.ready_retries.max(1) - 1)
}

/// Wait until `id` satisfies its readiness rule, observing at most
/// `ready_retries` times and at least once.
pub async fn wait_until_ready<C: ClusterClient + ?Sized>(
    client: &C,
    id: &ResourceId,
    readiness: Readiness,
    settings: &PollSettings,
) -> Result<()> {
    let attempts = settings.ready_retries.max(1);

    for attempt in 1..=attempts {
        if let Some(live) = client.get(id).await? {
            if is_ready(&live, readiness) {
                info!("{} is ready", id);
                return Ok(());
            }
        }
        if attempt == attempts {
            break;
        }

        debug!(
            "{} not ready (attempt {}/{}), waiting {:?}",
            id, attempt, attempts, settings.interval
        );
        sleep(settings.interval).await;
    }

    Err(KeelError::Timeout {
        waiting_for: format!("{} to become ready", id),
        after: ready_budget(settings),
    })
}

/// Whether a live document satisfies a readiness rule.
pub fn is_ready(live: &Document, readiness: Readiness) -> bool {
    match readiness {
        Readiness::Immediate => true,
        Readiness::PodRunning => {
            let phase = live.pointer("/status/phase").and_then(Value::as_str);
            let statuses = live
                .pointer("/status/containerStatuses")
                .and_then(Value::as_array);

            phase == Some("Running")
                && statuses.is_some_and(|statuses| {
                    !statuses.is_empty()
                        && statuses
                            .iter()
                            .all(|s| s.get("ready").and_then(Value::as_bool) == Some(true))
                })
        }
        Readiness::ReplicasReady => {
            let wanted = live
                .pointer("/spec/replicas")
                .and_then(Value::as_u64)
                .unwrap_or(1);
            let ready = live
                .pointer("/status/readyReplicas")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            ready == wanted
        }
    }
}
