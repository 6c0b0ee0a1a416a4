// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::{poll, DEFAULT_NAMESPACE};
use crate::convergence::{ConvergeOptions, PollSettings};
use anyhow::{Context, Result};
use std::env;
use std::fmt::Debug;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Tool configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// YAML file listing the resources to converge
    pub declarations: PathBuf,
    /// Namespace for declarations that do not name one
    pub default_namespace: String,
    pub options: ConvergeOptions,
    pub poll: PollSettings,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let declarations = var("KEEL_DECLARATIONS")
            .map(PathBuf::from)
            .context("KEEL_DECLARATIONS environment variable not set")?;
        let default_namespace =
            var("KEEL_DEFAULT_NAMESPACE").unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

        let defaults = ConvergeOptions::default();
        let options = ConvergeOptions {
            recreate: parse(&var, "KEEL_RECREATE", defaults.recreate),
            allow_recreate: parse(&var, "KEEL_ALLOW_RECREATE", defaults.allow_recreate),
            dry_run: parse(&var, "KEEL_DRY_RUN", defaults.dry_run),
            wait_ready: parse(&var, "KEEL_WAIT_READY", defaults.wait_ready),
        };

        let poll = PollSettings {
            interval: Duration::from_millis(parse(&var, "KEEL_POLL_INTERVAL_MS", poll::INTERVAL_MS)),
            delete_timeout: Duration::from_secs(parse(
                &var,
                "KEEL_DELETE_TIMEOUT_SECS",
                poll::DELETE_TIMEOUT_SECS,
            )),
            ready_retries: at_least_one(
                "KEEL_READY_RETRIES",
                parse(&var, "KEEL_READY_RETRIES", poll::READY_RETRIES),
            ),
        };

        Ok(Config {
            declarations,
            default_namespace,
            options,
            poll,
        })
    }
}

/// Parse an optional variable, keeping the default when it is unset or invalid.
fn parse<T>(var: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> T
where
    T: FromStr + Debug,
{
    let Some(raw) = var(name) else {
        return default;
    };
    raw.trim().parse().unwrap_or_else(|_| {
        warn!("{} has an invalid value '{}', using {:?}", name, raw, default);
        default
    })
}

/// Readiness is always observed at least once.
fn at_least_one(name: &str, value: u32) -> u32 {
    if value == 0 {
        warn!("{} must be at least 1, using 1", name);
        return 1;
    }
    value
}
