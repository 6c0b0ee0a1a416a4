// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{bail, Result};
use kube::Client;
use std::sync::Arc;
use tracing::{error, info};

use keel::config::Config;
use keel::convergence::ConvergenceEngine;
use keel::kinds::Registry;
use keel::kubernetes::KubeClusterClient;
use keel::loader::load_declarations;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting keel");

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: declarations={}, default_namespace={}, options={:?}",
        config.declarations.display(),
        config.default_namespace,
        config.options
    );

    let declarations = load_declarations(&config.declarations, &config.default_namespace)?;

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    let engine = ConvergenceEngine::new(
        KubeClusterClient::new(client),
        Arc::new(Registry::with_builtin_kinds()),
        config.poll,
    );

    let results = engine.converge_all(&declarations, config.options).await;

    let mut failed = 0;
    for result in &results {
        if result.is_failed() {
            failed += 1;
            error!("{}", result);
        } else {
            info!("{}", result);
        }
        for change in result.changes() {
            info!("  {}", change);
        }
    }

    if failed > 0 {
        bail!("{} of {} resource(s) failed to converge", failed, results.len());
    }
    info!("All {} resource(s) converged", results.len());
    Ok(())
}
