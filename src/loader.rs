// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Reading resource declarations from YAML.

use crate::kinds::Declaration;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Load the declaration list stored at `path`.
pub fn load_declarations(path: &Path, default_namespace: &str) -> Result<Vec<Declaration>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read declarations from {}", path.display()))?;
    parse_declarations(&text, default_namespace)
        .with_context(|| format!("Invalid declarations in {}", path.display()))
}

/// Parse a YAML sequence of declarations, filling in the namespace of those
/// that do not name one.
pub fn parse_declarations(yaml: &str, default_namespace: &str) -> Result<Vec<Declaration>> {
    let mut declarations: Vec<Declaration> =
        serde_yaml::from_str(yaml).context("Failed to parse declaration list")?;

    for declaration in &mut declarations {
        if declaration.namespace.is_none() {
            declaration.namespace = Some(default_namespace.to_string());
        }
        debug!("Declared {}", declaration.id());
    }

    Ok(declarations)
}
