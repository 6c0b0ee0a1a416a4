// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
pub mod attributes;
pub mod config;
pub mod constants;
pub mod convergence;
pub mod diff;
pub mod document;
pub mod error;
pub mod kinds;
pub mod kubernetes;
pub mod loader;
pub mod policy;

#[cfg(test)]
mod test_utils;
