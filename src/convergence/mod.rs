// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Bringing live cluster resources to their declared state.

pub mod engine;
pub mod poll;
pub mod result;

pub use engine::ConvergenceEngine;
pub use poll::PollSettings;
pub use result::{Action, ConvergeOptions, ConvergenceResult, Outcome};
