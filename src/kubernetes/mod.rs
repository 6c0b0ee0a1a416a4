// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Access to the live cluster: the client trait and its Kubernetes API implementation.

pub mod client;
pub mod cluster;

pub use client::KubeClusterClient;
pub use cluster::{ClusterClient, ClusterResult};
