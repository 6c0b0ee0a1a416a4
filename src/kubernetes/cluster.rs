// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The operations convergence needs from a cluster.

use crate::diff::Change;
use crate::document::{Document, ResourceId};
use crate::error::ClusterError;
use async_trait::async_trait;
use std::sync::Arc;

pub type ClusterResult<T> = std::result::Result<T, ClusterError>;

#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Fetch the live document, or None when the resource does not exist.
    async fn get(&self, id: &ResourceId) -> ClusterResult<Option<Document>>;

    async fn create(&self, document: &Document) -> ClusterResult<()>;

    /// Apply the given changes in place. `desired` is the full rendered
    /// document the changes were computed against.
    async fn patch(
        &self,
        id: &ResourceId,
        changes: &[Change],
        desired: &Document,
    ) -> ClusterResult<()>;

    /// Delete the resource. Deleting a missing resource succeeds.
    async fn delete(&self, id: &ResourceId) -> ClusterResult<()>;
}

#[async_trait]
impl<T: ClusterClient + ?Sized> ClusterClient for Arc<T> {
    async fn get(&self, id: &ResourceId) -> ClusterResult<Option<Document>> {
        (**self).get(id).await
    }

    async fn create(&self, document: &Document) -> ClusterResult<()> {
        (**self).create(document).await
    }

    async fn patch(
        &self,
        id: &ResourceId,
        changes: &[Change],
        desired: &Document,
    ) -> ClusterResult<()> {
        (**self).patch(id, changes, desired).await
    }

    async fn delete(&self, id: &ResourceId) -> ClusterResult<()> {
        (**self).delete(id).await
    }
}
