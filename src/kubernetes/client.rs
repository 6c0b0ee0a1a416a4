// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cluster client backed by the Kubernetes API.

use crate::constants::FIELD_MANAGER;
use crate::diff::{merge_patch, Change};
use crate::document::{Document, ResourceId};
use crate::error::ClusterError;
use crate::kubernetes::cluster::{ClusterClient, ClusterResult};
use crate::policy::{policy_for, KindPolicy};
use async_trait::async_trait;
use kube::{
    api::{ApiResource, DeleteParams, DynamicObject, Patch, PatchParams, PostParams},
    Api, Client,
};
use tracing::{debug, info, instrument};

/// Talks to the API server through dynamically typed objects, resolving
/// each kind's API group and resource name from the policy table.
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, kind: &str, namespace: &str) -> ClusterResult<Api<DynamicObject>> {
        let policy =
            policy_for(kind).ok_or_else(|| ClusterError::UnsupportedKind(kind.to_string()))?;
        Ok(Api::namespaced_with(
            self.client.clone(),
            namespace,
            &api_resource(policy),
        ))
    }
}

/// API coordinates for a kind.
pub fn api_resource(policy: &KindPolicy) -> ApiResource {
    ApiResource {
        group: policy.group.to_string(),
        version: policy.version.to_string(),
        api_version: policy.api_version(),
        kind: policy.kind.to_string(),
        plural: policy.plural.to_string(),
    }
}

fn post_params() -> PostParams {
    PostParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..Default::default()
    }
}

fn patch_params() -> PatchParams {
    PatchParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..Default::default()
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    #[instrument(skip(self), fields(resource = %id))]
    async fn get(&self, id: &ResourceId) -> ClusterResult<Option<Document>> {
        let api = self.api(&id.kind, &id.namespace)?;

        match api.get_opt(&id.name).await? {
            Some(object) => {
                debug!("Found live object");
                Ok(Some(serde_json::to_value(object)?))
            }
            None => {
                debug!("Object does not exist");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, document))]
    async fn create(&self, document: &Document) -> ClusterResult<()> {
        let id = ResourceId::from_document(document).ok_or(ClusterError::UnidentifiedDocument)?;
        let api = self.api(&id.kind, &id.namespace)?;
        let object: DynamicObject = serde_json::from_value(document.clone())?;

        api.create(&post_params(), &object).await?;
        info!("Created {}", id);
        Ok(())
    }

    #[instrument(skip(self, changes, desired), fields(resource = %id, changes = changes.len()))]
    async fn patch(
        &self,
        id: &ResourceId,
        changes: &[Change],
        desired: &Document,
    ) -> ClusterResult<()> {
        let api = self.api(&id.kind, &id.namespace)?;
        let patch = merge_patch(changes, desired);
        debug!("Merge patch: {}", patch);

        api.patch(&id.name, &patch_params(), &Patch::Merge(&patch))
            .await?;
        info!("Patched {}", id);
        Ok(())
    }

    #[instrument(skip(self), fields(resource = %id))]
    async fn delete(&self, id: &ResourceId) -> ClusterResult<()> {
        let api = self.api(&id.kind, &id.namespace)?;

        match api.delete(&id.name, &DeleteParams::default()).await {
            Ok(_) => {
                info!("Deleted {}", id);
                Ok(())
            }
            Err(kube::Error::Api(err)) if err.code == 404 => {
                debug!("{} already gone", id);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
