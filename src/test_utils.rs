// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities: an HTTP-level Kubernetes API mock and an in-memory cluster.

use crate::diff::{merge_patch, Change};
use crate::document::{Document, ResourceId};
use crate::error::ClusterError;
use crate::kubernetes::{ClusterClient, ClusterResult};
use async_trait::async_trait;
use http::{Request, Response};
use kube::client::Body;
use kube::error::ErrorResponse;
use kube::Client;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

/// A mock HTTP service that returns predefined responses based on request paths.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
    requests: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()), (status, body.to_string()));
        self
    }

    /// Add a response for GET requests matching the exact path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    /// Add a response for POST requests matching the exact path
    pub fn on_post(self, path: &str, status: u16, body: &str) -> Self {
        self.on("POST", path, status, body)
    }

    pub fn on_patch(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PATCH", path, status, body)
    }

    pub fn on_delete(self, path: &str, status: u16, body: &str) -> Self {
        self.on("DELETE", path, status, body)
    }

    /// Method and path of every request received so far
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        self.responses
            .lock()
            .unwrap()
            .get(&(method.to_string(), path.to_string()))
            .cloned()
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        let response = self.find_response(&method, &path);
        self.requests.lock().unwrap().push((method, path));

        Box::pin(async move {
            let (status, body) = response.unwrap_or_else(|| (404, not_found_json()));
            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

fn not_found_json() -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": "not found",
        "reason": "NotFound",
        "code": 404
    })
    .to_string()
}

/// A pod JSON body with one container, optionally carrying a status phase
pub fn pod_json(name: &str, namespace: &str, phase: Option<&str>) -> String {
    let mut pod = serde_json::json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "uid": "test-uid",
            "resourceVersion": "1"
        },
        "spec": {
            "containers": [{ "name": "app", "image": "app:v1" }]
        }
    });
    if let Some(phase) = phase {
        pod["status"] = serde_json::json!({ "phase": phase });
    }
    pod.to_string()
}

fn api_error(code: u16, reason: &str, message: String) -> ClusterError {
    ClusterError::Kube(kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message,
        reason: reason.to_string(),
        code,
    }))
}

/// Apply an RFC 7386 merge patch.
pub fn apply_merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    let Value::Object(fields) = target else {
        return;
    };
    for (key, value) in patch {
        if value.is_null() {
            fields.remove(key);
        } else {
            apply_merge_patch(fields.entry(key.clone()).or_insert(Value::Null), value);
        }
    }
}

/// A cluster call observed by [`InMemoryCluster`].
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Get(ResourceId),
    Create(ResourceId),
    Patch(ResourceId, Vec<String>),
    Delete(ResourceId),
}

#[derive(Default)]
struct ClusterState {
    objects: BTreeMap<ResourceId, Document>,
    /// Deleted objects still visible for this many more reads
    terminating: HashMap<ResourceId, u32>,
    statuses: HashMap<ResourceId, Value>,
    operations: Vec<Operation>,
}

/// A cluster kept in memory, recording every call made against it.
#[derive(Default)]
pub struct InMemoryCluster {
    state: Mutex<ClusterState>,
    deletion_lag: u32,
    failing: Option<&'static str>,
}

impl InMemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(self, document: Document) -> Self {
        let id = ResourceId::from_document(&document).expect("document without identity");
        self.state.lock().unwrap().objects.insert(id, document);
        self
    }

    /// Keep deleted objects visible for `reads` more gets.
    pub fn with_deletion_lag(mut self, reads: u32) -> Self {
        self.deletion_lag = reads;
        self
    }

    /// Fail every call of the named operation ("get", "create", "patch", "delete").
    pub fn failing_on(mut self, operation: &'static str) -> Self {
        self.failing = Some(operation);
        self
    }

    /// Status attached to the object when it is created.
    pub fn with_status(self, id: ResourceId, status: Value) -> Self {
        self.state.lock().unwrap().statuses.insert(id, status);
        self
    }

    /// Change a stored object in place, as the API server or another writer would.
    pub fn edit(&self, id: &ResourceId, change: impl FnOnce(&mut Document)) {
        if let Some(object) = self.state.lock().unwrap().objects.get_mut(id) {
            change(object);
        }
    }

    pub fn object(&self, id: &ResourceId) -> Option<Document> {
        self.state.lock().unwrap().objects.get(id).cloned()
    }

    pub fn operations(&self) -> Vec<Operation> {
        self.state.lock().unwrap().operations.clone()
    }

    /// Operations other than reads
    pub fn mutations(&self) -> Vec<Operation> {
        self.operations()
            .into_iter()
            .filter(|op| !matches!(op, Operation::Get(_)))
            .collect()
    }

    fn check(&self, operation: &str) -> ClusterResult<()> {
        if self.failing == Some(operation) {
            return Err(api_error(
                500,
                "InternalError",
                format!("{} failed", operation),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterClient for InMemoryCluster {
    async fn get(&self, id: &ResourceId) -> ClusterResult<Option<Document>> {
        self.state.lock().unwrap().operations.push(Operation::Get(id.clone()));
        self.check("get")?;

        let mut state = self.state.lock().unwrap();
        match state.terminating.get(id).copied() {
            Some(0) => {
                state.terminating.remove(id);
                state.objects.remove(id);
                Ok(None)
            }
            Some(remaining) => {
                state.terminating.insert(id.clone(), remaining - 1);
                Ok(state.objects.get(id).cloned())
            }
            None => Ok(state.objects.get(id).cloned()),
        }
    }

    async fn create(&self, document: &Document) -> ClusterResult<()> {
        let id = ResourceId::from_document(document).ok_or(ClusterError::UnidentifiedDocument)?;
        self.state.lock().unwrap().operations.push(Operation::Create(id.clone()));
        self.check("create")?;

        let mut state = self.state.lock().unwrap();
        if state.objects.contains_key(&id) {
            return Err(api_error(409, "AlreadyExists", format!("{} already exists", id)));
        }
        let mut object = document.clone();
        if let Some(status) = state.statuses.get(&id) {
            object["status"] = status.clone();
        }
        state.objects.insert(id, object);
        Ok(())
    }

    async fn patch(
        &self,
        id: &ResourceId,
        changes: &[Change],
        desired: &Document,
    ) -> ClusterResult<()> {
        let paths = changes.iter().map(|c| c.path.to_string()).collect();
        self.state
            .lock()
            .unwrap()
            .operations
            .push(Operation::Patch(id.clone(), paths));
        self.check("patch")?;

        let mut state = self.state.lock().unwrap();
        let Some(object) = state.objects.get_mut(id) else {
            return Err(api_error(404, "NotFound", format!("{} not found", id)));
        };
        apply_merge_patch(object, &merge_patch(changes, desired));
        Ok(())
    }

    async fn delete(&self, id: &ResourceId) -> ClusterResult<()> {
        self.state.lock().unwrap().operations.push(Operation::Delete(id.clone()));
        self.check("delete")?;

        let mut state = self.state.lock().unwrap();
        if !state.objects.contains_key(id) {
            return Ok(());
        }
        if self.deletion_lag == 0 {
            state.objects.remove(id);
        } else {
            state.terminating.insert(id.clone(), self.deletion_lag);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_apply_merge_patch() {
        let mut target = json!({ "a": { "b": 1, "c": 2 }, "d": [1, 2] });
        apply_merge_patch(&mut target, &json!({ "a": { "b": null, "e": 3 }, "d": [3] }));

        assert_eq!(target, json!({ "a": { "c": 2, "e": 3 }, "d": [3] }));
    }
}
