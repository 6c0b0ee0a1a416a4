// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::convergence::poll::{wait_for_deletion, wait_until_ready, PollSettings};
use crate::convergence::result::{Action, ConvergeOptions, ConvergenceResult, Outcome};
use crate::diff::{diff, managed_state, touches_immutable, Change};
use crate::document::{last_applied, observed_state, with_last_applied, Document, ResourceId};
use crate::error::{ClusterError, DefinitionError, KeelError, Result};
use crate::kinds::{Declaration, Registry};
use crate::kubernetes::ClusterClient;
use crate::policy::{policy_for, KindPolicy, Readiness};
use futures::future::join_all;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Drives declared resources to their rendered state in a cluster.
pub struct ConvergenceEngine<C> {
    client: C,
    registry: Arc<Registry>,
    poll: PollSettings,
}

impl<C: ClusterClient> ConvergenceEngine<C> {
    pub fn new(client: C, registry: Arc<Registry>, poll: PollSettings) -> Self {
        Self {
            client,
            registry,
            poll,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Render the desired document for a declaration.
    pub fn render(&self, declaration: &Declaration) -> std::result::Result<Document, DefinitionError> {
        self.registry.render(declaration)
    }

    /// Changes that would bring the live resource to its desired state. An
    /// absent resource is compared against an empty document.
    #[instrument(skip(self, declaration), fields(resource = %declaration.id()))]
    pub async fn diff(&self, declaration: &Declaration) -> Result<Vec<Change>> {
        let desired = self.render(declaration)?;
        let (id, policy) = identify(&desired)?;

        Ok(match self.client.get(&id).await? {
            Some(live) => diff(&managed(&live, &desired, policy), &desired, policy),
            None => diff(&Value::Object(Map::new()), &desired, policy),
        })
    }

    /// Converge a single resource. Failures are reported in the result
    /// together with the step that failed.
    #[instrument(skip(self, declaration, options), fields(resource = %declaration.id(), dry_run = options.dry_run))]
    pub async fn converge(
        &self,
        declaration: &Declaration,
        options: ConvergeOptions,
    ) -> ConvergenceResult {
        let mut resource = declaration.id();
        let mut action = Action::Render;

        let outcome = match self
            .try_converge(declaration, options, &mut resource, &mut action)
            .await
        {
            Ok(outcome) => outcome,
            Err(error) => {
                error!("Failed to {} {}: {}", action, resource, error);
                Outcome::Failed { action, error }
            }
        };

        ConvergenceResult {
            resource,
            outcome,
            dry_run: options.dry_run,
        }
    }

    /// Converge resources concurrently. One failing resource does not stop
    /// the others.
    pub async fn converge_all(
        &self,
        declarations: &[Declaration],
        options: ConvergeOptions,
    ) -> Vec<ConvergenceResult> {
        info!("Converging {} resource(s)", declarations.len());
        join_all(
            declarations
                .iter()
                .map(|declaration| self.converge(declaration, options)),
        )
        .await
    }

    async fn try_converge(
        &self,
        declaration: &Declaration,
        options: ConvergeOptions,
        resource: &mut ResourceId,
        action: &mut Action,
    ) -> Result<Outcome> {
        let desired = self.render(declaration)?;
        let (id, policy) = identify(&desired)?;
        *resource = id.clone();

        *action = Action::Fetch;
        let Some(live) = self.client.get(&id).await? else {
            info!("{} does not exist, creating", id);
            if !options.dry_run {
                *action = Action::Create;
                self.client.create(&with_last_applied(&desired)).await?;
                self.await_ready(&id, policy, options, action).await?;
            }
            return Ok(Outcome::Created);
        };

        let current = managed(&live, &desired, policy);
        let changes = diff(&current, &desired, policy);
        for change in &changes {
            debug!("{}", change);
        }

        let must_recreate = !changes.is_empty()
            && (!policy.patchable || touches_immutable(&changes, policy));

        if !options.recreate && !must_recreate {
            if changes.is_empty() {
                info!("{} is up to date", id);
                return Ok(Outcome::Unchanged);
            }

            info!("Patching {} field(s) of {}", changes.len(), id);
            if !options.dry_run {
                *action = Action::Patch;
                let applied = with_last_applied(&desired);
                let patch = diff(&current, &applied, policy);
                self.client.patch(&id, &patch, &applied).await?;
            }
            return Ok(Outcome::Patched { changes });
        }

        if !options.recreate && !options.allow_recreate {
            *action = Action::Recreate;
            let fields: Vec<String> = changes.iter().map(|c| c.path.to_string()).collect();
            return Err(KeelError::ConvergenceConflict(format!(
                "{} cannot be patched in place (changed: {})",
                id,
                fields.join(", ")
            )));
        }

        warn!("Recreating {} ({} change(s))", id, changes.len());
        if !options.dry_run {
            *action = Action::Delete;
            self.client.delete(&id).await?;

            *action = Action::AwaitDeletion;
            wait_for_deletion(&self.client, &id, &self.poll).await?;

            *action = Action::Create;
            self.client.create(&with_last_applied(&desired)).await?;
            self.await_ready(&id, policy, options, action).await?;
        }

        Ok(Outcome::Recreated { changes })
    }

    async fn await_ready(
        &self,
        id: &ResourceId,
        policy: &KindPolicy,
        options: ConvergeOptions,
        action: &mut Action,
    ) -> Result<()> {
        if !options.wait_ready || policy.readiness == Readiness::Immediate {
            return Ok(());
        }

        *action = Action::AwaitReady;
        wait_until_ready(&self.client, id, policy.readiness, &self.poll).await
    }
}

/// The part of a live object keel manages, for a three-way comparison
/// against its definition. Fields keel never applied are left out, so they
/// are not reported as removed.
fn managed(live: &Document, desired: &Document, policy: &KindPolicy) -> Document {
    let previous = last_applied(live);
    managed_state(&observed_state(live), desired, previous.as_ref(), policy)
}

fn identify(desired: &Document) -> Result<(ResourceId, &'static KindPolicy)> {
    let id = ResourceId::from_document(desired).ok_or(ClusterError::UnidentifiedDocument)?;
    let policy =
        policy_for(&id.kind).ok_or_else(|| ClusterError::UnsupportedKind(id.kind.clone()))?;
    Ok((id, policy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::ChangeKind;
    use crate::test_utils::{InMemoryCluster, Operation};
    use serde_json::json;
    use std::time::Duration;

    fn fast() -> PollSettings {
        PollSettings {
            interval: Duration::from_millis(1),
            delete_timeout: Duration::from_millis(50),
            ready_retries: 3,
        }
    }

    fn engine(cluster: &Arc<InMemoryCluster>) -> ConvergenceEngine<Arc<InMemoryCluster>> {
        ConvergenceEngine::new(
            Arc::clone(cluster),
            Arc::new(Registry::with_builtin_kinds()),
            fast(),
        )
    }

    fn app_pod(image: &str) -> Declaration {
        Declaration::new("Pod", "app")
            .attribute("image", image)
            .attribute("cpu_limit", "250m")
            .attribute("mem_limit", "256Mi")
    }

    fn web_replica_set(replicas: u64) -> Declaration {
        Declaration::new("ReplicaSet", "web")
            .attribute("replicas", replicas)
            .attribute("match_labels", json!({ "app": "web" }))
            .attribute("image_name", "nginx")
    }

    fn pod_id() -> ResourceId {
        ResourceId::new("Pod", "app", "default")
    }

    fn with_live(declaration: &Declaration) -> Arc<InMemoryCluster> {
        let document = Registry::with_builtin_kinds().render(declaration).unwrap();
        Arc::new(InMemoryCluster::new().with_object(document))
    }

    #[tokio::test]
    async fn test_creates_absent_resource() {
        let cluster = Arc::new(InMemoryCluster::new());
        let engine = engine(&cluster);

        let result = engine
            .converge(&app_pod("app:v1"), ConvergeOptions::default())
            .await;

        assert!(matches!(result.outcome, Outcome::Created));
        assert_eq!(result.resource, pod_id());
        let created = cluster.object(&pod_id()).unwrap();
        assert_eq!(observed_state(&created), engine.render(&app_pod("app:v1")).unwrap());
        assert_eq!(last_applied(&created), Some(engine.render(&app_pod("app:v1")).unwrap()));
        assert_eq!(cluster.mutations(), vec![Operation::Create(pod_id())]);
    }

    #[tokio::test]
    async fn test_second_run_is_unchanged() {
        let cluster = Arc::new(InMemoryCluster::new());
        let engine = engine(&cluster);

        engine
            .converge(&app_pod("app:v1"), ConvergeOptions::default())
            .await;
        let result = engine
            .converge(&app_pod("app:v1"), ConvergeOptions::default())
            .await;

        assert!(matches!(result.outcome, Outcome::Unchanged));
        assert_eq!(cluster.mutations().len(), 1);
    }

    #[tokio::test]
    async fn test_server_populated_fields_do_not_count_as_changes() {
        let mut live = Registry::with_builtin_kinds()
            .render(&app_pod("app:v1"))
            .unwrap();
        live["metadata"]["uid"] = json!("4f1c");
        live["metadata"]["resourceVersion"] = json!("812");
        live["status"] = json!({ "phase": "Running" });
        let cluster = Arc::new(InMemoryCluster::new().with_object(live));

        let result = engine(&cluster)
            .converge(&app_pod("app:v1"), ConvergeOptions::default())
            .await;

        assert!(matches!(result.outcome, Outcome::Unchanged));
        assert!(cluster.mutations().is_empty());
    }

    fn add_server_defaults(pod: &mut Document) {
        pod["spec"]["containers"][0]["imagePullPolicy"] = json!("IfNotPresent");
        pod["spec"]["containers"][0]["terminationMessagePath"] = json!("/dev/termination-log");
        pod["spec"]["dnsPolicy"] = json!("ClusterFirst");
        pod["spec"]["schedulerName"] = json!("default-scheduler");
        pod["spec"]["volumes"] = json!([{ "name": "kube-api-access-x7k2p", "projected": {} }]);
        pod["status"] = json!({ "phase": "Running" });
    }

    #[tokio::test]
    async fn test_server_defaults_on_applied_pod_are_unchanged() {
        let cluster = Arc::new(InMemoryCluster::new());
        let engine = engine(&cluster);
        engine
            .converge(&app_pod("app:v1"), ConvergeOptions::default())
            .await;
        cluster.edit(&pod_id(), add_server_defaults);

        let result = engine
            .converge(&app_pod("app:v1"), ConvergeOptions::default())
            .await;

        assert!(matches!(result.outcome, Outcome::Unchanged));
        assert_eq!(cluster.mutations(), vec![Operation::Create(pod_id())]);
    }

    #[tokio::test]
    async fn test_server_defaults_without_last_applied_are_unchanged() {
        let mut live = Registry::with_builtin_kinds()
            .render(&app_pod("app:v1"))
            .unwrap();
        add_server_defaults(&mut live);
        let cluster = Arc::new(InMemoryCluster::new().with_object(live));

        let result = engine(&cluster)
            .converge(&app_pod("app:v1"), ConvergeOptions::default())
            .await;

        assert!(matches!(result.outcome, Outcome::Unchanged));
        assert!(cluster.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_server_defaults_in_replica_set_template_are_not_patched() {
        let cluster = Arc::new(InMemoryCluster::new());
        let engine = engine(&cluster);
        let id = ResourceId::new("ReplicaSet", "web", "default");
        engine
            .converge(&web_replica_set(2), ConvergeOptions::default())
            .await;
        cluster.edit(&id, |rs| {
            rs["spec"]["template"]["spec"]["dnsPolicy"] = json!("ClusterFirst");
            rs["spec"]["template"]["spec"]["containers"][0]["terminationMessagePolicy"] =
                json!("File");
            rs["status"] = json!({ "replicas": 2, "readyReplicas": 2 });
        });

        let result = engine
            .converge(&web_replica_set(2), ConvergeOptions::default())
            .await;

        assert!(matches!(result.outcome, Outcome::Unchanged));
        assert_eq!(cluster.mutations(), vec![Operation::Create(id)]);
    }

    #[tokio::test]
    async fn test_dropped_env_var_is_removed() {
        let cluster = Arc::new(InMemoryCluster::new());
        let engine = engine(&cluster);
        let id = ResourceId::new("ReplicaSet", "web", "default");
        engine
            .converge(
                &web_replica_set(2).attribute("env", json!({ "A": "1", "B": "2" })),
                ConvergeOptions::default(),
            )
            .await;

        let result = engine
            .converge(
                &web_replica_set(2).attribute("env", json!({ "A": "1" })),
                ConvergeOptions::default(),
            )
            .await;

        let Outcome::Patched { changes } = &result.outcome else {
            panic!("expected a patch, got {:?}", result.outcome);
        };
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::Removed);
        assert_eq!(
            changes[0].path.to_string(),
            "spec.template.spec.containers[0].env[1]"
        );
        assert_eq!(
            cluster.object(&id).unwrap()["spec"]["template"]["spec"]["containers"][0]["env"],
            json!([{ "name": "A", "value": "1" }])
        );
    }

    #[tokio::test]
    async fn test_dropped_annotations_are_removed() {
        let cluster = Arc::new(InMemoryCluster::new());
        let engine = engine(&cluster);
        let id = ResourceId::new("ReplicaSet", "web", "default");
        engine
            .converge(
                &web_replica_set(2).attribute("annotations", json!({ "team": "core" })),
                ConvergeOptions::default(),
            )
            .await;

        let result = engine
            .converge(&web_replica_set(2), ConvergeOptions::default())
            .await;

        assert!(matches!(result.outcome, Outcome::Patched { .. }));
        assert_eq!(result.changes()[0].path.to_string(), "metadata.annotations");
        let patched = cluster.object(&id).unwrap();
        assert!(patched["metadata"]["annotations"].get("team").is_none());
        assert_eq!(last_applied(&patched), Some(engine.render(&web_replica_set(2)).unwrap()));
        assert!(matches!(
            engine
                .converge(&web_replica_set(2), ConvergeOptions::default())
                .await
                .outcome,
            Outcome::Unchanged
        ));
    }

    #[tokio::test]
    async fn test_dry_run_patch_issues_no_patch() {
        let cluster = with_live(&web_replica_set(3));
        let options = ConvergeOptions {
            dry_run: true,
            ..Default::default()
        };

        let result = engine(&cluster).converge(&web_replica_set(5), options).await;

        assert!(matches!(result.outcome, Outcome::Patched { .. }));
        assert!(result.dry_run);
        assert!(cluster.mutations().is_empty());
        assert_eq!(
            cluster.object(&ResourceId::new("ReplicaSet", "web", "default")).unwrap()["spec"]
                ["replicas"],
            json!(3)
        );
    }

    #[tokio::test]
    async fn test_replication_controller_lifecycle() {
        let cluster = Arc::new(InMemoryCluster::new());
        let engine = engine(&cluster);
        let id = ResourceId::new("ReplicationController", "worker", "default");
        let controller = |replicas: u64| {
            Declaration::new("ReplicationController", "worker")
                .attribute("replicas", replicas)
                .attribute("match_labels", json!({ "app": "worker" }))
                .attribute("image_name", "worker")
                .attribute("image_tag", "2.1")
        };

        let created = engine.converge(&controller(1), ConvergeOptions::default()).await;
        let unchanged = engine.converge(&controller(1), ConvergeOptions::default()).await;
        let scaled = engine.converge(&controller(4), ConvergeOptions::default()).await;

        assert!(matches!(created.outcome, Outcome::Created));
        assert!(matches!(unchanged.outcome, Outcome::Unchanged));
        assert!(matches!(scaled.outcome, Outcome::Patched { .. }));
        let live = cluster.object(&id).unwrap();
        assert_eq!(live["apiVersion"], json!("v1"));
        assert_eq!(live["spec"]["replicas"], json!(4));
        assert_eq!(live["spec"]["selector"], json!({ "app": "worker" }));
        assert_eq!(
            live["spec"]["template"]["spec"]["containers"][0]["image"],
            json!("worker:2.1")
        );
        assert_eq!(
            cluster.mutations().iter().filter(|op| matches!(op, Operation::Patch(..))).count(),
            1
        );
    }

    #[tokio::test]
    async fn test_reordered_live_sequences_are_unchanged() {
        let declaration = app_pod("app:v1").attribute("env", json!({ "A": "1", "B": "2" }));
        let mut live = Registry::with_builtin_kinds().render(&declaration).unwrap();
        live["spec"]["containers"][0]["env"] = json!([
            { "name": "B", "value": "2" },
            { "name": "A", "value": "1" }
        ]);
        let cluster = Arc::new(InMemoryCluster::new().with_object(live));

        let result = engine(&cluster)
            .converge(&declaration, ConvergeOptions::default())
            .await;

        assert!(matches!(result.outcome, Outcome::Unchanged));
    }

    #[tokio::test]
    async fn test_patch_touches_only_changed_field() {
        let cluster = with_live(&web_replica_set(3));
        let id = ResourceId::new("ReplicaSet", "web", "default");

        let result = engine(&cluster)
            .converge(&web_replica_set(5), ConvergeOptions::default())
            .await;

        let Outcome::Patched { changes } = &result.outcome else {
            panic!("expected a patch, got {:?}", result.outcome);
        };
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path.to_string(), "spec.replicas");
        assert_eq!(changes[0].kind, ChangeKind::Modified);
        assert_eq!(
            cluster.mutations(),
            vec![Operation::Patch(
                id.clone(),
                vec!["metadata.annotations".to_string(), "spec.replicas".to_string()]
            )]
        );
        assert_eq!(cluster.object(&id).unwrap()["spec"]["replicas"], json!(5));
    }

    #[tokio::test]
    async fn test_pod_change_recreates() {
        let cluster = with_live(&app_pod("app:v1"));
        let engine = engine(&cluster);

        let result = engine
            .converge(&app_pod("app:v2"), ConvergeOptions::default())
            .await;

        assert!(matches!(result.outcome, Outcome::Recreated { .. }));
        assert_eq!(result.changes().len(), 1);
        assert_eq!(
            cluster.mutations(),
            vec![Operation::Delete(pod_id()), Operation::Create(pod_id())]
        );
        assert_eq!(
            observed_state(&cluster.object(&pod_id()).unwrap()),
            engine.render(&app_pod("app:v2")).unwrap()
        );
    }

    #[tokio::test]
    async fn test_immutable_selector_change_recreates() {
        let cluster = with_live(&web_replica_set(3));
        let id = ResourceId::new("ReplicaSet", "web", "default");
        let changed = web_replica_set(3).attribute("match_labels", json!({ "app": "web2" }));

        let result = engine(&cluster)
            .converge(&changed, ConvergeOptions::default())
            .await;

        assert!(matches!(result.outcome, Outcome::Recreated { .. }));
        assert_eq!(
            cluster.mutations(),
            vec![Operation::Delete(id.clone()), Operation::Create(id)]
        );
    }

    #[tokio::test]
    async fn test_forced_recreate_of_unchanged_resource() {
        let cluster = with_live(&web_replica_set(3));
        let id = ResourceId::new("ReplicaSet", "web", "default");
        let options = ConvergeOptions {
            recreate: true,
            ..Default::default()
        };

        let result = engine(&cluster).converge(&web_replica_set(3), options).await;

        assert!(matches!(&result.outcome, Outcome::Recreated { changes } if changes.is_empty()));
        assert_eq!(
            cluster.mutations(),
            vec![Operation::Delete(id.clone()), Operation::Create(id)]
        );
    }

    #[tokio::test]
    async fn test_recreate_not_allowed_is_a_conflict() {
        let cluster = with_live(&app_pod("app:v1"));
        let options = ConvergeOptions {
            allow_recreate: false,
            ..Default::default()
        };

        let result = engine(&cluster).converge(&app_pod("app:v2"), options).await;

        assert!(matches!(
            result.outcome,
            Outcome::Failed {
                action: Action::Recreate,
                error: KeelError::ConvergenceConflict(_)
            }
        ));
        assert!(cluster.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_plans_without_mutating() {
        let cluster = with_live(&app_pod("app:v1"));
        let options = ConvergeOptions {
            dry_run: true,
            ..Default::default()
        };
        let engine = engine(&cluster);

        let recreate = engine.converge(&app_pod("app:v2"), options).await;
        let create = engine
            .converge(&Declaration::new("Pod", "other").attribute("image", "x:1"), options)
            .await;

        assert!(matches!(recreate.outcome, Outcome::Recreated { .. }));
        assert!(recreate.dry_run);
        assert!(matches!(create.outcome, Outcome::Created));
        assert!(cluster.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_recreate_waits_for_lagging_deletion() {
        let document = Registry::with_builtin_kinds()
            .render(&app_pod("app:v1"))
            .unwrap();
        let cluster = Arc::new(
            InMemoryCluster::new()
                .with_object(document)
                .with_deletion_lag(3),
        );

        let result = engine(&cluster)
            .converge(&app_pod("app:v2"), ConvergeOptions::default())
            .await;

        assert!(matches!(result.outcome, Outcome::Recreated { .. }));
        let gets_after_delete = cluster
            .operations()
            .iter()
            .skip_while(|op| !matches!(op, Operation::Delete(_)))
            .filter(|op| matches!(op, Operation::Get(_)))
            .count();
        assert_eq!(gets_after_delete, 4);
        assert_eq!(
            cluster.object(&pod_id()).unwrap()["spec"]["containers"][0]["image"],
            json!("app:v2")
        );
    }

    #[tokio::test]
    async fn test_deletion_that_never_completes_times_out() {
        let document = Registry::with_builtin_kinds()
            .render(&app_pod("app:v1"))
            .unwrap();
        let cluster = Arc::new(
            InMemoryCluster::new()
                .with_object(document)
                .with_deletion_lag(u32::MAX),
        );

        let result = engine(&cluster)
            .converge(&app_pod("app:v2"), ConvergeOptions::default())
            .await;

        assert!(matches!(
            result.outcome,
            Outcome::Failed {
                action: Action::AwaitDeletion,
                error: KeelError::Timeout { .. }
            }
        ));
        assert_eq!(cluster.mutations(), vec![Operation::Delete(pod_id())]);
    }

    #[tokio::test]
    async fn test_cluster_failure_reports_action() {
        let cluster = Arc::new(InMemoryCluster::new().failing_on("get"));

        let result = engine(&cluster)
            .converge(&app_pod("app:v1"), ConvergeOptions::default())
            .await;

        assert!(matches!(
            result.outcome,
            Outcome::Failed {
                action: Action::Fetch,
                error: KeelError::ClusterQuery(_)
            }
        ));
    }

    #[tokio::test]
    async fn test_failed_patch_reports_action() {
        let document = Registry::with_builtin_kinds()
            .render(&web_replica_set(3))
            .unwrap();
        let cluster = Arc::new(
            InMemoryCluster::new()
                .with_object(document)
                .failing_on("patch"),
        );

        let result = engine(&cluster)
            .converge(&web_replica_set(4), ConvergeOptions::default())
            .await;

        assert!(matches!(
            result.outcome,
            Outcome::Failed {
                action: Action::Patch,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_definition_error_never_reaches_cluster() {
        let cluster = Arc::new(InMemoryCluster::new());

        let result = engine(&cluster)
            .converge(&Declaration::new("Pod", "app"), ConvergeOptions::default())
            .await;

        assert!(matches!(
            result.outcome,
            Outcome::Failed {
                action: Action::Render,
                error: KeelError::Definition(DefinitionError::MissingAttribute(_))
            }
        ));
        assert!(cluster.operations().is_empty());
    }

    #[tokio::test]
    async fn test_waits_for_ready_pod() {
        let cluster = Arc::new(InMemoryCluster::new().with_status(
            pod_id(),
            json!({ "phase": "Running", "containerStatuses": [{ "name": "app", "ready": true }] }),
        ));
        let options = ConvergeOptions {
            wait_ready: true,
            ..Default::default()
        };

        let result = engine(&cluster).converge(&app_pod("app:v1"), options).await;

        assert!(matches!(result.outcome, Outcome::Created));
    }

    #[tokio::test]
    async fn test_pod_that_never_becomes_ready_times_out() {
        let cluster = Arc::new(
            InMemoryCluster::new().with_status(pod_id(), json!({ "phase": "Pending" })),
        );
        let options = ConvergeOptions {
            wait_ready: true,
            ..Default::default()
        };

        let result = engine(&cluster).converge(&app_pod("app:v1"), options).await;

        assert!(matches!(
            result.outcome,
            Outcome::Failed {
                action: Action::AwaitReady,
                error: KeelError::Timeout { .. }
            }
        ));
        assert_eq!(cluster.mutations(), vec![Operation::Create(pod_id())]);
    }

    #[tokio::test]
    async fn test_converge_all_isolates_failures() {
        let cluster = Arc::new(InMemoryCluster::new());
        let declarations = vec![
            Declaration::new("Pod", "broken"),
            app_pod("app:v1"),
            web_replica_set(2),
        ];

        let results = engine(&cluster)
            .converge_all(&declarations, ConvergeOptions::default())
            .await;

        assert_eq!(results.len(), 3);
        assert!(results[0].is_failed());
        assert!(matches!(results[1].outcome, Outcome::Created));
        assert!(matches!(results[2].outcome, Outcome::Created));
        assert_eq!(cluster.mutations().len(), 2);
    }

    #[tokio::test]
    async fn test_diff_of_absent_resource_adds_everything() {
        let cluster = Arc::new(InMemoryCluster::new());
        let engine = engine(&cluster);

        let changes = engine.diff(&app_pod("app:v1")).await.unwrap();

        let paths: Vec<String> = changes.iter().map(|c| c.path.to_string()).collect();
        assert_eq!(paths, vec!["apiVersion", "kind", "metadata", "spec"]);
        assert!(changes.iter().all(|c| c.kind == ChangeKind::Added));

        engine
            .converge(&app_pod("app:v1"), ConvergeOptions::default())
            .await;
        assert!(engine.diff(&app_pod("app:v1")).await.unwrap().is_empty());
    }
}
