// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Per-kind mutability, identity and readiness rules.

/// A sequence field whose elements are matched by a key field instead of by
/// position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityField {
    /// Field path of the sequence, without indices
    pub path: &'static str,
    pub key: &'static str,
}

/// How to decide that a freshly created resource is usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Nothing to wait for
    Immediate,
    /// Pod phase is Running and every container status is ready
    PodRunning,
    /// `status.readyReplicas` equals `spec.replicas`
    ReplicasReady,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindPolicy {
    pub kind: &'static str,
    /// API group, empty for the core group
    pub group: &'static str,
    pub version: &'static str,
    pub plural: &'static str,
    /// Whether the kind accepts in-place partial updates
    pub patchable: bool,
    /// Where the pod spec lives for kinds that carry one
    pub pod_spec_root: Option<&'static str>,
    /// Identity-keyed sequences outside the pod spec
    pub identity_fields: &'static [IdentityField],
    /// Field paths whose change forces delete-then-create
    pub immutable_fields: &'static [&'static str],
    pub readiness: Readiness,
}

/// Identity-keyed sequences, relative to a pod spec root.
const POD_SPEC_IDENTITY: &[IdentityField] = &[
    IdentityField { path: "containers", key: "name" },
    IdentityField { path: "containers.env", key: "name" },
    IdentityField { path: "containers.ports", key: "containerPort" },
    IdentityField { path: "containers.volumeMounts", key: "mountPath" },
    IdentityField { path: "initContainers", key: "name" },
    IdentityField { path: "initContainers.env", key: "name" },
    IdentityField { path: "initContainers.volumeMounts", key: "mountPath" },
    IdentityField { path: "volumes", key: "name" },
    IdentityField { path: "imagePullSecrets", key: "name" },
];

pub static POLICIES: &[KindPolicy] = &[
    KindPolicy {
        kind: "Pod",
        group: "",
        version: "v1",
        plural: "pods",
        patchable: false,
        pod_spec_root: Some("spec"),
        identity_fields: &[],
        immutable_fields: &[],
        readiness: Readiness::PodRunning,
    },
    KindPolicy {
        kind: "ReplicaSet",
        group: "apps",
        version: "v1",
        plural: "replicasets",
        patchable: true,
        pod_spec_root: Some("spec.template.spec"),
        identity_fields: &[],
        immutable_fields: &["spec.selector"],
        readiness: Readiness::ReplicasReady,
    },
    KindPolicy {
        kind: "ReplicationController",
        group: "",
        version: "v1",
        plural: "replicationcontrollers",
        patchable: true,
        pod_spec_root: Some("spec.template.spec"),
        identity_fields: &[],
        immutable_fields: &[],
        readiness: Readiness::ReplicasReady,
    },
    KindPolicy {
        kind: "Deployment",
        group: "apps",
        version: "v1",
        plural: "deployments",
        patchable: true,
        pod_spec_root: Some("spec.template.spec"),
        identity_fields: &[],
        immutable_fields: &["spec.selector"],
        readiness: Readiness::ReplicasReady,
    },
    KindPolicy {
        kind: "Service",
        group: "",
        version: "v1",
        plural: "services",
        patchable: true,
        pod_spec_root: None,
        identity_fields: &[IdentityField { path: "spec.ports", key: "port" }],
        immutable_fields: &["spec.clusterIP"],
        readiness: Readiness::Immediate,
    },
    KindPolicy {
        kind: "ConfigMap",
        group: "",
        version: "v1",
        plural: "configmaps",
        patchable: true,
        pod_spec_root: None,
        identity_fields: &[],
        immutable_fields: &[],
        readiness: Readiness::Immediate,
    },
    KindPolicy {
        kind: "Secret",
        group: "",
        version: "v1",
        plural: "secrets",
        patchable: true,
        pod_spec_root: None,
        identity_fields: &[],
        immutable_fields: &["type"],
        readiness: Readiness::Immediate,
    },
];

/// Look up the policy for a kind.
pub fn policy_for(kind: &str) -> Option<&'static KindPolicy> {
    POLICIES.iter().find(|p| p.kind == kind)
}

impl KindPolicy {
    /// The `apiVersion` documents of this kind carry.
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.to_string()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    /// Key field for the sequence at `field_path`, if it is identity-keyed.
    pub fn identity_key(&self, field_path: &str) -> Option<&'static str> {
        if let Some(field) = self.identity_fields.iter().find(|f| f.path == field_path) {
            return Some(field.key);
        }

        let relative = field_path
            .strip_prefix(self.pod_spec_root?)?
            .strip_prefix('.')?;
        POD_SPEC_IDENTITY
            .iter()
            .find(|f| f.path == relative)
            .map(|f| f.key)
    }

    /// Whether `field_path` is, or lies beneath, an immutable field.
    pub fn is_immutable(&self, field_path: &str) -> bool {
        self.immutable_fields
            .iter()
            .any(|immutable| is_within(field_path, immutable))
    }

    /// Whether a change at `field_path` alters an immutable field, either
    /// directly or by replacing one of its ancestors.
    pub fn touches_immutable(&self, field_path: &str) -> bool {
        self.immutable_fields.iter().any(|immutable| {
            is_within(field_path, immutable) || is_within(immutable, field_path)
        })
    }
}

/// `path` equals `ancestor` or is nested beneath it.
fn is_within(path: &str, ancestor: &str) -> bool {
    ancestor.is_empty()
        || path == ancestor
        || path
            .strip_prefix(ancestor)
            .is_some_and(|rest| rest.starts_with('.'))
}
