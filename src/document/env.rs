// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Container environment expansion.

use crate::error::DefinitionError;
use k8s_openapi::api::core::v1::{
    ConfigMapKeySelector, EnvVar, EnvVarSource, ObjectFieldSelector, ResourceFieldSelector,
    SecretKeySelector,
};
use serde_json::{Map, Value};

/// Where an environment variable gets its value.
#[derive(Debug, Clone, PartialEq)]
pub enum EnvSource {
    Literal(String),
    Field(String),
    Secret { name: String, key: String },
    ConfigMap { name: String, key: String },
    Resource { resource: String, container: Option<String> },
}

impl EnvSource {
    /// Interpret a declared value. Scalars are literals; maps are
    /// `valueFrom` sources in API form (`secretKeyRef`, `configMapKeyRef`,
    /// `fieldRef` or `resourceFieldRef`).
    pub fn from_value(name: &str, value: &Value) -> Result<Option<Self>, DefinitionError> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(Self::Literal(s.clone()))),
            Value::Number(n) => Ok(Some(Self::Literal(n.to_string()))),
            Value::Bool(b) => Ok(Some(Self::Literal(b.to_string()))),
            Value::Object(_) => {
                let source: EnvVarSource = serde_json::from_value(value.clone())
                    .map_err(|e| invalid(name, &e.to_string()))?;
                Self::from_api(name, source).map(Some)
            }
            Value::Array(_) => Err(invalid(name, "sequences are not valid values")),
        }
    }

    fn from_api(name: &str, source: EnvVarSource) -> Result<Self, DefinitionError> {
        if let Some(field) = source.field_ref {
            return Ok(Self::Field(field.field_path));
        }
        if let Some(secret) = source.secret_key_ref {
            return Ok(Self::Secret {
                name: secret.name,
                key: secret.key,
            });
        }
        if let Some(config_map) = source.config_map_key_ref {
            return Ok(Self::ConfigMap {
                name: config_map.name,
                key: config_map.key,
            });
        }
        if let Some(resource) = source.resource_field_ref {
            return Ok(Self::Resource {
                resource: resource.resource,
                container: resource.container_name,
            });
        }
        Err(invalid(name, "value source names no reference"))
    }

    fn into_env_var(self, name: &str) -> EnvVar {
        let value_from = |source: EnvVarSource| EnvVar {
            name: name.to_string(),
            value: None,
            value_from: Some(source),
        };

        match self {
            Self::Literal(value) => EnvVar {
                name: name.to_string(),
                value: Some(value),
                value_from: None,
            },
            Self::Field(field_path) => value_from(EnvVarSource {
                field_ref: Some(ObjectFieldSelector {
                    field_path,
                    api_version: None,
                }),
                ..Default::default()
            }),
            Self::Secret { name: secret, key } => value_from(EnvVarSource {
                secret_key_ref: Some(SecretKeySelector {
                    name: secret,
                    key,
                    optional: None,
                }),
                ..Default::default()
            }),
            Self::ConfigMap {
                name: config_map,
                key,
            } => value_from(EnvVarSource {
                config_map_key_ref: Some(ConfigMapKeySelector {
                    name: config_map,
                    key,
                    optional: None,
                }),
                ..Default::default()
            }),
            Self::Resource {
                resource,
                container,
            } => value_from(EnvVarSource {
                resource_field_ref: Some(ResourceFieldSelector {
                    resource,
                    container_name: container,
                    divisor: None,
                }),
                ..Default::default()
            }),
        }
    }
}

fn invalid(name: &str, reason: &str) -> DefinitionError {
    DefinitionError::InvalidFragment(format!("environment variable '{}': {}", name, reason))
}

/// A single `{name, value}` or `{name, valueFrom}` entry.
pub fn env_var(name: &str, source: EnvSource) -> Result<Value, DefinitionError> {
    serde_json::to_value(source.into_env_var(name))
        .map_err(|e| DefinitionError::InvalidFragment(e.to_string()))
}

/// Expand a name→value map into an env sequence, keeping map order.
/// Null values are dropped.
pub fn expand_env(entries: &Map<String, Value>) -> Result<Value, DefinitionError> {
    let mut expanded = Vec::with_capacity(entries.len());
    for (name, value) in entries {
        if let Some(source) = EnvSource::from_value(name, value)? {
            expanded.push(env_var(name, source)?);
        }
    }
    Ok(Value::Array(expanded))
}

/// Like [`expand_env`], ordered by variable name.
pub fn expand_env_sorted(entries: &Map<String, Value>) -> Result<Value, DefinitionError> {
    let mut names: Vec<&String> = entries.keys().collect();
    names.sort();

    let sorted: Map<String, Value> = names
        .into_iter()
        .map(|name| (name.clone(), entries[name.as_str()].clone()))
        .collect();
    expand_env(&sorted)
}
