//! Resource objects shipped by the vendored chart
//!
//! Kinds the chart is known to ship decode into their `k8s-openapi` types so
//! patches can work on typed fields. Anything else is kept as an opaque
//! [`DynamicObject`] and passed through untouched.

use k8s_openapi::api::apps::v1::{DaemonSet, StatefulSet};
use k8s_openapi::api::core::v1::{Service, ServiceAccount};
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding};
use k8s_openapi::api::storage::v1::{CSIDriver, StorageClass};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::DynamicObject;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::Result;

/// Kinds that live outside any namespace
const CLUSTER_SCOPED_KINDS: &[&str] = &[
    "Namespace",
    "ClusterRole",
    "ClusterRoleBinding",
    "CSIDriver",
    "StorageClass",
    "PersistentVolume",
    "PriorityClass",
    "CustomResourceDefinition",
    "VolumeSnapshotClass",
];

/// Check whether a kind is cluster-scoped
pub fn is_cluster_scoped(kind: &str) -> bool {
    CLUSTER_SCOPED_KINDS.contains(&kind)
}

/// Identity of a Kubernetes object: (kind, namespace, name)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId {
    pub kind: String,
    pub namespace: Option<String>,
    pub name: String,
    pub api_version: String,
}

impl ResourceId {
    pub fn new(
        api_version: impl Into<String>,
        kind: impl Into<String>,
        namespace: Option<&str>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            namespace: namespace.map(str::to_string),
            name: name.into(),
            api_version: api_version.into(),
        }
    }

    /// Identity of a Namespace object
    pub fn namespace(name: &str) -> Self {
        Self::new("v1", "Namespace", None, name)
    }

    /// `Kind/name` without the namespace
    pub fn short_name(&self) -> String {
        format!("{}/{}", self.kind, self.name)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}/{}", self.kind, ns, self.name),
            None => write!(f, "{}/{}", self.kind, self.name),
        }
    }
}

/// A parsed chart object
#[derive(Debug, Clone)]
pub enum ManifestObject {
    ServiceAccount(ServiceAccount),
    Service(Service),
    Role(Role),
    RoleBinding(RoleBinding),
    ClusterRole(ClusterRole),
    ClusterRoleBinding(ClusterRoleBinding),
    DaemonSet(DaemonSet),
    StatefulSet(StatefulSet),
    CsiDriver(CSIDriver),
    StorageClass(StorageClass),
    Opaque(DynamicObject),
}

/// Run `$body` against whichever typed value the object holds
macro_rules! each_typed {
    ($obj:expr, $r:ident => $body:expr, $o:ident => $opaque:expr) => {
        match $obj {
            ManifestObject::ServiceAccount($r) => $body,
            ManifestObject::Service($r) => $body,
            ManifestObject::Role($r) => $body,
            ManifestObject::RoleBinding($r) => $body,
            ManifestObject::ClusterRole($r) => $body,
            ManifestObject::ClusterRoleBinding($r) => $body,
            ManifestObject::DaemonSet($r) => $body,
            ManifestObject::StatefulSet($r) => $body,
            ManifestObject::CsiDriver($r) => $body,
            ManifestObject::StorageClass($r) => $body,
            ManifestObject::Opaque($o) => $opaque,
        }
    };
}

fn kind_of<T: k8s_openapi::Resource>(_: &T) -> &'static str {
    T::KIND
}

fn api_version_of<T: k8s_openapi::Resource>(_: &T) -> &'static str {
    T::API_VERSION
}

fn typed<T: DeserializeOwned>(value: serde_yaml::Value) -> std::result::Result<T, String> {
    serde_yaml::from_value(value).map_err(|e| e.to_string())
}

impl ManifestObject {
    /// Decode a single YAML document
    ///
    /// Fails when the document has no `apiVersion`/`kind` or when a known
    /// kind does not match its schema.
    pub fn decode(value: serde_yaml::Value) -> std::result::Result<Self, String> {
        let api_version = value
            .get("apiVersion")
            .and_then(|v| v.as_str())
            .ok_or("missing apiVersion")?
            .to_string();
        let kind = value
            .get("kind")
            .and_then(|v| v.as_str())
            .ok_or("missing kind")?
            .to_string();

        let object = match (api_version.as_str(), kind.as_str()) {
            ("v1", "ServiceAccount") => Self::ServiceAccount(typed(value)?),
            ("v1", "Service") => Self::Service(typed(value)?),
            ("rbac.authorization.k8s.io/v1", "Role") => Self::Role(typed(value)?),
            ("rbac.authorization.k8s.io/v1", "RoleBinding") => Self::RoleBinding(typed(value)?),
            ("rbac.authorization.k8s.io/v1", "ClusterRole") => Self::ClusterRole(typed(value)?),
            ("rbac.authorization.k8s.io/v1", "ClusterRoleBinding") => {
                Self::ClusterRoleBinding(typed(value)?)
            }
            ("apps/v1", "DaemonSet") => Self::DaemonSet(typed(value)?),
            ("apps/v1", "StatefulSet") => Self::StatefulSet(typed(value)?),
            ("storage.k8s.io/v1", "CSIDriver") => Self::CsiDriver(typed(value)?),
            ("storage.k8s.io/v1", "StorageClass") => Self::StorageClass(typed(value)?),
            _ => Self::Opaque(typed(value)?),
        };
        Ok(object)
    }

    pub fn metadata(&self) -> &ObjectMeta {
        each_typed!(self, r => &r.metadata, o => &o.metadata)
    }

    pub fn metadata_mut(&mut self) -> &mut ObjectMeta {
        each_typed!(self, r => &mut r.metadata, o => &mut o.metadata)
    }

    pub fn kind(&self) -> &str {
        each_typed!(
            self,
            r => kind_of(r),
            o => o.types.as_ref().map(|t| t.kind.as_str()).unwrap_or_default()
        )
    }

    pub fn api_version(&self) -> &str {
        each_typed!(
            self,
            r => api_version_of(r),
            o => o.types.as_ref().map(|t| t.api_version.as_str()).unwrap_or_default()
        )
    }

    pub fn name(&self) -> Option<&str> {
        self.metadata().name.as_deref()
    }

    pub fn is_namespaced(&self) -> bool {
        !is_cluster_scoped(self.kind())
    }

    pub fn is_opaque(&self) -> bool {
        matches!(self, ManifestObject::Opaque(_))
    }

    /// Identity of this object
    pub fn id(&self) -> ResourceId {
        let namespace = if self.is_namespaced() {
            self.metadata().namespace.as_deref()
        } else {
            None
        };
        ResourceId::new(
            self.api_version(),
            self.kind(),
            namespace,
            self.name().unwrap_or_default(),
        )
    }

    /// Mutable labels, created on first access
    pub fn labels_mut(&mut self) -> &mut BTreeMap<String, String> {
        self.metadata_mut().labels.get_or_insert_with(BTreeMap::new)
    }

    /// Serialize into a JSON value (includes `apiVersion` and `kind`)
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let value = each_typed!(self, r => serde_json::to_value(r)?, o => serde_json::to_value(o)?);
        Ok(value)
    }

    /// Convert into a [`DynamicObject`] for the cluster client
    pub fn to_dynamic(&self) -> Result<DynamicObject> {
        if let ManifestObject::Opaque(o) = self {
            return Ok(o.clone());
        }
        Ok(serde_json::from_value(self.to_json()?)?)
    }
}
