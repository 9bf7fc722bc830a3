//! Cluster access used by the reconciler
//!
//! The reconciler only needs a handful of verbs against the API server.
//! [`ClusterClient`] captures them so the control loop can run against a
//! real cluster ([`crate::KubeClusterClient`]) or in memory
//! ([`crate::MockCluster`]).

use async_trait::async_trait;
use kube::api::DynamicObject;
use rawfile_core::{ResourceId, is_cluster_scoped};

use crate::error::Result;

/// Kubernetes API verbs needed by the operator
///
/// Implementations must be Send + Sync for use across async tasks.
/// Errors carry the API status code so callers can recover locally
/// (404 on delete, 409 on create).
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Fetch a live object, `None` when it does not exist
    async fn get(&self, id: &ResourceId) -> Result<Option<DynamicObject>>;

    /// List objects of one kind, across namespaces, matching a label selector
    async fn list(&self, api_version: &str, kind: &str, selector: &str)
    -> Result<Vec<DynamicObject>>;

    /// Server-side apply an object
    async fn apply(&self, obj: &DynamicObject) -> Result<()>;

    /// Delete an object; a missing object is reported as a 404 error
    async fn delete(&self, id: &ResourceId) -> Result<()>;

    /// Create a namespace; an existing one is reported as a 409 error
    async fn create_namespace(&self, name: &str) -> Result<()>;
}

/// Identity of a live or desired dynamic object
pub fn dynamic_id(obj: &DynamicObject) -> ResourceId {
    let (api_version, kind) = obj
        .types
        .as_ref()
        .map(|t| (t.api_version.as_str(), t.kind.as_str()))
        .unwrap_or_default();
    let namespace = if is_cluster_scoped(kind) {
        None
    } else {
        obj.metadata.namespace.as_deref()
    };
    ResourceId::new(
        api_version,
        kind,
        namespace,
        obj.metadata.name.clone().unwrap_or_default(),
    )
}
