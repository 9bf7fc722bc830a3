//! Apply and delete ordering
//!
//! Objects are applied dependencies first (RBAC before the workloads that
//! run as it) and deleted in the reverse order.

use rawfile_core::ManifestObject;

/// Ordering bucket of a resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceCategory {
    Crd = 0,
    Namespace = 1,
    /// ClusterRole, ClusterRoleBinding
    ClusterRbac = 10,
    /// Role, RoleBinding, ServiceAccount
    NamespacedRbac = 11,
    Config = 20,
    /// StorageClass, CSIDriver, PersistentVolume
    Storage = 21,
    Network = 30,
    Workload = 40,
    Other = 100,
}

impl ResourceCategory {
    pub fn from_kind(kind: &str) -> Self {
        match kind {
            "CustomResourceDefinition" => Self::Crd,
            "Namespace" => Self::Namespace,
            "ClusterRole" | "ClusterRoleBinding" => Self::ClusterRbac,
            "Role" | "RoleBinding" | "ServiceAccount" => Self::NamespacedRbac,
            "ConfigMap" | "Secret" => Self::Config,
            "StorageClass" | "CSIDriver" | "PersistentVolume" | "PersistentVolumeClaim" => {
                Self::Storage
            }
            "Service" | "NetworkPolicy" => Self::Network,
            "Deployment" | "StatefulSet" | "DaemonSet" | "ReplicaSet" | "Pod" => Self::Workload,
            _ => Self::Other,
        }
    }
}

/// Objects in creation order; stable within a category
pub fn sort_for_apply(objects: &[ManifestObject]) -> Vec<&ManifestObject> {
    let mut sorted: Vec<&ManifestObject> = objects.iter().collect();
    sorted.sort_by_key(|o| ResourceCategory::from_kind(o.kind()));
    sorted
}

/// Objects in deletion order (reverse of creation)
pub fn sort_for_delete(objects: &[ManifestObject]) -> Vec<&ManifestObject> {
    let mut sorted: Vec<&ManifestObject> = objects.iter().collect();
    sorted.sort_by(|a, b| {
        ResourceCategory::from_kind(b.kind()).cmp(&ResourceCategory::from_kind(a.kind()))
    });
    sorted
}
