//! In-memory cluster for testing
//!
//! Stores objects keyed by identity, so the reconciler and its actions can
//! be exercised without a Kubernetes cluster. Failures can be injected per
//! verb, either for one resource or for every call.

use async_trait::async_trait;
use kube::api::DynamicObject;
use rawfile_core::ResourceId;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use crate::client::{ClusterClient, dynamic_id};
use crate::error::{KubeError, Result};

/// API verbs a failure can be injected into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    List,
    Apply,
    Delete,
    CreateNamespace,
}

#[derive(Debug, Clone)]
struct Failure {
    code: u16,
    reason: String,
    message: String,
}

/// In-memory cluster client for testing
#[derive(Clone, Default)]
pub struct MockCluster {
    objects: Arc<RwLock<BTreeMap<ResourceId, DynamicObject>>>,
    /// (verb, resource or None for every call) -> failure
    failures: Arc<RwLock<HashMap<(Verb, Option<ResourceId>), Failure>>>,
    /// Mark applied workloads as rolled out
    ready_workloads: bool,
    /// Track operation counts for assertions
    operations: Arc<RwLock<OperationCounts>>,
}

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone)]
pub struct OperationCounts {
    pub gets: usize,
    pub lists: usize,
    pub applies: usize,
    pub deletes: usize,
    pub namespace_creates: usize,
}

impl MockCluster {
    /// Create a new empty cluster
    pub fn new() -> Self {
        Self::default()
    }

    /// Workloads report a completed rollout as soon as they are applied
    pub fn with_ready_workloads(mut self) -> Self {
        self.ready_workloads = true;
        self
    }

    /// Create with pre-populated objects
    pub fn with_objects(objects: Vec<DynamicObject>) -> Self {
        let cluster = Self::new();
        for obj in objects {
            cluster.insert(obj);
        }
        cluster
    }

    /// Store an object as-is, bypassing counters and failures
    pub fn insert(&self, obj: DynamicObject) {
        let id = dynamic_id(&obj);
        self.objects.write().unwrap().insert(id, obj);
    }

    /// Add an existing namespace
    pub fn insert_namespace(&self, name: &str) {
        self.insert(namespace_object(name));
    }

    /// Fetch a stored object without counting the call
    pub fn object(&self, id: &ResourceId) -> Option<DynamicObject> {
        self.objects.read().unwrap().get(id).cloned()
    }

    pub fn contains(&self, id: &ResourceId) -> bool {
        self.objects.read().unwrap().contains_key(id)
    }

    /// Identities of every stored object
    pub fn ids(&self) -> Vec<ResourceId> {
        self.objects.read().unwrap().keys().cloned().collect()
    }

    /// Replace the status of a stored object
    pub fn set_status(&self, id: &ResourceId, status: serde_json::Value) {
        if let Some(obj) = self.objects.write().unwrap().get_mut(id) {
            set_status(obj, status);
        }
    }

    /// Make a verb fail for one resource, or for every call when `target` is `None`
    pub fn fail(&self, verb: Verb, target: Option<ResourceId>, code: u16, message: &str) {
        let reason = match code {
            401 => "Unauthorized",
            403 => "Forbidden",
            404 => "NotFound",
            409 => "AlreadyExists",
            _ => "InternalError",
        };
        self.failures.write().unwrap().insert(
            (verb, target),
            Failure {
                code,
                reason: reason.to_string(),
                message: message.to_string(),
            },
        );
    }

    /// Remove every injected failure
    pub fn clear_failures(&self) {
        self.failures.write().unwrap().clear();
    }

    /// Get operation counts for assertions
    pub fn operation_counts(&self) -> OperationCounts {
        self.operations.read().unwrap().clone()
    }

    /// Reset operation counts
    pub fn reset_counts(&self) {
        *self.operations.write().unwrap() = OperationCounts::default();
    }

    fn check(&self, verb: Verb, target: Option<&ResourceId>) -> Result<()> {
        let failures = self.failures.read().unwrap();
        let failure = target
            .and_then(|id| failures.get(&(verb, Some(id.clone()))))
            .or_else(|| failures.get(&(verb, None)));

        match failure {
            Some(f) => Err(KubeError::api_status(f.code, &f.reason, f.message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ClusterClient for MockCluster {
    async fn get(&self, id: &ResourceId) -> Result<Option<DynamicObject>> {
        self.operations.write().unwrap().gets += 1;
        self.check(Verb::Get, Some(id))?;
        Ok(self.object(id))
    }

    async fn list(
        &self,
        api_version: &str,
        kind: &str,
        selector: &str,
    ) -> Result<Vec<DynamicObject>> {
        self.operations.write().unwrap().lists += 1;
        self.check(Verb::List, None)?;

        let wanted = parse_selector(selector);
        let objects = self.objects.read().unwrap();
        Ok(objects
            .iter()
            .filter(|(id, _)| id.api_version == api_version && id.kind == kind)
            .filter(|(_, obj)| {
                let labels = obj.metadata.labels.as_ref();
                wanted.iter().all(|(k, v)| {
                    labels.and_then(|l| l.get(*k)).map(String::as_str) == Some(*v)
                })
            })
            .map(|(_, obj)| obj.clone())
            .collect())
    }

    async fn apply(&self, obj: &DynamicObject) -> Result<()> {
        self.operations.write().unwrap().applies += 1;
        let id = dynamic_id(obj);
        self.check(Verb::Apply, Some(&id))?;

        let mut stored = obj.clone();
        if self.ready_workloads {
            if let Some(status) = rolled_out_status(obj) {
                set_status(&mut stored, status);
            }
        }
        self.objects.write().unwrap().insert(id, stored);
        Ok(())
    }

    async fn delete(&self, id: &ResourceId) -> Result<()> {
        self.operations.write().unwrap().deletes += 1;
        self.check(Verb::Delete, Some(id))?;

        match self.objects.write().unwrap().remove(id) {
            Some(_) => Ok(()),
            None => Err(KubeError::api_status(
                404,
                "NotFound",
                format!("{} not found", id),
            )),
        }
    }

    async fn create_namespace(&self, name: &str) -> Result<()> {
        self.operations.write().unwrap().namespace_creates += 1;
        let id = ResourceId::namespace(name);
        self.check(Verb::CreateNamespace, Some(&id))?;

        if self.contains(&id) {
            return Err(KubeError::api_status(
                409,
                "AlreadyExists",
                format!("namespaces \"{}\" already exists", name),
            ));
        }
        self.insert(namespace_object(name));
        Ok(())
    }
}

fn parse_selector(selector: &str) -> Vec<(&str, &str)> {
    selector
        .split(',')
        .filter_map(|pair| pair.split_once('='))
        .collect()
}

fn set_status(obj: &mut DynamicObject, status: serde_json::Value) {
    if let serde_json::Value::Object(map) = &mut obj.data {
        map.insert("status".to_string(), status);
    } else {
        obj.data = serde_json::json!({ "status": status });
    }
}

/// Status of a workload whose rollout finished
fn rolled_out_status(obj: &DynamicObject) -> Option<serde_json::Value> {
    let kind = obj.types.as_ref()?.kind.as_str();
    let replicas = obj
        .data
        .pointer("/spec/replicas")
        .and_then(|r| r.as_i64())
        .unwrap_or(1);

    match kind {
        "DaemonSet" => Some(serde_json::json!({
            "currentNumberScheduled": 1,
            "desiredNumberScheduled": 1,
            "numberMisscheduled": 0,
            "numberReady": 1,
            "updatedNumberScheduled": 1,
        })),
        "StatefulSet" | "Deployment" => Some(serde_json::json!({
            "replicas": replicas,
            "readyReplicas": replicas,
            "updatedReplicas": replicas,
        })),
        _ => None,
    }
}

/// A bare Namespace object
pub fn namespace_object(name: &str) -> DynamicObject {
    let mut obj = DynamicObject {
        types: Some(kube::core::TypeMeta {
            api_version: "v1".to_string(),
            kind: "Namespace".to_string(),
        }),
        metadata: Default::default(),
        data: serde_json::json!({}),
    };
    obj.metadata.name = Some(name.to_string());
    obj
}
