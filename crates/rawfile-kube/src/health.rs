//! Readiness of deployed workloads
//!
//! - DaemonSet: every scheduled pod is updated and ready, at least one scheduled
//! - StatefulSet / Deployment: ready replicas match the desired count (default 1)
//!
//! Other kinds have no rollout and count as ready once they exist.

use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use kube::api::DynamicObject;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

fn typed<T: DeserializeOwned>(obj: &DynamicObject) -> Option<T> {
    let value = match serde_json::to_value(obj) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "Failed to serialize live object");
            return None;
        }
    };
    match serde_json::from_value(value) {
        Ok(t) => Some(t),
        Err(e) => {
            warn!(error = %e, "Live object does not match its kind");
            None
        }
    }
}

/// Check whether a live object has finished rolling out
pub fn is_ready(obj: &DynamicObject) -> bool {
    let kind = obj.types.as_ref().map(|t| t.kind.as_str()).unwrap_or_default();
    let name = obj.metadata.name.as_deref().unwrap_or_default();

    let ready = match kind {
        "DaemonSet" => typed::<DaemonSet>(obj).is_some_and(|ds| daemonset_ready(&ds)),
        "StatefulSet" => typed::<StatefulSet>(obj).is_some_and(|sts| statefulset_ready(&sts)),
        "Deployment" => typed::<Deployment>(obj).is_some_and(|d| deployment_ready(&d)),
        _ => true,
    };

    if !ready {
        debug!(kind, name, "Not ready");
    }
    ready
}

fn daemonset_ready(ds: &DaemonSet) -> bool {
    let status = ds.status.as_ref();
    let desired = status.map(|s| s.desired_number_scheduled).unwrap_or(0);
    let ready = status.map(|s| s.number_ready).unwrap_or(0);
    let updated = status.and_then(|s| s.updated_number_scheduled).unwrap_or(0);

    ready == desired && updated == desired && desired > 0
}

fn statefulset_ready(sts: &StatefulSet) -> bool {
    let desired = sts.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
    let ready = sts.status.as_ref().and_then(|s| s.ready_replicas).unwrap_or(0);
    ready == desired
}

fn deployment_ready(deploy: &Deployment) -> bool {
    let desired = deploy.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
    let ready = deploy
        .status
        .as_ref()
        .and_then(|s| s.ready_replicas)
        .unwrap_or(0);
    ready == desired
}
