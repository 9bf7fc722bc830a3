//! Namespace guard
//!
//! Runs before anything is applied. The target namespace must exist, or be
//! created when `create-namespace` is enabled; otherwise the cycle stops.

use rawfile_core::{ResourceId, chain_message};
use tracing::{debug, info, warn};

use crate::client::ClusterClient;
use crate::status::{Flow, Status};

/// Ensure the target namespace exists
///
/// Only the leader creates a missing namespace; other replicas wait for it.
/// A 409 from the create means another writer got there first and counts
/// as success.
pub async fn ensure_namespace<C>(
    client: &C,
    namespace: &str,
    create: bool,
    is_leader: bool,
) -> Flow
where
    C: ClusterClient + ?Sized,
{
    match client.get(&ResourceId::namespace(namespace)).await {
        Ok(Some(_)) => {
            debug!(namespace, "Namespace exists");
            return Flow::Continue;
        }
        Ok(None) => {}
        Err(e) => {
            warn!(namespace, error = %e, "Failed to look up namespace");
            return Flow::Halt(Status::waiting(format!(
                "Failed to look up namespace '{}' -> {}",
                namespace,
                chain_message(&e)
            )));
        }
    }

    if !create {
        return Flow::Halt(Status::blocked(format!("Missing namespace '{}'", namespace)));
    }

    if !is_leader {
        return Flow::Halt(Status::waiting(format!(
            "Waiting for leader to create namespace '{}'",
            namespace
        )));
    }

    match client.create_namespace(namespace).await {
        Ok(()) => {
            info!(namespace, "Created namespace");
            Flow::Continue
        }
        Err(e) if e.is_conflict() => {
            debug!(namespace, "Namespace already created");
            Flow::Continue
        }
        Err(e) => {
            warn!(namespace, error = %e, "Failed to create namespace");
            Flow::Halt(Status::waiting(format!(
                "Failed to create namespace '{}' -> {}",
                namespace,
                chain_message(&e)
            )))
        }
    }
}
