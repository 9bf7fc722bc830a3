//! Kubernetes integration for the rawfile-localpv operator
//!
//! This crate provides:
//! - `ClusterClient`: The API verbs the operator needs, with a kube-rs
//!   implementation and an in-memory mock
//! - Namespace guard, collision analysis and readiness checks
//! - Persisted operator state and lease-based leadership
//! - `Collector` and `Reconciler`: the reconcile cycle and operational actions

pub mod client;
pub mod collector;
pub mod collision;
pub mod error;
pub mod health;
pub mod kube_client;
pub mod leader;
pub mod mock;
pub mod namespace;
pub mod order;
pub mod reconciler;
pub mod state;
pub mod status;

pub use client::{ClusterClient, dynamic_id};
pub use collector::{ActionResults, Collector, list_versions};
pub use collision::{ResourceAnalysis, ResourceFilter, analyze};
pub use error::{KubeError, Result};
pub use kube_client::KubeClusterClient;
pub use leader::{LeaseDecision, LeaseElector};
pub use mock::{MockCluster, OperationCounts, Verb};
pub use namespace::ensure_namespace;
pub use reconciler::{Event, ReconcileOutcome, Reconciler};
pub use state::{FileStateStore, MemoryStateStore, OperatorState, StateStore};
pub use status::{Flow, Status};
