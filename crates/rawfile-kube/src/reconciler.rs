//! Reconcile cycle and operational actions
//!
//! Each cycle runs in a fixed order, every stage returning [`Flow`]:
//!
//! 1. Teardown check (sticky once terminating)
//! 2. Release check
//! 3. Namespace guard
//! 4. Collision analysis (leader only)
//! 5. Apply (leader only)
//! 6. Status aggregation

use rawfile_core::{ManifestSet, chain_message};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

use crate::client::ClusterClient;
use crate::collector::{ActionResults, Collector, format_ids};
use crate::collision::{ResourceFilter, collision_message};
use crate::error::Result;
use crate::namespace::ensure_namespace;
use crate::state::StateStore;
use crate::status::{Flow, Status};

/// Lifecycle events that trigger a reconcile cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Install,
    Start,
    ConfigChanged,
    Upgrade,
    UpdateStatus,
    LeaderElected,
    Stop,
    Remove,
}

impl Event {
    pub const ALL: [Event; 8] = [
        Event::Install,
        Event::Start,
        Event::ConfigChanged,
        Event::Upgrade,
        Event::UpdateStatus,
        Event::LeaderElected,
        Event::Stop,
        Event::Remove,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Event::Install => "install",
            Event::Start => "start",
            Event::ConfigChanged => "config-changed",
            Event::Upgrade => "upgrade",
            Event::UpdateStatus => "update-status",
            Event::LeaderElected => "leader-elected",
            Event::Stop => "stop",
            Event::Remove => "remove",
        }
    }

    /// Stop and remove begin teardown
    pub fn is_teardown(&self) -> bool {
        matches!(self, Event::Stop | Event::Remove)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Event {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Event::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| format!("unknown event '{}'", s))
    }
}

/// Result of one reconcile cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub status: Status,
    /// Short version string, reported once active
    pub version: Option<String>,
    pub terminating: bool,
}

/// Drives reconcile cycles for one application
pub struct Reconciler<'a, C: ClusterClient + ?Sized, S: StateStore + ?Sized> {
    client: &'a C,
    store: &'a S,
    manifests: Vec<ManifestSet>,
    is_leader: bool,
}

impl<'a, C, S> Reconciler<'a, C, S>
where
    C: ClusterClient + ?Sized,
    S: StateStore + ?Sized,
{
    pub fn new(client: &'a C, store: &'a S, manifests: Vec<ManifestSet>, is_leader: bool) -> Self {
        Self {
            client,
            store,
            manifests,
            is_leader,
        }
    }

    pub fn is_leader(&self) -> bool {
        self.is_leader
    }

    pub fn manifests(&self) -> &[ManifestSet] {
        &self.manifests
    }

    fn collector(&self) -> Collector<'_, C> {
        Collector::new(self.client, &self.manifests)
    }

    /// Run one reconcile cycle
    ///
    /// Only state store failures are returned as errors; everything the
    /// cluster or configuration can throw at us ends up in the status.
    pub async fn reconcile(&self, event: Event) -> Result<ReconcileOutcome> {
        let mut state = self.store.load().await?;

        if event.is_teardown() && !state.terminating {
            info!(%event, "Marking application as terminating");
            state.terminating = true;
            self.store.save(&state).await?;
        }

        if state.terminating {
            return Ok(ReconcileOutcome {
                status: self.teardown().await,
                version: None,
                terminating: true,
            });
        }

        let status = self.cycle().await;
        let version = if status.is_active() {
            self.collector().short_version().ok()
        } else {
            None
        };

        info!(%event, status = %status, "Reconciled");
        Ok(ReconcileOutcome {
            status,
            version,
            terminating: false,
        })
    }

    async fn cycle(&self) -> Status {
        if let Flow::Halt(status) = self.check_releases() {
            return status;
        }
        if let Flow::Halt(status) = self.check_namespaces().await {
            return status;
        }
        if self.is_leader {
            if let Flow::Halt(status) = self.check_collisions().await {
                return status;
            }
            if let Flow::Halt(status) = self.install().await {
                return status;
            }
        }
        self.aggregate_status().await
    }

    fn check_releases(&self) -> Flow {
        for set in &self.manifests {
            if let Err(e) = set.current_release() {
                warn!(manifest = set.name(), error = %e, "Release not available");
                return Flow::Halt(Status::blocked(format!(
                    "{} (action: list-versions)",
                    e
                )));
            }
        }
        Flow::Continue
    }

    async fn check_namespaces(&self) -> Flow {
        let mut seen = BTreeSet::new();
        for set in &self.manifests {
            let namespace = set.namespace();
            if !seen.insert(namespace.to_string()) {
                continue;
            }
            let create = set.config().create_namespace();
            if let flow @ Flow::Halt(_) =
                ensure_namespace(self.client, namespace, create, self.is_leader).await
            {
                return flow;
            }
        }
        Flow::Continue
    }

    async fn check_collisions(&self) -> Flow {
        let analyses = match self.collector().analyze_resources(&ResourceFilter::all()).await {
            Ok(analyses) => analyses,
            Err(e) => {
                return Flow::Halt(Status::waiting(format!(
                    "Failed to analyze resources -> {}",
                    chain_message(&e)
                )));
            }
        };

        let conflicting: BTreeSet<String> = analyses
            .iter()
            .flat_map(|a| a.conflicting.iter().map(ToString::to_string))
            .collect();
        if conflicting.is_empty() {
            return Flow::Continue;
        }

        for id in &conflicting {
            warn!(resource = %id, "Resource collision");
        }
        Flow::Halt(Status::blocked(collision_message(conflicting.len())))
    }

    async fn install(&self) -> Flow {
        match self.collector().apply_manifests().await {
            Ok(()) => Flow::Continue,
            Err(e) => {
                warn!(error = %e, "Failed to apply manifests");
                Flow::Halt(Status::waiting(chain_message(&e)))
            }
        }
    }

    async fn aggregate_status(&self) -> Status {
        match self.collector().unready().await {
            Ok(unready) if unready.is_empty() => Status::ready(),
            Ok(unready) => Status::waiting(unready.join(", ")),
            Err(e) => Status::waiting(format!(
                "Failed to check readiness -> {}",
                chain_message(&e)
            )),
        }
    }

    async fn teardown(&self) -> Status {
        if !self.is_leader {
            return Status::maintenance("Terminating");
        }

        match self.collector().delete_manifests(true, true).await {
            Ok(()) => Status::maintenance("Removing Kubernetes Resources"),
            Err(e) => {
                warn!(error = %e, "Failed to remove resources");
                Status::waiting(chain_message(&e))
            }
        }
    }

    /// Bundled releases per manifest set
    pub fn list_versions(&self) -> ActionResults {
        self.collector().list_versions()
    }

    /// Resources of every manifest set matching the filter
    pub async fn list_resources(&self, filter: &ResourceFilter) -> ActionResults {
        match self.collector().list_resources(filter).await {
            Ok(results) => results,
            Err(e) => result(format!("Failed to list resources: {}", chain_message(&e))),
        }
    }

    /// Delete owned resources that are no longer desired
    pub async fn scrub_resources(&self, filter: &ResourceFilter) -> ActionResults {
        if !self.is_leader {
            return result("Only the leader may scrub resources");
        }
        match self.collector().scrub_resources(filter).await {
            Ok(scrubbed) if scrubbed.is_empty() => result("No resources to scrub"),
            Ok(scrubbed) => ActionResults::from([("scrubbed".to_string(), format_ids(&scrubbed))]),
            Err(e) => result(format!("Failed to scrub resources: {}", chain_message(&e))),
        }
    }

    /// Apply desired resources that are missing from the cluster
    pub async fn sync_resources(&self, filter: &ResourceFilter) -> ActionResults {
        if !self.is_leader {
            return result("Only the leader may sync resources");
        }
        match self.collector().apply_missing_resources(filter).await {
            Ok(synced) if synced.is_empty() => result("No missing resources"),
            Ok(synced) => ActionResults::from([("synced".to_string(), format_ids(&synced))]),
            Err(e) => result(format!(
                "Failed to sync missing resources: {}",
                chain_message(&e)
            )),
        }
    }
}

fn result(message: impl Into<String>) -> ActionResults {
    ActionResults::from([("result".to_string(), message.into())])
}
