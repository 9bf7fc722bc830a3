//! Collision analysis
//!
//! Classifies every desired object against the cluster: missing, present
//! and owned (correct), or present without our ownership labels
//! (conflicting). Owned objects that are no longer desired are reported as
//! extra. Any conflict blocks the cycle before anything is applied.

use rawfile_core::{ManifestObject, ManifestSet, ResourceId};
use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::client::{ClusterClient, dynamic_id};
use crate::error::Result;

/// Kind / name filter for operational actions
///
/// Whitespace separated tokens, each compared case-insensitively with a
/// resource's kind, `Kind/name`, or full identity. No tokens match
/// everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceFilter {
    tokens: Vec<String>,
}

impl ResourceFilter {
    pub fn parse(filter: &str) -> Self {
        Self {
            tokens: filter.split_whitespace().map(str::to_lowercase).collect(),
        }
    }

    /// Filter matching every resource
    pub fn all() -> Self {
        Self::default()
    }

    pub fn matches(&self, id: &ResourceId) -> bool {
        if self.tokens.is_empty() {
            return true;
        }
        let kind = id.kind.to_lowercase();
        let short = id.short_name().to_lowercase();
        let full = id.to_string().to_lowercase();
        self.tokens
            .iter()
            .any(|t| *t == kind || *t == short || *t == full)
    }
}

/// Classification of one manifest set's resources
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceAnalysis {
    pub manifest: String,
    /// Present and owned
    pub correct: BTreeSet<ResourceId>,
    /// Desired but absent
    pub missing: BTreeSet<ResourceId>,
    /// Present but not owned
    pub conflicting: BTreeSet<ResourceId>,
    /// Owned but no longer desired
    pub extra: BTreeSet<ResourceId>,
}

impl ResourceAnalysis {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicting.is_empty()
    }
}

/// Classify the desired objects of a manifest set
pub async fn analyze<C>(
    client: &C,
    set: &ManifestSet,
    desired: &[ManifestObject],
    filter: &ResourceFilter,
) -> Result<ResourceAnalysis>
where
    C: ClusterClient + ?Sized,
{
    let mut analysis = ResourceAnalysis {
        manifest: set.name().to_string(),
        ..Default::default()
    };
    let desired_ids: BTreeSet<ResourceId> = desired.iter().map(ManifestObject::id).collect();

    for id in desired_ids.iter().filter(|id| filter.matches(id)) {
        match client.get(id).await? {
            None => {
                analysis.missing.insert(id.clone());
            }
            Some(live) if set.owns(live.metadata.labels.as_ref()) => {
                analysis.correct.insert(id.clone());
            }
            Some(_) => {
                warn!(resource = %id, manifest = set.name(), "Resource exists but is not owned");
                analysis.conflicting.insert(id.clone());
            }
        }
    }

    let kinds: BTreeSet<(&str, &str)> = desired
        .iter()
        .map(|o| (o.api_version(), o.kind()))
        .collect();
    let selector = set.owner_selector();

    for (api_version, kind) in kinds {
        for live in client.list(api_version, kind, &selector).await? {
            let id = dynamic_id(&live);
            if !desired_ids.contains(&id) && filter.matches(&id) {
                analysis.extra.insert(id);
            }
        }
    }

    debug!(
        manifest = set.name(),
        correct = analysis.correct.len(),
        missing = analysis.missing.len(),
        conflicting = analysis.conflicting.len(),
        extra = analysis.extra.len(),
        "Analyzed resources"
    );
    Ok(analysis)
}

/// Blocked-status message for a number of collisions
pub fn collision_message(count: usize) -> String {
    let plural = if count == 1 { "" } else { "s" };
    format!(
        "{} Kubernetes resource collision{} (action: list-resources)",
        count, plural
    )
}
