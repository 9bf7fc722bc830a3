//! Collector: cluster operations across every manifest set of an application

use rawfile_core::{ManifestObject, ManifestSet, ResourceId};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

use crate::client::ClusterClient;
use crate::collision::{ResourceAnalysis, ResourceFilter, analyze};
use crate::error::{KubeError, Result};
use crate::health::is_ready;
use crate::order::{sort_for_apply, sort_for_delete};

/// Ordered key/value results of an operational action
pub type ActionResults = BTreeMap<String, String>;

/// Joins identities one per line, sorted
fn join_ids<'a>(ids: impl IntoIterator<Item = &'a ResourceId>) -> String {
    let set: BTreeSet<String> = ids.into_iter().map(ToString::to_string).collect();
    set.into_iter().collect::<Vec<_>>().join("\n")
}

/// Apply, delete, and inspect the objects of several manifest sets
pub struct Collector<'a, C: ClusterClient + ?Sized> {
    client: &'a C,
    manifests: &'a [ManifestSet],
}

impl<'a, C: ClusterClient + ?Sized> Collector<'a, C> {
    pub fn new(client: &'a C, manifests: &'a [ManifestSet]) -> Self {
        Self { client, manifests }
    }

    pub fn manifests(&self) -> &[ManifestSet] {
        self.manifests
    }

    fn desired(set: &ManifestSet) -> Result<Vec<ManifestObject>> {
        Ok(set.desired()?)
    }

    /// Classify the resources of every manifest set
    pub async fn analyze_resources(
        &self,
        filter: &ResourceFilter,
    ) -> Result<Vec<ResourceAnalysis>> {
        let mut analyses = Vec::with_capacity(self.manifests.len());
        for set in self.manifests {
            let desired = Self::desired(set)?;
            analyses.push(analyze(self.client, set, &desired, filter).await?);
        }
        Ok(analyses)
    }

    /// Server-side apply every desired object, dependencies first
    ///
    /// Stops at the first failure; the next cycle retries from the start.
    pub async fn apply_manifests(&self) -> Result<()> {
        for set in self.manifests {
            let desired = Self::desired(set)?;
            for obj in sort_for_apply(&desired) {
                self.apply_object(obj).await?;
            }
            info!(manifest = set.name(), count = desired.len(), "Applied manifests");
        }
        Ok(())
    }

    async fn apply_object(&self, obj: &ManifestObject) -> Result<()> {
        let wrap = |source: KubeError| KubeError::Apply {
            resource: obj.id().to_string(),
            source: Box::new(source),
        };
        let dynamic = obj.to_dynamic().map_err(|e| wrap(e.into()))?;
        self.client.apply(&dynamic).await.map_err(wrap)
    }

    /// Apply the missing objects that match the filter
    pub async fn apply_missing_resources(
        &self,
        filter: &ResourceFilter,
    ) -> Result<Vec<ResourceId>> {
        let mut applied = Vec::new();
        for set in self.manifests {
            let desired = Self::desired(set)?;
            let analysis = analyze(self.client, set, &desired, filter).await?;
            for obj in sort_for_apply(&desired) {
                if analysis.missing.contains(&obj.id()) {
                    self.apply_object(obj).await?;
                    applied.push(obj.id());
                }
            }
        }
        Ok(applied)
    }

    /// Delete every desired object, dependents first
    ///
    /// Keeps going past individual failures and returns the first one.
    /// Not-found and unauthorized responses can be ignored as already
    /// acceptable end states.
    pub async fn delete_manifests(
        &self,
        ignore_not_found: bool,
        ignore_unauthorized: bool,
    ) -> Result<()> {
        let mut first_error = None;

        for set in self.manifests {
            let desired = Self::desired(set)?;
            for obj in sort_for_delete(&desired) {
                let id = obj.id();
                match self.client.delete(&id).await {
                    Ok(()) => debug!(resource = %id, "Deleted"),
                    Err(e) if ignore_not_found && e.is_not_found() => {
                        debug!(resource = %id, "Already gone")
                    }
                    Err(e) if ignore_unauthorized && e.is_unauthorized() => {
                        debug!(resource = %id, "Not permitted to delete, skipping")
                    }
                    Err(e) => {
                        warn!(resource = %id, error = %e, "Failed to delete");
                        if first_error.is_none() {
                            first_error = Some(KubeError::Delete {
                                resource: id.to_string(),
                                source: Box::new(e),
                            });
                        }
                    }
                }
            }
            info!(manifest = set.name(), "Deleted manifests");
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Identities of desired objects that have not finished rolling out
    pub async fn unready(&self) -> Result<Vec<String>> {
        let mut unready = BTreeSet::new();
        for set in self.manifests {
            for obj in Self::desired(set)? {
                let id = obj.id();
                let ready = match self.client.get(&id).await? {
                    Some(live) => is_ready(&live),
                    None => false,
                };
                if !ready {
                    unready.insert(id.to_string());
                }
            }
        }
        Ok(unready.into_iter().collect())
    }

    /// Releases deployed by every manifest set, comma separated
    pub fn short_version(&self) -> Result<String> {
        let versions = self
            .manifests
            .iter()
            .map(|set| set.current_release())
            .collect::<rawfile_core::Result<Vec<_>>>()?;
        Ok(versions.join(","))
    }

    /// Bundled releases per manifest set, newest last
    pub fn list_versions(&self) -> ActionResults {
        list_versions(self.manifests)
    }

    /// Correct, missing, conflicting, and extra resources matching the filter
    pub async fn list_resources(&self, filter: &ResourceFilter) -> Result<ActionResults> {
        let analyses = self.analyze_resources(filter).await?;

        let mut results = ActionResults::new();
        let sections: [(&str, fn(&ResourceAnalysis) -> &BTreeSet<ResourceId>); 4] = [
            ("correct", |a| &a.correct),
            ("missing", |a| &a.missing),
            ("conflicting", |a| &a.conflicting),
            ("extra", |a| &a.extra),
        ];
        for (key, select) in sections {
            let joined = join_ids(analyses.iter().flat_map(select));
            if !joined.is_empty() {
                results.insert(key.to_string(), joined);
            }
        }
        Ok(results)
    }

    /// Delete owned resources that are no longer desired
    pub async fn scrub_resources(&self, filter: &ResourceFilter) -> Result<Vec<ResourceId>> {
        let analyses = self.analyze_resources(filter).await?;
        let mut scrubbed = Vec::new();

        for id in analyses.iter().flat_map(|a| a.extra.iter()) {
            match self.client.delete(id).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    return Err(KubeError::Delete {
                        resource: id.to_string(),
                        source: Box::new(e),
                    });
                }
            }
            info!(resource = %id, "Scrubbed");
            scrubbed.push(id.clone());
        }
        Ok(scrubbed)
    }
}

/// Bundled releases per manifest set, newest last
///
/// Needs no cluster access.
pub fn list_versions(manifests: &[ManifestSet]) -> ActionResults {
    manifests
        .iter()
        .map(|set| (format!("{}-versions", set.name()), set.releases().join("\n")))
        .collect()
}

/// Render identities for an action result
pub fn format_ids(ids: &[ResourceId]) -> String {
    join_ids(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockCluster, Verb};
    use rawfile_core::ConfigView;

    fn sets() -> Vec<ManifestSet> {
        vec![ManifestSet::rawfile("rawfile", ConfigView::default())]
    }

    #[tokio::test]
    async fn test_apply_then_ready() {
        let cluster = MockCluster::new().with_ready_workloads();
        let manifests = sets();
        let collector = Collector::new(&cluster, &manifests);

        collector.apply_manifests().await.unwrap();
        let expected = manifests[0].desired().unwrap().len();
        assert_eq!(cluster.operation_counts().applies, expected);
        assert!(collector.unready().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unready_lists_workloads() {
        let cluster = MockCluster::new();
        let manifests = sets();
        let collector = Collector::new(&cluster, &manifests);
        collector.apply_manifests().await.unwrap();

        assert_eq!(
            collector.unready().await.unwrap(),
            vec![
                "DaemonSet/default/rawfile-csi-node".to_string(),
                "StatefulSet/default/rawfile-csi-controller".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_apply_failure_names_resource() {
        let cluster = MockCluster::new();
        cluster.fail(Verb::Apply, None, 500, "Foo!");
        let manifests = sets();
        let collector = Collector::new(&cluster, &manifests);

        let err = collector.apply_manifests().await.unwrap_err();
        assert!(err.to_string().starts_with("Failed to apply "));
        assert_eq!(cluster.operation_counts().applies, 1);
    }

    #[tokio::test]
    async fn test_delete_ignores_not_found() {
        let cluster = MockCluster::new();
        let manifests = sets();
        let collector = Collector::new(&cluster, &manifests);

        collector.delete_manifests(true, true).await.unwrap();
        assert!(collector.delete_manifests(false, true).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_ignores_unauthorized() {
        let cluster = MockCluster::new();
        cluster.fail(Verb::Delete, None, 403, "forbidden");
        let manifests = sets();
        let collector = Collector::new(&cluster, &manifests);

        collector.delete_manifests(true, true).await.unwrap();
        let err = collector.delete_manifests(true, false).await.unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_delete_continues_past_failures() {
        let cluster = MockCluster::new();
        let manifests = sets();
        let collector = Collector::new(&cluster, &manifests);
        collector.apply_manifests().await.unwrap();

        let node = ResourceId::new("apps/v1", "DaemonSet", Some("default"), "rawfile-csi-node");
        cluster.fail(Verb::Delete, Some(node.clone()), 500, "stuck");

        let err = collector.delete_manifests(true, true).await.unwrap_err();
        assert!(err.to_string().contains("DaemonSet/default/rawfile-csi-node"));
        assert_eq!(cluster.ids(), vec![node]);
    }

    #[tokio::test]
    async fn test_short_version_and_list_versions() {
        let cluster = MockCluster::new();
        let manifests = sets();
        let collector = Collector::new(&cluster, &manifests);

        assert_eq!(collector.short_version().unwrap(), "0.9.1");
        assert_eq!(
            collector.list_versions().get("rawfile-local-pv-versions").map(String::as_str),
            Some("0.8.2\n0.9.1")
        );
    }

    #[tokio::test]
    async fn test_list_resources_omits_empty_sections() {
        let cluster = MockCluster::new();
        let manifests = sets();
        let collector = Collector::new(&cluster, &manifests);

        let results = collector
            .list_resources(&ResourceFilter::parse("StorageClass"))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(
            results.get("missing").map(String::as_str),
            Some("StorageClass/csi-rawfile-default")
        );
    }

    #[tokio::test]
    async fn test_scrub_and_sync() {
        let cluster = MockCluster::new();
        let manifests = sets();
        let collector = Collector::new(&cluster, &manifests);

        let synced = collector
            .apply_missing_resources(&ResourceFilter::parse("ServiceAccount"))
            .await
            .unwrap();
        assert_eq!(format_ids(&synced), "ServiceAccount/default/rawfile-csi-driver");

        let mut stale = cluster.object(&synced[0]).unwrap();
        stale.metadata.name = Some("old-sa".to_string());
        cluster.insert(stale);

        let scrubbed = collector.scrub_resources(&ResourceFilter::all()).await.unwrap();
        assert_eq!(format_ids(&scrubbed), "ServiceAccount/default/old-sa");
        assert!(cluster.contains(&synced[0]));
        assert!(!cluster.contains(&scrubbed[0]));
    }
}
