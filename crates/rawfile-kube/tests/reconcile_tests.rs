//! Reconcile cycle scenarios against the in-memory cluster

use kube::api::DynamicObject;
use rawfile_core::config::{CREATE_NAMESPACE, NAMESPACE, RELEASE};
use rawfile_core::{ConfigValue, ConfigView, ManifestSet, ResourceId};
use rawfile_kube::{
    Event, MemoryStateStore, MockCluster, OperatorState, Reconciler, ResourceFilter, StateStore,
    Status, Verb,
};

fn config(namespace: &str, create: bool) -> ConfigView {
    ConfigView::from_pairs([
        (NAMESPACE, ConfigValue::String(namespace.to_string())),
        (CREATE_NAMESPACE, ConfigValue::Bool(create)),
    ])
}

fn manifests(config: ConfigView) -> Vec<ManifestSet> {
    vec![ManifestSet::rawfile("rawfile", config)]
}

/// A cluster with the target namespace and workloads that roll out instantly
fn ready_cluster(namespace: &str) -> MockCluster {
    let cluster = MockCluster::new().with_ready_workloads();
    cluster.insert_namespace(namespace);
    cluster
}

fn node_daemonset(namespace: &str) -> ResourceId {
    ResourceId::new("apps/v1", "DaemonSet", Some(namespace), "rawfile-csi-node")
}

fn foreign_daemonset(namespace: &str) -> DynamicObject {
    serde_json::from_value(serde_json::json!({
        "apiVersion": "apps/v1",
        "kind": "DaemonSet",
        "metadata": {"name": "rawfile-csi-node", "namespace": namespace},
        "spec": {}
    }))
    .unwrap()
}

mod normal_cycle {
    use super::*;

    #[tokio::test]
    async fn test_clean_cluster_becomes_active() {
        let cluster = ready_cluster("storage");
        let store = MemoryStateStore::new();
        let reconciler = Reconciler::new(&cluster, &store, manifests(config("storage", false)), true);

        let outcome = reconciler.reconcile(Event::Install).await.unwrap();
        assert_eq!(outcome.status, Status::ready());
        assert_eq!(outcome.version.as_deref(), Some("0.9.1"));
        assert!(!outcome.terminating);
        assert!(cluster.contains(&node_daemonset("storage")));
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_reconcile_is_repeatable() {
        let cluster = ready_cluster("storage");
        let store = MemoryStateStore::new();
        let reconciler = Reconciler::new(&cluster, &store, manifests(config("storage", false)), true);

        reconciler.reconcile(Event::Install).await.unwrap();
        let outcome = reconciler.reconcile(Event::ConfigChanged).await.unwrap();
        assert_eq!(outcome.status, Status::ready());
    }

    #[tokio::test]
    async fn test_unready_workloads_wait() {
        let cluster = MockCluster::new();
        cluster.insert_namespace("storage");
        let store = MemoryStateStore::new();
        let reconciler = Reconciler::new(&cluster, &store, manifests(config("storage", false)), true);

        let outcome = reconciler.reconcile(Event::Start).await.unwrap();
        assert_eq!(
            outcome.status,
            Status::waiting(
                "DaemonSet/storage/rawfile-csi-node, StatefulSet/storage/rawfile-csi-controller"
            )
        );
        assert_eq!(outcome.version, None);
    }

    #[tokio::test]
    async fn test_apply_failure_waits_with_cause() {
        let cluster = ready_cluster("storage");
        cluster.fail(Verb::Apply, None, 500, "Foo!");
        let store = MemoryStateStore::new();
        let reconciler = Reconciler::new(&cluster, &store, manifests(config("storage", false)), true);

        match reconciler.reconcile(Event::Install).await.unwrap().status {
            Status::Waiting(message) => {
                assert!(message.starts_with("Failed to apply "), "{message}");
                assert!(message.contains("Foo!"), "{message}");
            }
            other => panic!("unexpected status: {other}"),
        }

        cluster.clear_failures();
        let outcome = reconciler.reconcile(Event::UpdateStatus).await.unwrap();
        assert_eq!(outcome.status, Status::ready());
    }

    #[tokio::test]
    async fn test_unknown_release_blocks() {
        let cluster = ready_cluster("default");
        let store = MemoryStateStore::new();
        let config = ConfigView::from_pairs([(RELEASE, ConfigValue::String("0.9.0".into()))]);
        let reconciler = Reconciler::new(&cluster, &store, manifests(config), true);

        let outcome = reconciler.reconcile(Event::Install).await.unwrap();
        assert_eq!(
            outcome.status,
            Status::blocked("Unknown release '0.9.0' (action: list-versions)")
        );
        assert_eq!(cluster.operation_counts().applies, 0);
    }
}

mod namespace_guard {
    use super::*;

    #[tokio::test]
    async fn test_missing_namespace_blocks_without_apply() {
        let cluster = MockCluster::new();
        let store = MemoryStateStore::new();
        let reconciler = Reconciler::new(&cluster, &store, manifests(config("x", false)), true);

        let outcome = reconciler.reconcile(Event::Install).await.unwrap();
        assert_eq!(outcome.status, Status::blocked("Missing namespace 'x'"));
        assert_eq!(cluster.operation_counts().applies, 0);
    }

    #[tokio::test]
    async fn test_missing_namespace_created_then_applied() {
        let cluster = MockCluster::new().with_ready_workloads();
        let store = MemoryStateStore::new();
        let reconciler = Reconciler::new(&cluster, &store, manifests(config("x", true)), true);

        let outcome = reconciler.reconcile(Event::Install).await.unwrap();
        assert_eq!(outcome.status, Status::ready());
        assert!(cluster.contains(&ResourceId::namespace("x")));
        assert!(cluster.operation_counts().applies > 0);
    }
}

mod collisions {
    use super::*;

    #[tokio::test]
    async fn test_foreign_daemonset_blocks() {
        let cluster = ready_cluster("storage");
        cluster.insert(foreign_daemonset("storage"));
        let store = MemoryStateStore::new();
        let reconciler = Reconciler::new(&cluster, &store, manifests(config("storage", false)), true);

        let outcome = reconciler.reconcile(Event::Install).await.unwrap();
        assert_eq!(
            outcome.status,
            Status::blocked("1 Kubernetes resource collision (action: list-resources)")
        );
        assert_eq!(cluster.operation_counts().applies, 0);

        let listed = reconciler.list_resources(&ResourceFilter::all()).await;
        assert_eq!(
            listed.get("conflicting").map(String::as_str),
            Some("DaemonSet/storage/rawfile-csi-node")
        );
    }

    #[tokio::test]
    async fn test_foreign_object_in_other_namespace_is_ignored() {
        let cluster = ready_cluster("storage");
        cluster.insert(foreign_daemonset("elsewhere"));
        let store = MemoryStateStore::new();
        let reconciler = Reconciler::new(&cluster, &store, manifests(config("storage", false)), true);

        let outcome = reconciler.reconcile(Event::Install).await.unwrap();
        assert_eq!(outcome.status, Status::ready());
    }
}

mod teardown {
    use super::*;

    #[tokio::test]
    async fn test_remove_deletes_and_sticks() {
        let cluster = ready_cluster("storage");
        let store = MemoryStateStore::new();
        let reconciler = Reconciler::new(&cluster, &store, manifests(config("storage", false)), true);
        reconciler.reconcile(Event::Install).await.unwrap();

        let outcome = reconciler.reconcile(Event::Remove).await.unwrap();
        assert_eq!(outcome.status, Status::maintenance("Removing Kubernetes Resources"));
        assert!(outcome.terminating);
        assert!(store.snapshot().terminating);
        assert_eq!(cluster.ids(), vec![ResourceId::namespace("storage")]);

        // An unrelated event keeps tearing down instead of reinstalling
        cluster.reset_counts();
        let outcome = reconciler.reconcile(Event::ConfigChanged).await.unwrap();
        assert!(outcome.terminating);
        assert_eq!(cluster.operation_counts().applies, 0);
        assert!(cluster.operation_counts().deletes > 0);
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn test_persisted_flag_short_circuits() {
        let cluster = ready_cluster("storage");
        let store = MemoryStateStore::with_state(OperatorState { terminating: true });
        let reconciler = Reconciler::new(&cluster, &store, manifests(config("storage", false)), true);

        let outcome = reconciler.reconcile(Event::Install).await.unwrap();
        assert_eq!(outcome.status, Status::maintenance("Removing Kubernetes Resources"));
        assert_eq!(cluster.operation_counts().applies, 0);
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_unauthorized_deletes_are_accepted() {
        let cluster = ready_cluster("storage");
        cluster.fail(Verb::Delete, None, 401, "Unauthorized");
        let store = MemoryStateStore::new();
        let reconciler = Reconciler::new(&cluster, &store, manifests(config("storage", false)), true);

        let outcome = reconciler.reconcile(Event::Stop).await.unwrap();
        assert_eq!(outcome.status, Status::maintenance("Removing Kubernetes Resources"));
    }

    #[tokio::test]
    async fn test_delete_failure_waits() {
        let cluster = ready_cluster("storage");
        let store = MemoryStateStore::new();
        let reconciler = Reconciler::new(&cluster, &store, manifests(config("storage", false)), true);
        reconciler.reconcile(Event::Install).await.unwrap();

        cluster.fail(Verb::Delete, Some(node_daemonset("storage")), 500, "stuck finalizer");
        match reconciler.reconcile(Event::Remove).await.unwrap().status {
            Status::Waiting(message) => {
                assert!(
                    message.starts_with("Failed to delete DaemonSet/storage/rawfile-csi-node"),
                    "{message}"
                );
            }
            other => panic!("unexpected status: {other}"),
        }
    }
}

mod leadership {
    use super::*;

    #[tokio::test]
    async fn test_non_leader_observes_only() {
        let cluster = ready_cluster("storage");
        let store = MemoryStateStore::new();
        let reconciler =
            Reconciler::new(&cluster, &store, manifests(config("storage", false)), false);

        let outcome = reconciler.reconcile(Event::Install).await.unwrap();
        assert!(matches!(outcome.status, Status::Waiting(_)));
        assert_eq!(cluster.operation_counts().applies, 0);
    }

    #[tokio::test]
    async fn test_non_leader_reports_leader_install() {
        let cluster = ready_cluster("storage");
        let store = MemoryStateStore::new();
        let sets = || manifests(config("storage", false));

        Reconciler::new(&cluster, &store, sets(), true)
            .reconcile(Event::Install)
            .await
            .unwrap();
        let outcome = Reconciler::new(&cluster, &store, sets(), false)
            .reconcile(Event::UpdateStatus)
            .await
            .unwrap();
        assert_eq!(outcome.status, Status::ready());
    }

    #[tokio::test]
    async fn test_non_leader_waits_for_namespace() {
        let cluster = MockCluster::new();
        let store = MemoryStateStore::new();
        let reconciler = Reconciler::new(&cluster, &store, manifests(config("x", true)), false);

        let outcome = reconciler.reconcile(Event::Install).await.unwrap();
        assert_eq!(
            outcome.status,
            Status::waiting("Waiting for leader to create namespace 'x'")
        );
        assert!(!cluster.contains(&ResourceId::namespace("x")));
    }

    #[tokio::test]
    async fn test_non_leader_latches_flag_without_deleting() {
        let cluster = ready_cluster("storage");
        let store = MemoryStateStore::new();
        let reconciler =
            Reconciler::new(&cluster, &store, manifests(config("storage", false)), false);

        let outcome = reconciler.reconcile(Event::Remove).await.unwrap();
        assert_eq!(outcome.status, Status::maintenance("Terminating"));
        assert!(store.load().await.unwrap().terminating);
        assert_eq!(cluster.operation_counts().deletes, 0);
    }
}

mod actions {
    use super::*;

    #[tokio::test]
    async fn test_list_versions() {
        let cluster = MockCluster::new();
        let store = MemoryStateStore::new();
        let reconciler = Reconciler::new(&cluster, &store, manifests(ConfigView::default()), true);

        let versions = reconciler.list_versions();
        assert_eq!(
            versions.get("rawfile-local-pv-versions").map(String::as_str),
            Some("0.8.2\n0.9.1")
        );
    }

    #[tokio::test]
    async fn test_sync_then_list() {
        let cluster = ready_cluster("default");
        let store = MemoryStateStore::new();
        let reconciler = Reconciler::new(&cluster, &store, manifests(ConfigView::default()), true);

        let synced = reconciler.sync_resources(&ResourceFilter::parse("CSIDriver")).await;
        assert_eq!(
            synced.get("synced").map(String::as_str),
            Some("CSIDriver/rawfile.csi.openebs.io")
        );

        let listed = reconciler
            .list_resources(&ResourceFilter::parse("csidriver storageclass"))
            .await;
        assert_eq!(
            listed.get("correct").map(String::as_str),
            Some("CSIDriver/rawfile.csi.openebs.io")
        );
        assert_eq!(
            listed.get("missing").map(String::as_str),
            Some("StorageClass/csi-rawfile-default")
        );
        assert!(!listed.contains_key("conflicting"));
    }

    #[tokio::test]
    async fn test_sync_failure_is_reported() {
        let cluster = ready_cluster("default");
        cluster.fail(Verb::Apply, None, 500, "Foo!");
        let store = MemoryStateStore::new();
        let reconciler = Reconciler::new(&cluster, &store, manifests(ConfigView::default()), true);

        let results = reconciler.sync_resources(&ResourceFilter::all()).await;
        let message = results.get("result").unwrap();
        assert!(
            message.starts_with("Failed to sync missing resources: Failed to apply "),
            "{message}"
        );
        assert!(message.contains(" -> "), "{message}");
    }

    #[tokio::test]
    async fn test_scrub_removes_stale_owned_objects() {
        let cluster = ready_cluster("default");
        let store = MemoryStateStore::new();
        let reconciler = Reconciler::new(&cluster, &store, manifests(ConfigView::default()), true);
        reconciler.reconcile(Event::Install).await.unwrap();

        let service = ResourceId::new("v1", "Service", Some("default"), "rawfile-csi-node");
        let mut stale = cluster.object(&service).unwrap();
        stale.metadata.name = Some("rawfile-csi-metrics".to_string());
        cluster.insert(stale);

        let listed = reconciler.list_resources(&ResourceFilter::all()).await;
        assert_eq!(
            listed.get("extra").map(String::as_str),
            Some("Service/default/rawfile-csi-metrics")
        );

        let scrubbed = reconciler.scrub_resources(&ResourceFilter::parse("Service")).await;
        assert_eq!(
            scrubbed.get("scrubbed").map(String::as_str),
            Some("Service/default/rawfile-csi-metrics")
        );
        assert!(cluster.contains(&service));
    }

    #[tokio::test]
    async fn test_mutating_actions_are_leader_only() {
        let cluster = ready_cluster("default");
        let store = MemoryStateStore::new();
        let reconciler = Reconciler::new(&cluster, &store, manifests(ConfigView::default()), false);

        let scrub = reconciler.scrub_resources(&ResourceFilter::all()).await;
        assert_eq!(
            scrub.get("result").map(String::as_str),
            Some("Only the leader may scrub resources")
        );
        let sync = reconciler.sync_resources(&ResourceFilter::all()).await;
        assert_eq!(
            sync.get("result").map(String::as_str),
            Some("Only the leader may sync resources")
        );
        assert_eq!(cluster.operation_counts().applies, 0);
    }
}
