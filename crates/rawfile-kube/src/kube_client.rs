//! [`ClusterClient`] backed by a live API server
//!
//! Kinds are resolved through API discovery so any manifest object, typed
//! or opaque, can be fetched, applied and deleted as a [`DynamicObject`].

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{
    Client,
    api::{Api, DeleteParams, DynamicObject, ListParams, Patch, PatchParams, PostParams},
    core::{GroupVersionKind, TypeMeta},
    discovery::{ApiCapabilities, ApiResource, Discovery, Scope},
};
use rawfile_core::ResourceId;
use tracing::debug;

use crate::client::{ClusterClient, dynamic_id};
use crate::error::{KubeError, Result};

/// Cluster client using server-side apply
pub struct KubeClusterClient {
    client: Client,
    discovery: Discovery,
    /// Server-side apply field manager, the application name
    field_manager: String,
}

impl KubeClusterClient {
    /// Connect using the in-cluster or kubeconfig defaults and run discovery
    pub async fn connect(field_manager: impl Into<String>) -> Result<Self> {
        let client = Client::try_default().await?;
        Self::new(client, field_manager).await
    }

    pub async fn new(client: Client, field_manager: impl Into<String>) -> Result<Self> {
        let discovery = Discovery::new(client.clone()).run().await?;
        Ok(Self {
            client,
            discovery,
            field_manager: field_manager.into(),
        })
    }

    /// Underlying client, shared with the leader elector
    pub fn client(&self) -> Client {
        self.client.clone()
    }

    fn resolve(&self, api_version: &str, kind: &str) -> Result<(ApiResource, ApiCapabilities)> {
        let gvk = gvk_from_api_version(api_version, kind);
        self.discovery
            .resolve_gvk(&gvk)
            .ok_or_else(|| KubeError::UnknownKind {
                api_version: api_version.to_string(),
                kind: kind.to_string(),
            })
    }

    fn api_for(&self, id: &ResourceId) -> Result<Api<DynamicObject>> {
        let (resource, caps) = self.resolve(&id.api_version, &id.kind)?;
        let api = match (caps.scope, id.namespace.as_deref()) {
            (Scope::Namespaced, Some(ns)) => {
                Api::namespaced_with(self.client.clone(), ns, &resource)
            }
            (Scope::Namespaced, None) => {
                Api::default_namespaced_with(self.client.clone(), &resource)
            }
            (Scope::Cluster, _) => Api::all_with(self.client.clone(), &resource),
        };
        Ok(api)
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn get(&self, id: &ResourceId) -> Result<Option<DynamicObject>> {
        let api = self.api_for(id)?;
        Ok(api.get_opt(&id.name).await?)
    }

    async fn list(
        &self,
        api_version: &str,
        kind: &str,
        selector: &str,
    ) -> Result<Vec<DynamicObject>> {
        let (resource, _) = self.resolve(api_version, kind)?;
        let api: Api<DynamicObject> = Api::all_with(self.client.clone(), &resource);
        let list = api.list(&ListParams::default().labels(selector)).await?;

        // List responses omit per-item type meta
        let types = TypeMeta {
            api_version: api_version.to_string(),
            kind: kind.to_string(),
        };
        Ok(list
            .items
            .into_iter()
            .map(|mut obj| {
                obj.types.get_or_insert_with(|| types.clone());
                obj
            })
            .collect())
    }

    async fn apply(&self, obj: &DynamicObject) -> Result<()> {
        let id = dynamic_id(obj);
        if id.name.is_empty() {
            return Err(KubeError::InvalidManifest(format!(
                "{} is missing metadata.name",
                id.kind
            )));
        }

        let api = self.api_for(&id)?;
        let params = PatchParams::apply(&self.field_manager).force();
        api.patch(&id.name, &params, &Patch::Apply(obj)).await?;

        debug!(resource = %id, "Applied");
        Ok(())
    }

    async fn delete(&self, id: &ResourceId) -> Result<()> {
        let api = self.api_for(id)?;
        let params = DeleteParams {
            propagation_policy: Some(kube::api::PropagationPolicy::Background),
            ..Default::default()
        };
        api.delete(&id.name, &params).await?;

        debug!(resource = %id, "Deleted");
        Ok(())
    }

    async fn create_namespace(&self, name: &str) -> Result<()> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let namespace = Namespace {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        api.create(&PostParams::default(), &namespace).await?;
        Ok(())
    }
}

/// Split an `apiVersion` into group and version
///
/// - "apps/v1" -> group="apps", version="v1"
/// - "v1" -> group="", version="v1" (core API)
fn gvk_from_api_version(api_version: &str, kind: &str) -> GroupVersionKind {
    let (group, version) = match api_version.rsplit_once('/') {
        Some((g, v)) => (g.to_string(), v.to_string()),
        None => (String::new(), api_version.to_string()),
    };

    GroupVersionKind {
        group,
        version,
        kind: kind.to_string(),
    }
}
