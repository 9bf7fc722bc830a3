//! Manifest sets: one logical deployment of the vendored chart
//!
//! A [`ManifestSet`] owns a configuration snapshot and its patch pipeline.
//! It is cheap to build and is rebuilt on every reconcile cycle.

use std::collections::BTreeMap;
use tracing::debug;

use crate::catalog::{Catalog, available_versions, find_release};
use crate::config::{ConfigView, RELEASE};
use crate::error::Result;
use crate::patch::{PatchContext, PatchPipeline};
use crate::patches::{is_owned, owner_selector};
use crate::resource::ManifestObject;

/// Name of the rawfile-localpv manifest set
pub const RAWFILE_MANIFEST: &str = "rawfile-local-pv";

/// The desired object set for one application
pub struct ManifestSet {
    name: String,
    app: String,
    config: ConfigView,
    pipeline: PatchPipeline,
}

impl ManifestSet {
    /// Manifest set using the standard patch pipeline
    pub fn new(name: impl Into<String>, app: impl Into<String>, config: ConfigView) -> Self {
        Self {
            name: name.into(),
            app: app.into(),
            config,
            pipeline: PatchPipeline::standard(),
        }
    }

    /// The rawfile-localpv manifest set for an application
    pub fn rawfile(app: impl Into<String>, config: ConfigView) -> Self {
        Self::new(RAWFILE_MANIFEST, app, config)
    }

    /// Replace the patch pipeline
    pub fn with_pipeline(mut self, pipeline: PatchPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn app(&self) -> &str {
        &self.app
    }

    pub fn config(&self) -> &ConfigView {
        &self.config
    }

    /// Namespace this set deploys into
    pub fn namespace(&self) -> &str {
        self.config.namespace()
    }

    /// Every bundled release, oldest first
    pub fn releases(&self) -> Vec<&'static str> {
        available_versions()
    }

    /// Release selected by configuration (newest when unset)
    pub fn current_release(&self) -> Result<&'static str> {
        Ok(find_release(self.config.get_str(RELEASE))?.version)
    }

    /// Load the selected release and run the patch pipeline over it
    pub fn desired(&self) -> Result<Vec<ManifestObject>> {
        let release = find_release(self.config.get_str(RELEASE))?;
        let mut catalog = Catalog::load(release)?;

        let ctx = PatchContext {
            config: &self.config,
            app: &self.app,
            manifest: &self.name,
            version: release.version,
        };
        self.pipeline.apply_all(&ctx, &mut catalog);

        debug!(
            manifest = %self.name,
            version = release.version,
            count = catalog.len(),
            "Built desired manifests"
        );
        Ok(catalog.into_objects())
    }

    /// Label selector for objects owned by this set
    pub fn owner_selector(&self) -> String {
        owner_selector(&self.app, &self.name)
    }

    /// Check whether a live object's labels mark it as ours
    pub fn owns(&self, labels: Option<&BTreeMap<String, String>>) -> bool {
        is_owned(labels, &self.app, &self.name)
    }
}

/// Render objects as a multi-document YAML stream
pub fn to_yaml(objects: &[ManifestObject]) -> Result<String> {
    let mut out = String::new();
    for obj in objects {
        out.push_str("---\n");
        out.push_str(&serde_yaml::to_string(&obj.to_json()?)?);
    }
    Ok(out)
}
