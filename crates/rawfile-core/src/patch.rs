//! Patch pipeline
//!
//! A [`Patch`] transforms one object in place using an immutable
//! [`PatchContext`]. Patches return early for kinds they do not target and
//! log-and-skip structurally incomplete objects, so one malformed object
//! never stops the rest of the catalog from being patched.

use crate::catalog::Catalog;
use crate::config::ConfigView;
use crate::patches::{
    AdjustNamespace, ConfigureStorageClass, CsiDriverAdjustments, DaemonSetAdjustments,
    ManifestLabel, RbacAdjustments, UpdateCsiDriverName,
};
use crate::resource::ManifestObject;

/// Everything a patch may read
#[derive(Debug, Clone, Copy)]
pub struct PatchContext<'a> {
    /// Configuration snapshot for this cycle
    pub config: &'a ConfigView,
    /// Application (instance) name
    pub app: &'a str,
    /// Manifest set name
    pub manifest: &'a str,
    /// Chart release being deployed
    pub version: &'a str,
}

/// A single transformation applied to every catalog object
pub trait Patch: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Called once per catalog run, before any object is patched
    ///
    /// Configuration warnings belong here so they are not repeated per object.
    fn check(&self, _ctx: &PatchContext<'_>) {}

    /// Apply to one object
    fn apply(&self, ctx: &PatchContext<'_>, obj: &mut ManifestObject);
}

/// Ordered chain of patches
pub struct PatchPipeline {
    patches: Vec<Box<dyn Patch>>,
}

impl PatchPipeline {
    /// Pipeline with no patches
    pub fn empty() -> Self {
        Self {
            patches: Vec::new(),
        }
    }

    /// The rawfile-localpv pipeline, in its fixed order
    pub fn standard() -> Self {
        Self::empty()
            .with(AdjustNamespace)
            .with(ConfigureStorageClass)
            .with(CsiDriverAdjustments)
            .with(DaemonSetAdjustments)
            .with(ManifestLabel)
            .with(RbacAdjustments)
            .with(UpdateCsiDriverName)
    }

    /// Append a patch
    pub fn with(mut self, patch: impl Patch + 'static) -> Self {
        self.patches.push(Box::new(patch));
        self
    }

    /// Patch names in application order
    pub fn names(&self) -> Vec<&'static str> {
        self.patches.iter().map(|p| p.name()).collect()
    }

    /// Apply every patch, in order, to one object
    pub fn apply(&self, ctx: &PatchContext<'_>, obj: &mut ManifestObject) {
        for patch in &self.patches {
            patch.apply(ctx, obj);
        }
    }

    /// Apply every patch to every object in the catalog
    pub fn apply_all(&self, ctx: &PatchContext<'_>, catalog: &mut Catalog) {
        for patch in &self.patches {
            patch.check(ctx);
        }
        for obj in catalog.objects_mut() {
            self.apply(ctx, obj);
        }
    }
}

impl Default for PatchPipeline {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{BUNDLED_RELEASES, Catalog};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use crate::config::{
        CSI_DRIVER_FORMATTER, ConfigValue, NAMESPACE, NODE_SELECTOR, RBAC_NAME_FORMATTER,
        STORAGE_CLASS_NAME,
    };

    struct Rename;

    impl Patch for Rename {
        fn name(&self) -> &'static str {
            "rename"
        }

        fn apply(&self, _ctx: &PatchContext<'_>, obj: &mut ManifestObject) {
            let name = obj.name().unwrap_or_default().to_string();
            obj.metadata_mut().name = Some(format!("x-{}", name));
        }
    }

    #[derive(Default)]
    struct Counting {
        checks: Arc<AtomicUsize>,
        applies: Arc<AtomicUsize>,
    }

    impl Patch for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn check(&self, _ctx: &PatchContext<'_>) {
            self.checks.fetch_add(1, Ordering::SeqCst);
        }

        fn apply(&self, _ctx: &PatchContext<'_>, _obj: &mut ManifestObject) {
            self.applies.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn config() -> ConfigView {
        ConfigView::from_pairs([
            (NAMESPACE, ConfigValue::String("storage".to_string())),
            (NODE_SELECTOR, ConfigValue::String("disk=ssd".to_string())),
            (RBAC_NAME_FORMATTER, ConfigValue::String("{app}-{name}".to_string())),
            (CSI_DRIVER_FORMATTER, ConfigValue::String("{app}.{name}".to_string())),
            (STORAGE_CLASS_NAME, ConfigValue::String("local".to_string())),
        ])
    }

    #[test]
    fn test_standard_order() {
        assert_eq!(
            PatchPipeline::standard().names(),
            vec![
                "adjust-namespace",
                "configure-storage-class",
                "csi-driver-adjustments",
                "daemonset-adjustments",
                "manifest-label",
                "rbac-adjustments",
                "update-csi-driver-name",
            ]
        );
    }

    #[test]
    fn test_custom_patch_runs_on_every_object() {
        let mut catalog = Catalog::load(&BUNDLED_RELEASES[0]).unwrap();
        let config = ConfigView::default();
        let ctx = PatchContext {
            config: &config,
            app: "app",
            manifest: "m",
            version: "0.8.2",
        };
        PatchPipeline::empty().with(Rename).apply_all(&ctx, &mut catalog);

        assert!(
            catalog
                .objects()
                .iter()
                .all(|o| o.name().unwrap_or_default().starts_with("x-"))
        );
    }

    #[test]
    fn test_check_runs_once_per_catalog() {
        let mut catalog = Catalog::load(&BUNDLED_RELEASES[1]).unwrap();
        let config = ConfigView::default();
        let ctx = PatchContext {
            config: &config,
            app: "app",
            manifest: "m",
            version: "0.9.1",
        };
        let counting = Counting::default();
        let checks = counting.checks.clone();
        let applies = counting.applies.clone();

        PatchPipeline::empty()
            .with(counting)
            .apply_all(&ctx, &mut catalog);

        assert_eq!(checks.load(Ordering::SeqCst), 1);
        assert_eq!(applies.load(Ordering::SeqCst), catalog.len());
    }

    #[test]
    fn test_pipeline_is_deterministic() {
        let config = config();
        let ctx = PatchContext {
            config: &config,
            app: "foo",
            manifest: "rawfile-local-pv",
            version: "0.9.1",
        };
        let pipeline = PatchPipeline::standard();

        let render = || {
            let mut catalog = Catalog::load(&BUNDLED_RELEASES[1]).unwrap();
            pipeline.apply_all(&ctx, &mut catalog);
            catalog
                .objects()
                .iter()
                .map(|o| o.to_json().unwrap())
                .collect::<Vec<_>>()
        };

        assert_eq!(render(), render());
    }

    #[test]
    fn test_pipeline_rewrites_bundled_release() {
        let config = config();
        let ctx = PatchContext {
            config: &config,
            app: "foo",
            manifest: "rawfile-local-pv",
            version: "0.9.1",
        };
        let mut catalog = Catalog::load(&BUNDLED_RELEASES[1]).unwrap();
        PatchPipeline::standard().apply_all(&ctx, &mut catalog);

        for obj in catalog.objects() {
            if obj.is_namespaced() {
                assert_eq!(obj.metadata().namespace.as_deref(), Some("storage"));
            }
            assert!(obj.metadata().labels.is_some(), "{} not labelled", obj.id());
        }

        let names: Vec<String> = catalog.objects().iter().map(|o| o.id().to_string()).collect();
        assert!(names.contains(&"CSIDriver/foo.rawfile.csi.openebs.io".to_string()));
        assert!(names.contains(&"StorageClass/local".to_string()));
        assert!(names.contains(&"ClusterRole/foo-rawfile-csi-provisioner".to_string()));
        assert!(names.contains(&"DaemonSet/storage/rawfile-csi-node".to_string()));
    }
}
