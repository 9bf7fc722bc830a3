use tracing::warn;

use crate::config::{STORAGE_CLASS_NAME, STORAGE_CLASS_RECLAIM_POLICY};
use crate::format::csi_driver_name;
use crate::patch::{Patch, PatchContext};
use crate::resource::ManifestObject;

/// Names the StorageClass and points it at this application's driver
pub struct ConfigureStorageClass;

impl Patch for ConfigureStorageClass {
    fn name(&self) -> &'static str {
        "configure-storage-class"
    }

    fn apply(&self, ctx: &PatchContext<'_>, obj: &mut ManifestObject) {
        let ManifestObject::StorageClass(sc) = obj else {
            return;
        };
        if sc.metadata.name.is_none() {
            return;
        }

        match ctx.config.get_str(STORAGE_CLASS_NAME) {
            Some(name) => sc.metadata.name = Some(name.to_string()),
            None => warn!("StorageClass name is missing in configuration, keeping chart name"),
        }

        sc.provisioner = csi_driver_name(ctx.config, ctx.app);

        match ctx.config.get_str(STORAGE_CLASS_RECLAIM_POLICY) {
            Some(policy) => sc.reclaim_policy = Some(policy.to_string()),
            None => warn!(
                storage_class = sc.metadata.name.as_deref().unwrap_or_default(),
                "Reclaim policy is missing in configuration, keeping chart policy"
            ),
        }
    }
}
