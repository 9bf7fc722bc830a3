use k8s_openapi::api::core::v1::PodSpec;
use tracing::warn;

use crate::format::csi_driver_name;
use crate::patch::{Patch, PatchContext};
use crate::resource::ManifestObject;

const DRIVER_CONTAINER: &str = "csi-driver";
const PROVISIONER_ENV: &str = "PROVISIONER_NAME";

/// Renames the CSIDriver object to the computed driver name
pub struct CsiDriverAdjustments;

impl Patch for CsiDriverAdjustments {
    fn name(&self) -> &'static str {
        "csi-driver-adjustments"
    }

    fn apply(&self, ctx: &PatchContext<'_>, obj: &mut ManifestObject) {
        if obj.kind() != "CSIDriver" || obj.name().is_none() {
            return;
        }
        obj.metadata_mut().name = Some(csi_driver_name(ctx.config, ctx.app));
    }
}

/// Points the `csi-driver` container at the computed driver name
pub struct UpdateCsiDriverName;

impl Patch for UpdateCsiDriverName {
    fn name(&self) -> &'static str {
        "update-csi-driver-name"
    }

    fn apply(&self, ctx: &PatchContext<'_>, obj: &mut ManifestObject) {
        let (name, pod_spec) = match obj {
            ManifestObject::DaemonSet(ds) => (
                ds.metadata.name.as_deref(),
                ds.spec.as_mut().map(|s| s.template.spec.as_mut()),
            ),
            ManifestObject::StatefulSet(sts) => (
                sts.metadata.name.as_deref(),
                sts.spec.as_mut().map(|s| s.template.spec.as_mut()),
            ),
            _ => return,
        };
        let Some(name) = name else {
            return;
        };

        let pod_spec: &mut PodSpec = match pod_spec {
            None => {
                warn!(resource = name, "Missing spec, skipping CSI driver name update");
                return;
            }
            Some(None) => {
                warn!(resource = name, "Missing pod spec, skipping CSI driver name update");
                return;
            }
            Some(Some(pod_spec)) => pod_spec,
        };

        let driver = csi_driver_name(ctx.config, ctx.app);
        for container in pod_spec
            .containers
            .iter_mut()
            .filter(|c| c.name == DRIVER_CONTAINER)
        {
            for env in container.env.iter_mut().flatten() {
                if env.name == PROVISIONER_ENV {
                    env.value = Some(driver.clone());
                }
            }
        }
    }
}
