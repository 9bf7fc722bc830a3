use tracing::trace;

use crate::patch::{Patch, PatchContext};
use crate::resource::ManifestObject;

/// Moves namespaced objects into the configured namespace
pub struct AdjustNamespace;

impl Patch for AdjustNamespace {
    fn name(&self) -> &'static str {
        "adjust-namespace"
    }

    fn apply(&self, ctx: &PatchContext<'_>, obj: &mut ManifestObject) {
        if obj.is_opaque() || !obj.is_namespaced() {
            return;
        }

        let namespace = ctx.config.namespace();
        trace!(object = %obj.id(), namespace, "Adjusting namespace");
        obj.metadata_mut().namespace = Some(namespace.to_string());
    }
}
