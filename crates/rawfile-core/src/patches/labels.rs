use std::collections::BTreeMap;

use crate::patch::{Patch, PatchContext};
use crate::resource::ManifestObject;

/// Application that owns an object
pub const APPLICATION_LABEL: &str = "rawfile-operator.io/application";
/// Manifest set that owns an object
pub const MANIFEST_LABEL: &str = "rawfile-operator.io/manifest";
/// Manifest set and chart release that produced an object
pub const MANIFEST_VERSION_LABEL: &str = "rawfile-operator.io/manifest-version";

/// Label selector matching every object owned by a manifest set
pub fn owner_selector(app: &str, manifest: &str) -> String {
    format!("{}={},{}={}", APPLICATION_LABEL, app, MANIFEST_LABEL, manifest)
}

/// Check whether labels mark an object as owned by this manifest set
pub fn is_owned(labels: Option<&BTreeMap<String, String>>, app: &str, manifest: &str) -> bool {
    labels.is_some_and(|labels| {
        labels.get(APPLICATION_LABEL).map(String::as_str) == Some(app)
            && labels.get(MANIFEST_LABEL).map(String::as_str) == Some(manifest)
    })
}

/// Stamps ownership labels on every object
pub struct ManifestLabel;

impl Patch for ManifestLabel {
    fn name(&self) -> &'static str {
        "manifest-label"
    }

    fn apply(&self, ctx: &PatchContext<'_>, obj: &mut ManifestObject) {
        let labels = obj.labels_mut();
        labels.insert(APPLICATION_LABEL.to_string(), ctx.app.to_string());
        labels.insert(MANIFEST_LABEL.to_string(), ctx.manifest.to_string());
        labels.insert(
            MANIFEST_VERSION_LABEL.to_string(),
            format!("{}-{}", ctx.manifest, ctx.version.replace('.', "-")),
        );
    }
}
