//! Bundled chart releases and the manifest catalog
//!
//! Each supported upstream release was rendered offline with the Helm
//! release name `changeme` and is embedded into the binary. Loading a
//! release strips that prefix so objects carry deployment-agnostic names.

use semver::Version;
use serde::Deserialize;
use tracing::debug;

use crate::error::{CoreError, Result};
use crate::resource::ManifestObject;

/// Release name the chart was rendered with
pub const RELEASE_PREFIX: &str = "changeme";

/// A rendered chart release shipped with the operator
#[derive(Debug, Clone, Copy)]
pub struct BundledRelease {
    pub version: &'static str,
    pub manifest: &'static str,
}

/// Every release embedded at build time, oldest first
pub const BUNDLED_RELEASES: &[BundledRelease] = &[
    BundledRelease {
        version: "0.8.2",
        manifest: include_str!("../../../upstream/manifests/0.8.2/rawfile-localpv.yaml"),
    },
    BundledRelease {
        version: "0.9.1",
        manifest: include_str!("../../../upstream/manifests/0.9.1/rawfile-localpv.yaml"),
    },
];

/// Bundled versions sorted by semver, oldest first
pub fn available_versions() -> Vec<&'static str> {
    let mut versions: Vec<&'static str> = BUNDLED_RELEASES.iter().map(|r| r.version).collect();
    versions.sort_by(|a, b| compare_versions(a, b));
    versions
}

/// Newest bundled version
pub fn latest_version() -> Option<&'static str> {
    available_versions().last().copied()
}

/// Look up a bundled release, defaulting to the newest one
pub fn find_release(version: Option<&str>) -> Result<&'static BundledRelease> {
    let wanted = match version {
        Some(v) => v,
        None => latest_version().ok_or_else(|| CoreError::UnknownRelease {
            version: "latest".to_string(),
        })?,
    };

    BUNDLED_RELEASES
        .iter()
        .find(|r| r.version == wanted)
        .ok_or_else(|| CoreError::UnknownRelease {
            version: wanted.to_string(),
        })
}

fn compare_versions(a: &str, b: &str) -> std::cmp::Ordering {
    match (Version::parse(a), Version::parse(b)) {
        (Ok(va), Ok(vb)) => va.cmp(&vb),
        _ => a.cmp(b),
    }
}

/// Ordered collection of the objects belonging to one release
#[derive(Debug, Clone)]
pub struct Catalog {
    version: String,
    objects: Vec<ManifestObject>,
}

impl Catalog {
    /// Parse rendered chart output
    ///
    /// `prefix` is the Helm release name used at render time; every
    /// `<prefix>-` occurrence is removed before decoding.
    pub fn parse(version: &str, source: &str, prefix: &str) -> Result<Self> {
        let stripped = source.replace(&format!("{}-", prefix), "");
        let mut objects = Vec::new();

        for (index, document) in serde_yaml::Deserializer::from_str(&stripped).enumerate() {
            let value = serde_yaml::Value::deserialize(document).map_err(|e| CoreError::Parse {
                release: version.to_string(),
                index,
                message: e.to_string(),
            })?;

            // Comment-only or empty documents
            if value.is_null() {
                continue;
            }

            let object = ManifestObject::decode(value).map_err(|message| CoreError::Parse {
                release: version.to_string(),
                index,
                message,
            })?;
            objects.push(object);
        }

        debug!(version, count = objects.len(), "Loaded manifest catalog");
        Ok(Self {
            version: version.to_string(),
            objects,
        })
    }

    /// Load a bundled release
    pub fn load(release: &BundledRelease) -> Result<Self> {
        Self::parse(release.version, release.manifest, RELEASE_PREFIX)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn objects(&self) -> &[ManifestObject] {
        &self.objects
    }

    pub fn objects_mut(&mut self) -> &mut [ManifestObject] {
        &mut self.objects
    }

    pub fn into_objects(self) -> Vec<ManifestObject> {
        self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
