//! rawfile-core - manifest reconciliation core for the rawfile-localpv operator
//!
//! This crate provides the pure, offline half of the operator:
//! - `config`: Declared options and the cleaned `ConfigView`
//! - `catalog`: Bundled chart releases and the manifest catalog
//! - `resource`: Typed chart objects and their identities
//! - `patch` / `patches`: The ordered patch pipeline
//! - `manifests`: Manifest sets tying a release, config, and pipeline together

pub mod catalog;
pub mod config;
pub mod error;
pub mod format;
pub mod manifests;
pub mod patch;
pub mod patches;
pub mod resource;

pub use catalog::{BUNDLED_RELEASES, BundledRelease, Catalog, RELEASE_PREFIX, available_versions};
pub use config::{ConfigValue, ConfigView, DEFAULT_NAMESPACE, OperatorConfig};
pub use error::{CoreError, Result, chain_message};
pub use format::{DRIVER_NAME, csi_driver_name};
pub use manifests::{ManifestSet, RAWFILE_MANIFEST, to_yaml};
pub use patch::{Patch, PatchContext, PatchPipeline};
pub use resource::{ManifestObject, ResourceId, is_cluster_scoped};
