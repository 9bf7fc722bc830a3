//! Patches that turn the generic chart into a tenant-specific deployment

mod csi_driver;
mod daemonset;
mod labels;
mod namespace;
mod rbac;
mod storage_class;

pub use csi_driver::{CsiDriverAdjustments, UpdateCsiDriverName};
pub use daemonset::{DaemonSetAdjustments, NODE_DAEMONSET, parse_node_selector, plugin_dir};
pub use labels::{
    APPLICATION_LABEL, MANIFEST_LABEL, MANIFEST_VERSION_LABEL, ManifestLabel, is_owned,
    owner_selector,
};
pub use namespace::AdjustNamespace;
pub use rbac::RbacAdjustments;
pub use storage_class::ConfigureStorageClass;
