use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::config::{NODE_SELECTOR, NODE_STORAGE_PATH};
use crate::patch::{Patch, PatchContext};
use crate::resource::ManifestObject;

/// Name of the node plugin DaemonSet shipped by the chart
pub const NODE_DAEMONSET: &str = "rawfile-csi-node";

const SOCKET_VOLUME: &str = "socket-dir";
const DATA_VOLUME: &str = "data-dir";
const REGISTRAR_CONTAINER: &str = "node-driver-registrar";
const REGISTRAR_SOCKET_ENV: &str = "DRIVER_REG_SOCK_PATH";

/// Kubelet plugin directory for an application
pub fn plugin_dir(app: &str) -> String {
    format!("/var/lib/kubelet/plugins/{}-rawfile-csi", app)
}

/// Parse a space separated `key=value` node selector
///
/// Tokens without `=` or with an empty key are dropped. Returns `None` when
/// the option is unset or nothing valid remains.
pub fn parse_node_selector(raw: Option<&str>) -> Option<BTreeMap<String, String>> {
    let raw = raw?;
    let parsed: BTreeMap<String, String> = raw
        .split_whitespace()
        .filter_map(|token| token.split_once('='))
        .map(|(key, value)| (key.trim(), value.trim()))
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();

    if parsed.is_empty() { None } else { Some(parsed) }
}

/// Tenant placement and paths for the node plugin DaemonSet
pub struct DaemonSetAdjustments;

impl Patch for DaemonSetAdjustments {
    fn name(&self) -> &'static str {
        "daemonset-adjustments"
    }

    fn apply(&self, ctx: &PatchContext<'_>, obj: &mut ManifestObject) {
        let ManifestObject::DaemonSet(ds) = obj else {
            return;
        };
        let Some(name) = ds.metadata.name.as_deref() else {
            warn!("DaemonSet is missing metadata or name, skipping patch");
            return;
        };
        if name != NODE_DAEMONSET {
            return;
        }

        let Some(spec) = ds.spec.as_mut() else {
            warn!(daemonset = name, "DaemonSet is missing spec, skipping patch");
            return;
        };
        let Some(pod_spec) = spec.template.spec.as_mut() else {
            warn!(daemonset = name, "DaemonSet is missing pod spec, skipping patch");
            return;
        };

        let selector = parse_node_selector(ctx.config.get_str(NODE_SELECTOR));
        if selector.is_none() {
            info!("No node selector configured");
        }
        pod_spec.node_selector = selector;

        let plugins = plugin_dir(ctx.app);
        match pod_spec.volumes.as_mut() {
            None => warn!(daemonset = name, "DaemonSet has no volumes, skipping host paths"),
            Some(volumes) => {
                for volume in volumes.iter_mut() {
                    let Some(host_path) = volume.host_path.as_mut() else {
                        continue;
                    };
                    match volume.name.as_str() {
                        SOCKET_VOLUME => host_path.path = plugins.clone(),
                        DATA_VOLUME => match ctx.config.get_str(NODE_STORAGE_PATH) {
                            Some(path) => host_path.path = path.to_string(),
                            None => warn!(
                                daemonset = name,
                                "No storage path configured for 'data-dir'"
                            ),
                        },
                        _ => {}
                    }
                }
            }
        }

        let Some(registrar) = pod_spec
            .containers
            .iter_mut()
            .find(|c| c.name == REGISTRAR_CONTAINER)
        else {
            return;
        };
        match registrar.env.as_mut() {
            None => warn!(
                daemonset = name,
                "Container 'node-driver-registrar' has no env vars"
            ),
            Some(env) => {
                if let Some(var) = env.iter_mut().find(|e| e.name == REGISTRAR_SOCKET_ENV) {
                    var.value = Some(format!("{}/csi.sock", plugins));
                }
            }
        }
    }
}
