//! Shared command setup: configuration, manifest sets, cluster access

use clap::Args;
use rawfile_core::{ConfigView, ManifestSet, OperatorConfig};
use rawfile_kube::{FileStateStore, KubeClusterClient, LeaseElector};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{CliError, Result};

/// Options shared by every command
#[derive(Args, Debug, Clone)]
pub struct OperatorArgs {
    /// Application (instance) name
    #[arg(long, global = true, env = "RAWFILE_APP", default_value = "rawfile")]
    pub app: String,

    /// Operator configuration file (YAML, kebab-case keys)
    #[arg(short = 'c', long, global = true, env = "RAWFILE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Set configuration options on the command line (key=value)
    #[arg(long = "set", global = true)]
    pub set: Vec<String>,

    /// File holding state that survives between runs
    #[arg(
        long,
        global = true,
        env = "RAWFILE_STATE_FILE",
        default_value = "rawfile-operator-state.json"
    )]
    pub state_file: PathBuf,

    /// Leader election identity; without one this replica acts as leader
    #[arg(long, global = true, env = "POD_NAME")]
    pub identity: Option<String>,

    /// Namespace of the leader election lease (defaults to the target namespace)
    #[arg(long, global = true, env = "POD_NAMESPACE")]
    pub lease_namespace: Option<String>,
}

impl OperatorArgs {
    /// Load the configuration file and apply `--set` overrides
    pub fn load_config(&self) -> Result<OperatorConfig> {
        let mut config = match &self.config {
            Some(path) => OperatorConfig::from_file(path).map_err(|e| {
                CliError::config_with_help(
                    format!("{}: {}", path.display(), rawfile_core::chain_message(&e)),
                    "Options are kebab-case, e.g. storage-class-name: local",
                )
            })?,
            None => OperatorConfig::default(),
        };
        config.apply_overrides(&self.set)?;
        Ok(config)
    }

    pub fn config_view(&self) -> Result<ConfigView> {
        Ok(ConfigView::from_config(&self.load_config()?))
    }

    /// Manifest sets managed by this application
    pub fn manifest_sets(&self) -> Result<Vec<ManifestSet>> {
        Ok(vec![ManifestSet::rawfile(&self.app, self.config_view()?)])
    }

    pub fn state_store(&self) -> FileStateStore {
        FileStateStore::new(&self.state_file)
    }

    /// Connect to the cluster, using the application name as field manager
    pub async fn connect(&self) -> Result<KubeClusterClient> {
        KubeClusterClient::connect(&self.app)
            .await
            .map_err(|e| CliError::cluster(rawfile_core::chain_message(&e)))
    }

    /// Whether this replica may mutate the cluster this run
    pub async fn is_leader(&self, client: &KubeClusterClient) -> Result<bool> {
        let Some(identity) = &self.identity else {
            debug!("No identity configured, acting as leader");
            return Ok(true);
        };

        let view = self.config_view()?;
        let namespace = self.lease_namespace(&view);
        let elector = LeaseElector::new(client.client(), &self.app, &namespace, identity);
        let leader = match elector.try_acquire_or_renew().await {
            Ok(leader) => leader,
            Err(e) if e.is_not_found() => {
                let leader = leader_without_lease_namespace(&namespace, &view);
                warn!(
                    namespace = %namespace,
                    leader,
                    "Lease namespace does not exist, leaving it to the namespace guard"
                );
                leader
            }
            Err(e) => return Err(e.into()),
        };
        info!(identity = %identity, leader, "Leadership checked");
        Ok(leader)
    }

    /// Namespace holding the lease: the operator's own, else the target
    pub fn lease_namespace(&self, view: &ConfigView) -> String {
        self.lease_namespace
            .clone()
            .filter(|ns| !ns.is_empty())
            .unwrap_or_else(|| view.namespace().to_string())
    }
}

/// Leadership when the lease namespace is missing
///
/// No replica can hold a lease in a namespace that does not exist. When
/// that namespace is the target and may be created, every replica runs
/// one cycle as leader: namespace creation treats "already exists" as
/// success and server-side apply converges. Otherwise nobody leads and the
/// namespace guard reports the missing namespace.
fn leader_without_lease_namespace(lease_namespace: &str, view: &ConfigView) -> bool {
    lease_namespace == view.namespace() && view.create_namespace()
}
