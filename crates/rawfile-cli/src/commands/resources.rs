//! Resource actions: list, scrub, and sync

use rawfile_kube::{ActionResults, FileStateStore, KubeClusterClient, Reconciler, ResourceFilter};

use crate::display;
use crate::error::Result;
use crate::util::OperatorArgs;

struct Session {
    client: KubeClusterClient,
    store: FileStateStore,
    is_leader: bool,
}

impl Session {
    async fn open(args: &OperatorArgs, needs_leadership: bool) -> Result<Self> {
        let client = args.connect().await?;
        let is_leader = if needs_leadership {
            args.is_leader(&client).await?
        } else {
            false
        };
        Ok(Self {
            client,
            store: args.state_store(),
            is_leader,
        })
    }

    fn reconciler(
        &self,
        args: &OperatorArgs,
    ) -> Result<Reconciler<'_, KubeClusterClient, FileStateStore>> {
        Ok(Reconciler::new(
            &self.client,
            &self.store,
            args.manifest_sets()?,
            self.is_leader,
        ))
    }
}

fn print(results: ActionResults) -> Result<()> {
    display::print_results(&results)
}

pub async fn list(args: &OperatorArgs, filter: &str) -> Result<()> {
    let session = Session::open(args, false).await?;
    let results = session
        .reconciler(args)?
        .list_resources(&ResourceFilter::parse(filter))
        .await;
    print(results)
}

pub async fn scrub(args: &OperatorArgs, filter: &str) -> Result<()> {
    let session = Session::open(args, true).await?;
    let results = session
        .reconciler(args)?
        .scrub_resources(&ResourceFilter::parse(filter))
        .await;
    print(results)
}

pub async fn sync(args: &OperatorArgs, filter: &str) -> Result<()> {
    let session = Session::open(args, true).await?;
    let results = session
        .reconciler(args)?
        .sync_resources(&ResourceFilter::parse(filter))
        .await;
    print(results)
}
