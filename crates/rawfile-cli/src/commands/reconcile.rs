//! Reconcile command - one cycle for a lifecycle event

use rawfile_kube::{Event, Reconciler};

use crate::display;
use crate::error::{CliError, Result};
use crate::util::OperatorArgs;

pub async fn run(args: &OperatorArgs, event: Event, json: bool) -> Result<()> {
    let manifests = args.manifest_sets()?;
    let client = args.connect().await?;
    let is_leader = args.is_leader(&client).await?;
    let store = args.state_store();

    let reconciler = Reconciler::new(&client, &store, manifests, is_leader);
    let outcome = reconciler.reconcile(event).await?;

    if json {
        let out = serde_json::to_string_pretty(&display::outcome_json(&outcome))
            .map_err(|e| CliError::Other {
                message: e.to_string(),
            })?;
        println!("{}", out);
    } else {
        display::print_outcome(&outcome);
    }
    Ok(())
}
