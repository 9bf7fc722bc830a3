//! Terminal output for reconcile outcomes and action results

use console::style;
use rawfile_kube::{ActionResults, ReconcileOutcome, Status};

use crate::error::Result;

/// Action results as a YAML mapping
pub fn render_results(results: &ActionResults) -> Result<String> {
    Ok(serde_yaml::to_string(results)?)
}

pub fn print_results(results: &ActionResults) -> Result<()> {
    print!("{}", render_results(results)?);
    Ok(())
}

pub fn print_outcome(outcome: &ReconcileOutcome) {
    let name = match &outcome.status {
        Status::Active(_) => style(outcome.status.name()).green().bold(),
        Status::Waiting(_) => style(outcome.status.name()).yellow().bold(),
        Status::Maintenance(_) => style(outcome.status.name()).cyan().bold(),
        Status::Blocked(_) => style(outcome.status.name()).red().bold(),
    };
    println!("{}: {}", name, outcome.status.message());

    if let Some(version) = &outcome.version {
        println!("  Version:  {}", style(version).cyan());
    }
    if outcome.terminating {
        println!("  {}", style("Terminating").dim());
    }
}

/// Outcome as a JSON document
pub fn outcome_json(outcome: &ReconcileOutcome) -> serde_json::Value {
    serde_json::json!({
        "status": outcome.status.name(),
        "message": outcome.status.message(),
        "version": outcome.version,
        "terminating": outcome.terminating,
    })
}
