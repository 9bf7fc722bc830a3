//! rawfile-operator - deploys and reconciles the rawfile-localpv CSI driver

use clap::{Parser, Subcommand};
use rawfile_kube::Event;
use std::path::PathBuf;

mod commands;
mod display;
mod error;
mod exit_codes;
mod util;

use util::OperatorArgs;

#[derive(Parser)]
#[command(name = "rawfile-operator")]
#[command(version)]
#[command(about = "Deploys and reconciles the rawfile-localpv CSI driver", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    operator: OperatorArgs,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one reconcile cycle for a lifecycle event
    Reconcile {
        /// Triggering event
        #[arg(short, long, default_value = "update-status", value_parser = parse_event)]
        event: Event,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the chart releases bundled with this build
    ListVersions,

    /// List correct, missing, conflicting and extra resources
    ListResources {
        /// Kinds, Kind/name or Kind/namespace/name to include (all when empty)
        filter: Vec<String>,
    },

    /// Delete owned resources the current release no longer ships
    ScrubResources {
        /// Kinds, Kind/name or Kind/namespace/name to include (all when empty)
        filter: Vec<String>,
    },

    /// Apply desired resources missing from the cluster
    SyncResources {
        /// Kinds, Kind/name or Kind/namespace/name to include (all when empty)
        filter: Vec<String>,
    },

    /// Render the patched manifests locally
    Template {
        /// Output directory (if not set, outputs to stdout)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

fn parse_event(s: &str) -> Result<Event, String> {
    s.parse()
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    miette::set_panic_hook();
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let result = match cli.command {
        Commands::Reconcile { event, json } => {
            commands::reconcile::run(&cli.operator, event, json).await
        }
        Commands::ListVersions => commands::versions::run(&cli.operator),
        Commands::ListResources { filter } => {
            commands::resources::list(&cli.operator, &filter.join(" ")).await
        }
        Commands::ScrubResources { filter } => {
            commands::resources::scrub(&cli.operator, &filter.join(" ")).await
        }
        Commands::SyncResources { filter } => {
            commands::resources::sync(&cli.operator, &filter.join(" ")).await
        }
        Commands::Template { output_dir } => {
            commands::template::run(&cli.operator, output_dir.as_deref())
        }
    };

    if let Err(err) = result {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}
