// ambari-state/src/main.rs

use ambari_state::cli::{replay_files, watch_cluster};
use ambari_state::constants::DEFAULT_CONFIG_NAME;
use ambari_state::sync::Resource;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "ambari-state")]
#[command(about = "Keeps an in-memory model of an Ambari cluster in sync by polling its REST API", long_about = None)]
#[command(version = env!("AMBARI_STATE_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the cluster and log every change until interrupted
    Watch {
        /// Configuration file
        #[arg(short, long, value_name = "FILE", env = "AMBARI_STATE_CONFIG", default_value = DEFAULT_CONFIG_NAME)]
        config: PathBuf,
    },
    /// Map saved JSON responses and print what each one changed
    Replay {
        /// host_components, config_versions, cluster_hosts or stack_versions
        resource: Resource,

        /// Snapshot files, applied in order
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,

        /// Cluster host snapshot mapped before each config_versions file
        #[arg(long, value_name = "FILE")]
        hosts: Option<PathBuf>,
    },
}

fn entrypoint() -> Result<()> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Watch { config } => watch_cluster(&config),
        Commands::Replay {
            resource,
            files,
            hosts,
        } => replay_files(resource, &files, hosts.as_deref()),
    }
}

fn main() -> ExitCode {
    match entrypoint() {
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}
