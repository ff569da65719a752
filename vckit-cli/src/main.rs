mod commands;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use vckit_common::vsphere::VsphereClient;

#[derive(Parser)]
#[command(name = "vckit")]
#[command(version)]
#[command(about = "Operator CLI for VM teardown and sysprep waits", long_about = None)]
struct Cli {
    /// Management API address
    #[arg(
        long,
        env = "VCKIT_SERVER",
        default_value = "https://127.0.0.1",
        global = true
    )]
    server: String,

    /// Configuration-management registry address (for --purge)
    #[arg(
        long,
        env = "VCKIT_REGISTRY",
        default_value = "https://127.0.0.1:8443",
        global = true
    )]
    registry: String,

    /// Management API user
    #[arg(
        long,
        env = "VCKIT_USERNAME",
        default_value = "administrator@vsphere.local",
        global = true
    )]
    username: String,

    /// Management API password
    #[arg(long, env = "VCKIT_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Virtual machine operations
    Vm {
        #[command(subcommand)]
        command: VmCommands,
    },
}

#[derive(Subcommand)]
enum VmCommands {
    /// Power off (if running) and destroy a VM
    Delete {
        /// VM name to delete
        vmname: String,

        /// Also delete the node and client records from the registry
        #[arg(short = 'P', long)]
        purge: bool,

        /// Record name used for --purge (default: VMNAME)
        #[arg(short = 'N', long = "node-name")]
        node_name: Option<String>,
    },

    /// Wait for guest-OS events on a VM
    Wait {
        #[command(subcommand)]
        command: WaitCommands,
    },
}

#[derive(Subcommand)]
enum WaitCommands {
    /// Wait for guest customization (sysprep) to finish
    Sysprep {
        /// VM name to watch
        vmname: String,

        /// Seconds between queries for the CustomizationSucceeded event
        #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
        sleep: u64,

        /// Seconds before aborting the wait
        #[arg(long, default_value_t = 300, value_parser = clap::value_parser!(u64).range(1..))]
        timeout: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let Some(password) = cli.password.clone() else {
        bail!("no password supplied (use --password or VCKIT_PASSWORD)");
    };

    let client = VsphereClient::connect(&cli.server, &cli.username, &password).await?;

    match cli.command {
        Commands::Vm { command } => match command {
            VmCommands::Delete {
                vmname,
                purge,
                node_name,
            } => {
                commands::delete::execute(&client, &cli.registry, vmname, purge, node_name).await?;
            }
            VmCommands::Wait { command } => match command {
                WaitCommands::Sysprep {
                    vmname,
                    sleep,
                    timeout,
                } => {
                    commands::wait_sysprep::execute(&client, &vmname, sleep, timeout).await?;
                }
            },
        },
    }

    Ok(())
}
