// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "testdock")]
#[command(about = "Deploys built web artifacts into disposable test hosting environments")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Deploy an artifact, print its base URI, and tear down on ctrl-c
    Deploy {
        /// Path to the built application artifact directory. May be omitted
        /// when a parameters file supplies application_path.
        artifact: Option<PathBuf>,

        /// Parameters file to load (defaults to testdock.yml in the current
        /// directory when present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Environment name written into the side-channel file (overrides the
        /// configured value)
        #[arg(short, long)]
        environment: Option<String>,

        /// Admin endpoint of the host-manager registry (host:port)
        #[arg(long)]
        registry: Option<String>,

        /// Use an in-process registry instead of an admin endpoint
        #[arg(long)]
        local: bool,
    },

    /// Print the identity a deployment of this artifact would use
    Identity {
        /// Path to the built application artifact directory
        artifact: PathBuf,
    },
}
