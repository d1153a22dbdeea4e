use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "catscan",
    about = "catscan: registry of hosted files with continuous liveness pruning",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// TOML configuration file. Environment variables override it.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP server and the liveness verifier
    Serve(ServeArgs),
    /// Print the number of registered entries
    Count,
    /// Register an entry
    Add(AddArgs),
    /// Print random links from the registry
    Sample(SampleArgs),
    /// Probe one entry without touching the registry
    Check(CheckArgs),
    /// Print the effective configuration
    Config,
}

#[derive(Args)]
pub struct ServeArgs {
    /// Listen address, overriding configuration
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    /// Serve without the liveness verifier
    #[arg(long)]
    pub no_verify: bool,
}

#[derive(Args)]
pub struct AddArgs {
    pub id: String,
    pub ext: String,
}

#[derive(Args)]
pub struct SampleArgs {
    #[arg(short = 'n', long, default_value = "1")]
    pub count: usize,
    #[arg(long)]
    pub ext: Option<String>,
}

#[derive(Args)]
pub struct CheckArgs {
    pub id: String,
    pub ext: String,
}
