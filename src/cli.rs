//! CLI surface (`spec.md §6`): only as much argument parsing as is needed
//! to invoke the install engine. A full CLI frontend is an explicit
//! external collaborator per `spec.md §1`; this is the thin shim that
//! exercises it.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "pantry", about = "A fast, deterministic dependency install engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose (debug-level) logging.
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Install the project's declared dependencies.
    Install(InstallArgs),
}

#[derive(clap::Args, Debug, Default)]
pub struct InstallArgs {
    /// Install into the user's global environment instead of the project.
    #[arg(short = 'g', long)]
    pub global: bool,

    /// Bypass the fast path and the Skip Oracle unconditionally.
    #[arg(short = 'f', long)]
    pub force: bool,

    /// Install only production (normal) dependencies.
    #[arg(long)]
    pub production: bool,

    /// Install only devDependencies.
    #[arg(long)]
    pub dev: bool,

    /// Install only peerDependencies.
    #[arg(long)]
    pub peer: bool,

    /// Skip all lifecycle scripts, trusted or not.
    #[arg(long = "ignore-scripts")]
    pub ignore_scripts: bool,

    /// Only install from the local cache; fail on a cache miss.
    #[arg(long)]
    pub offline: bool,

    /// Restrict installation to packages/paths matching this pattern.
    #[arg(long)]
    pub filter: Option<String>,

    /// Linker mode; accepted for compatibility but not yet differentiated.
    #[arg(long)]
    pub linker: Option<String>,
}
