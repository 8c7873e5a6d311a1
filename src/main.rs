//! Pantry CLI entry point.
//!
//! Parses just enough of the command line to invoke the install engine
//! (`pantry install ...`); the rest of a real CLI frontend is out of scope
//! for this core (`spec.md §1`).

use clap::Parser;
use colored::Colorize;
use pantry_cli::cli::{self, Command};
use pantry_cli::config::PantryConfig;
use pantry_cli::core::error::user_friendly_error;
use pantry_cli::depsfile::DepsFile;
use pantry_cli::installer::cache::HttpPackageCache;
use pantry_cli::orchestrator::{DependencyFilter, InstallOptions, Orchestrator};
use pantry_cli::resolver::Resolver;
use pantry_cli::resolver::registry::{EmptyPantryS3Registry, StaticBuiltinRegistry};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = cli::Cli::parse();

    // Logging level rules mirror the reference CLI: RUST_LOG always wins
    // when set; otherwise --verbose raises the default to debug; otherwise
    // logging is off.
    let rust_log_exists = std::env::var("RUST_LOG").is_ok();
    let filter = if rust_log_exists {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error"))
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("off")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let result = match cli.command {
        Command::Install(args) => run_install(args),
    };

    match result {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            eprintln!("{}", user_friendly_error(e).display());
            std::process::exit(1);
        }
    }
}

fn run_install(args: cli::InstallArgs) -> anyhow::Result<i32> {
    let project_dir = if args.global {
        dirs::home_dir().unwrap_or_else(|| std::path::PathBuf::from("."))
    } else {
        let cwd = std::env::current_dir()?;
        DepsFile::find(&cwd)
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or(cwd)
    };

    let dependency_filter = if args.production {
        Some(DependencyFilter::ProductionOnly)
    } else if args.dev {
        Some(DependencyFilter::DevOnly)
    } else if args.peer {
        Some(DependencyFilter::PeerOnly)
    } else {
        None
    };

    let mut config = PantryConfig::load();
    if args.offline {
        config.offline = true;
    }

    let options = InstallOptions {
        force: args.force,
        dependency_filter,
        ignore_scripts: args.ignore_scripts,
        offline: config.offline,
        name_filter: args.filter.clone(),
    };

    let resolver = Resolver::new(Arc::new(StaticBuiltinRegistry), Arc::new(EmptyPantryS3Registry));
    let cache = HttpPackageCache::new(config.cache_dir.clone());
    let orchestrator = Orchestrator::new(project_dir, config, resolver, &cache);

    let summary = orchestrator.install(&options)?;

    if summary.up_to_date {
        let noun = if summary.skipped_count == 1 { "package" } else { "packages" };
        println!("up to date {} {}", summary.skipped_count, noun);
        return Ok(0);
    }

    for name in &summary.installed {
        println!("{} {}", "+".green(), name);
    }
    for (name, reason) in &summary.failed {
        println!("{} {}: {}", "x".red(), name.red(), reason);
    }

    println!(
        "{} installed, {} failed in {}ms",
        summary.installed.len(),
        summary.failed.len(),
        summary.elapsed_ms
    );

    Ok(0)
}
