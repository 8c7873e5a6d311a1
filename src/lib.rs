//! Pantry's install engine core.
//!
//! Pantry materializes a project's declared dependencies into a
//! deterministic, per-project environment containing installed packages
//! and a `.bin` directory of executable shims. This crate implements the
//! install pipeline itself: fast-path skip logic, multi-source resolution,
//! a parallel worker pool, a resume/rollback state machine, and lockfile
//! equivalence -- plus the trusted-package lifecycle gate, local/link
//! package materialization, and workspace aggregation.
//!
//! # Core modules
//!
//! - [`depsfile`] - project deps file (`pantry.json`/`.jsonc`/`package.json`) loading
//! - [`resolver`] - turns a declared dependency into a concrete, installable [`resolver::PackageSpec`]
//! - [`lockfile`] - reads, writes, and diffs `pantry.lock`
//! - [`skip_oracle`] - decides whether a dependency can be skipped
//! - [`installer`] - materializes one resolved package into the environment
//! - [`worker_pool`] - bounded-concurrency parallel task execution
//! - [`lifecycle`] - the trusted-package post-install script gate
//! - [`checkpoint`] - persisted progress for resumption and rollback
//! - [`local_link`] - filesystem-path and `link:` dependency wiring
//! - [`workspace`] - multi-package workspace aggregation
//! - [`environment`] - the per-project hashed environment directory layout
//! - [`orchestrator`] - the top-level install state machine

pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod core;
pub mod depsfile;
pub mod environment;
pub mod installer;
pub mod lifecycle;
pub mod local_link;
pub mod lockfile;
pub mod orchestrator;
pub mod resolver;
pub mod skip_oracle;
pub mod utils;
pub mod worker_pool;
pub mod workspace;
