//! Environment directory layout (`spec.md §3`): the per-project hashed
//! directory under `<user-home>/.pantry/envs/<basename>_<proj-hash>-
//! <deps-hash>/` that shell-hook integrations point `PATH` at. The shell
//! hook generator itself is out of scope (`spec.md §1`/`§6`); this module
//! only materializes the directory shape and keeps its `bin/` in sync with
//! the project's own `pantry/.bin`.

use crate::config::PantryConfig;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// `<basename>_<proj-hash>-<deps-hash>`, the directory name component under
/// `envs_dir` (`spec.md §3`).
pub fn env_dir_name(project_dir: &Path, deps_path: &Path) -> String {
    let basename = project_dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "project".to_string());
    let proj_hash = crate::utils::hash::proj_hash(project_dir);
    let deps_hash = crate::utils::hash::deps_hash(deps_path);
    format!("{basename}_{proj_hash}-{deps_hash}")
}

/// The full per-project hashed environment directory
/// (`<config.envs_dir>/<basename>_<proj-hash>-<deps-hash>/`).
pub fn env_dir(config: &PantryConfig, project_dir: &Path, deps_path: &Path) -> PathBuf {
    config.envs_dir.join(env_dir_name(project_dir, deps_path))
}

/// Creates the environment directory's `bin/` shape, returning its path.
/// Cheap enough to call unconditionally at orchestrator `Init`, even on the
/// fast path.
pub fn ensure_env_layout(config: &PantryConfig, project_dir: &Path, deps_path: &Path) -> Result<PathBuf> {
    let bin_dir = env_dir(config, project_dir, deps_path).join("bin");
    crate::utils::fs::ensure_dir(&bin_dir)?;
    Ok(bin_dir)
}

/// Mirrors every shim currently in `<project>/pantry/.bin` into the
/// environment's own `bin/` directory via the atomic-symlink protocol, so a
/// shell that has `cd`'d into this project and picked up `env_bin_dir` via
/// the (out-of-scope) shell hook sees the same executables.
pub fn sync_bin_shims(project_bin_dir: &Path, env_bin_dir: &Path) -> Result<()> {
    if !project_bin_dir.is_dir() {
        return Ok(());
    }
    crate::utils::fs::ensure_dir(env_bin_dir)?;
    for entry in std::fs::read_dir(project_bin_dir)? {
        let entry = entry?;
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        let target = std::fs::canonicalize(entry.path()).unwrap_or_else(|_| entry.path());
        crate::utils::fs::atomic_symlink(&target, &env_bin_dir.join(name))?;
    }
    Ok(())
}
