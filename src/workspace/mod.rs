//! Workspace Aggregator: unifies members' dependencies with catalogs,
//! filters, and change detection (`spec.md §4.9`).

use crate::depsfile::{DEPS_FILE_NAMES, DepsFile, Dependency};
use anyhow::{Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

const IGNORED_DIR_NAMES: &[&str] = &["node_modules", ".git", "dist", "build"];

/// Expands each workspace member glob pattern against `root`, filtering out
/// ignored directories and keeping only directories with a deps file
/// (`spec.md §4.9`).
pub fn discover_members(root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut members = BTreeSet::new();

    for pattern in patterns {
        let full_pattern = root.join(pattern);
        let pattern_str = full_pattern.to_string_lossy().to_string();
        for entry in glob::glob(&pattern_str).context("invalid workspace glob pattern")? {
            let path = entry.context("failed to read glob entry")?;
            if !path.is_dir() {
                continue;
            }
            if is_ignored(&path) {
                continue;
            }
            if is_valid_member(&path) {
                members.insert(path);
            }
        }
    }

    Ok(members.into_iter().collect())
}

fn is_ignored(path: &Path) -> bool {
    path.components().any(|c| {
        let s = c.as_os_str().to_string_lossy();
        IGNORED_DIR_NAMES.contains(&s.as_ref()) || (s.starts_with('.') && s.len() > 1)
    })
}

fn is_valid_member(path: &Path) -> bool {
    DEPS_FILE_NAMES.iter().any(|name| path.join(name).is_file())
}

/// Parses comma-separated filter patterns (`spec.md §4.9`): globs/paths
/// with `!` negation. A member is included iff at least one positive
/// pattern matches and no negative pattern matches.
pub struct MemberFilter {
    positive: Vec<glob::Pattern>,
    negative: Vec<glob::Pattern>,
}

impl MemberFilter {
    pub fn parse(filter_spec: &str) -> Result<Self> {
        let mut positive = Vec::new();
        let mut negative = Vec::new();
        for raw in filter_spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if let Some(rest) = raw.strip_prefix('!') {
                negative.push(glob::Pattern::new(rest).context("invalid negative filter pattern")?);
            } else {
                positive.push(glob::Pattern::new(raw).context("invalid filter pattern")?);
            }
        }
        Ok(Self { positive, negative })
    }

    pub fn includes(&self, package_name: &str, member_path: &str) -> bool {
        let positive_match = self.positive.is_empty()
            || self
                .positive
                .iter()
                .any(|p| p.matches(package_name) || p.matches(member_path));
        if !positive_match {
            return false;
        }
        !self
            .negative
            .iter()
            .any(|p| p.matches(package_name) || p.matches(member_path))
    }
}

/// Resolves `catalog:<name>` / `catalog:` references against the
/// workspace-root catalogs. Returns `None` (with the caller expected to
/// warn and skip) when the reference is unresolved.
pub fn resolve_catalog_ref<'a>(
    version_spec: &str,
    default_catalog: &'a BTreeMap<String, String>,
    named_catalogs: &'a BTreeMap<String, BTreeMap<String, String>>,
    dep_name: &str,
) -> Option<&'a str> {
    let catalog_ref = version_spec.strip_prefix("catalog:")?;
    let table = if catalog_ref.is_empty() {
        default_catalog
    } else {
        named_catalogs.get(catalog_ref)?
    };
    table.get(dep_name).map(|s| s.as_str())
}

/// Applies `package.json`-style `overrides`: replaces the version of
/// matching dependency names before resolution (`spec.md §4.9`).
pub fn apply_overrides(deps: &mut [Dependency], overrides: &BTreeMap<String, String>) {
    for dep in deps.iter_mut() {
        if let Some(replacement) = overrides.get(&dep.name) {
            dep.version_spec = replacement.clone();
        }
    }
}

/// Change detection: compares `git diff --name-only <ref>` (plus optional
/// uncommitted/untracked sets) output to each member's path, including
/// members whose directory contains at least one changed file
/// (`spec.md §4.9`).
pub fn members_with_changes(root: &Path, members: &[PathBuf], git_ref: &str) -> Result<Vec<PathBuf>> {
    let changed_files = git_diff_names(root, git_ref)?;
    Ok(members
        .iter()
        .filter(|member| {
            let rel = member.strip_prefix(root).unwrap_or(member);
            changed_files.iter().any(|f| f.starts_with(rel))
        })
        .cloned()
        .collect())
}

fn git_diff_names(root: &Path, git_ref: &str) -> Result<Vec<PathBuf>> {
    let diff_output = std::process::Command::new("git")
        .args(["diff", "--name-only", git_ref])
        .current_dir(root)
        .output()
        .context("failed to run git diff")?;
    let untracked_output = std::process::Command::new("git")
        .args(["ls-files", "--others", "--exclude-standard"])
        .current_dir(root)
        .output()
        .context("failed to run git ls-files")?;

    let mut files: Vec<PathBuf> = String::from_utf8_lossy(&diff_output.stdout)
        .lines()
        .map(PathBuf::from)
        .collect();
    files.extend(
        String::from_utf8_lossy(&untracked_output.stdout)
            .lines()
            .map(PathBuf::from),
    );
    Ok(files)
}

/// Returns the published name for a workspace member: `package.json`'s
/// `name` field, falling back to the directory name. Scoped names (e.g.
/// `@scope/name`) produce nested directories when wired under
/// `<root>/pantry/` (`spec.md §4.9`).
pub fn published_name(member_dir: &Path) -> String {
    if let Ok(deps_file) = DepsFile::load(&member_dir.join("package.json")) {
        if let Some(name) = deps_file.raw.name {
            return name;
        }
    }
    member_dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Wires `workspace:*` members by symlinking each under
/// `<root>/pantry/<published-name>`; scoped names become nested
/// directories (`@scope/name` -> `pantry/@scope/name`).
pub fn wire_workspace_member(root: &Path, member_dir: &Path) -> Result<PathBuf> {
    let name = published_name(member_dir);
    let dest = root.join("pantry").join(&name);
    if let Some(parent) = dest.parent() {
        crate::utils::fs::ensure_dir(parent)?;
    }
    crate::utils::fs::atomic_symlink(member_dir, &dest)?;
    Ok(dest)
}

/// Dedupes a flattened dependency list by `"{name}@{version}"`
/// (`spec.md §4.9`).
pub fn dedupe_by_name_version(deps: Vec<Dependency>) -> Vec<Dependency> {
    let mut seen = BTreeSet::new();
    deps.into_iter()
        .filter(|d| seen.insert(format!("{}@{}", d.name, d.version_spec)))
        .collect()
}
