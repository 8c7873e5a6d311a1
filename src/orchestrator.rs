//! Install Orchestrator: the top-level state machine that wires every
//! component together (`spec.md §4.10`).

use crate::checkpoint::InstallCheckpoint;
use crate::config::PantryConfig;
use crate::core::error::PantryError;
use crate::depsfile::{Dependency, DependencyKind, DepsFile};
use crate::installer::cache::PackageCache;
use crate::installer::PackageInstaller;
use crate::lifecycle::LifecycleGate;
use crate::lockfile::{Lockfile, LockfileEntry};
use crate::resolver::Resolver;
use crate::skip_oracle;
use crate::worker_pool::{self, InstallTaskResult};
use anyhow::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyFilter {
    All,
    ProductionOnly,
    DevOnly,
    PeerOnly,
}

#[derive(Debug, Default, Clone)]
pub struct InstallOptions {
    pub force: bool,
    pub dependency_filter: Option<DependencyFilter>,
    pub ignore_scripts: bool,
    pub offline: bool,
    pub name_filter: Option<String>,
}

pub struct InstallSummary {
    pub up_to_date: bool,
    /// Count of dependencies the fast path skipped (`spec.md §4.10`
    /// `FastPathCheck`). Zero unless `up_to_date` is true.
    pub skipped_count: usize,
    pub installed: Vec<String>,
    pub failed: Vec<(String, String)>,
    pub elapsed_ms: u64,
}

pub struct Orchestrator<'a> {
    pub project_dir: PathBuf,
    pub config: PantryConfig,
    pub resolver: Resolver,
    pub cache: &'a dyn PackageCache,
}

impl<'a> Orchestrator<'a> {
    pub fn new(project_dir: PathBuf, config: PantryConfig, resolver: Resolver, cache: &'a dyn PackageCache) -> Self {
        Self {
            project_dir,
            config,
            resolver,
            cache,
        }
    }

    fn pantry_dir(&self) -> PathBuf {
        self.project_dir.join("pantry")
    }

    /// Runs one full install invocation: Init -> FastPathCheck -> Resolve ->
    /// Schedule -> Execute -> Lifecycle -> Lockfile -> Cleanup, with
    /// Rollback as a fault branch from Execute.
    pub fn install(&self, options: &InstallOptions) -> Result<InstallSummary> {
        let start = Instant::now();

        // --- Init ---
        crate::utils::fs::ensure_dir(&self.pantry_dir())?;
        let deps_path = DepsFile::find(&self.project_dir)
            .ok_or_else(|| PantryError::ConfigMissing(self.project_dir.clone()))?;
        let deps_file = DepsFile::load(&deps_path)?;
        let env_bin_dir = crate::environment::ensure_env_layout(&self.config, &self.project_dir, &deps_path)?;
        let lockfile_path = self.project_dir.join(crate::lockfile::LOCKFILE_NAME);
        let existing_lockfile =
            Lockfile::read(&lockfile_path)?.unwrap_or_else(|| Lockfile::empty(now_iso8601()));
        let mut checkpoint = InstallCheckpoint::load(&self.project_dir)?
            .unwrap_or_else(|| InstallCheckpoint::new(now_iso8601()));

        let mut selected_deps = self.select_dependencies(&deps_file, options);

        // --- Resolve: workspace aggregation (spec.md §4.9) ---
        // A root deps file that declares `workspaces` is a workspace root:
        // fold every member's dependencies into one aggregated set (after
        // catalog/override resolution), wire `workspace:*` refs via
        // symlink immediately, and dedupe the remainder by name@version
        // before the rest of the pipeline ever sees them.
        if !deps_file.raw.workspaces.is_empty() {
            selected_deps = self.aggregate_workspace_dependencies(&deps_file, options, selected_deps)?;
        }

        // --- FastPathCheck ---
        if !options.force {
            let all_skippable = selected_deps
                .iter()
                .all(|dep| skip_oracle::can_skip(dep, &existing_lockfile, &self.project_dir));
            if all_skippable {
                return Ok(InstallSummary {
                    up_to_date: true,
                    skipped_count: selected_deps.len(),
                    installed: Vec::new(),
                    failed: Vec::new(),
                    elapsed_ms: start.elapsed().as_millis() as u64,
                });
            }
        }

        // --- Resolve ---
        let (local_deps, remote_deps): (Vec<_>, Vec<_>) =
            selected_deps.into_iter().partition(|d| d.is_local());

        // --- Execute: preinstall project hook ---
        let trusted = deps_file.raw.trusted_dependencies.clone();
        let lifecycle = LifecycleGate::new(&trusted);
        if !options.ignore_scripts {
            if let Some(cmd) = deps_file.raw.scripts.get("preinstall") {
                if let Err(e) = lifecycle.run_project_hook("preinstall", &self.project_dir, cmd) {
                    checkpoint.rollback().ok();
                    return Err(e);
                }
            }
        }

        // Materialize local/link dependencies sequentially.
        let mut installed = Vec::new();
        let mut failed = Vec::new();
        let materializer =
            crate::local_link::LocalLinkMaterializer::new(&self.config, &self.project_dir, &env_bin_dir);
        for dep in &local_deps {
            match materializer.materialize(dep) {
                Ok(install_dir) => {
                    checkpoint.record_success(&self.project_dir, &dep.name, &install_dir);
                    installed.push(dep.name.clone());
                }
                Err(e) => failed.push((dep.name.clone(), e.to_string())),
            }
        }

        // Dispatch remote dependencies to the Worker Pool.
        let installer = PackageInstaller::new(self.cache, &self.project_dir, options.offline);
        let resolver = &self.resolver;
        let ignore_scripts = options.ignore_scripts;
        let scripts = &deps_file.raw.scripts;

        // Skip Oracle runs per-task, before any network/disk I/O for that
        // dependency (spec.md §4.3): a remote dep already satisfied by the
        // existing lockfile + on-disk state is never handed to a worker at
        // all, it is recorded as installed directly. `--force` bypasses
        // this uniformly, same as the whole-set fast path above.
        let (skippable, pending): (Vec<&Dependency>, Vec<&Dependency>) = remote_deps
            .iter()
            .filter(|dep| options.force || !checkpoint.was_installed(&dep.name))
            .partition(|dep| !options.force && skip_oracle::can_skip(dep, &existing_lockfile, &self.project_dir));

        for dep in &skippable {
            let install_dir = skip_oracle::package_dir(&self.project_dir, &dep.name);
            checkpoint.record_success(&self.project_dir, &dep.name, &install_dir);
            installed.push(dep.name.clone());
        }

        let progress = (!pending.is_empty()).then(|| {
            let bar = indicatif::ProgressBar::new(pending.len() as u64);
            bar.set_style(
                indicatif::ProgressStyle::with_template("{spinner:.green} {pos}/{len} packages installed")
                    .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar()),
            );
            bar
        });

        let task_results = worker_pool::run_parallel(
            &pending,
            |dep: &&Dependency| run_one(dep, resolver, &installer, &lifecycle, ignore_scripts, scripts),
            |done, total| {
                if let Some(bar) = &progress {
                    bar.set_position(done as u64);
                    bar.set_length(total as u64);
                }
            },
        );
        if let Some(bar) = progress {
            bar.finish_and_clear();
        }

        let mut resolved_specs: BTreeMap<String, crate::resolver::PackageSpec> = BTreeMap::new();
        for (dep, result) in pending.iter().zip(task_results.iter()) {
            if result.success {
                if let Ok(spec) = resolver.resolve(dep) {
                    resolved_specs.insert(dep.name.clone(), spec);
                }
                let install_dir = installer.canonical_install_path(
                    resolved_specs.get(&dep.name).expect("just inserted"),
                );
                checkpoint.record_success(&self.project_dir, &dep.name, &install_dir);
                installed.push(dep.name.clone());
            } else {
                failed.push((
                    dep.name.clone(),
                    result.error_message.clone().unwrap_or_default(),
                ));
            }
        }

        // --- Lifecycle: project-level postinstall (non-fatal on failure) ---
        if !options.ignore_scripts {
            if let Some(cmd) = deps_file.raw.scripts.get("postinstall") {
                if let Err(e) = lifecycle.run_project_hook("postinstall", &self.project_dir, cmd) {
                    tracing::warn!("postinstall hook failed: {e}");
                }
            }
        }

        // --- Lockfile ---
        let mut packages = Vec::new();
        for dep in remote_deps.iter().chain(local_deps.iter()) {
            if let Some(spec) = resolved_specs.get(&dep.name) {
                let entry = LockfileEntry {
                    name: spec.name.clone(),
                    version: spec.version.clone(),
                    source: spec.source.to_string(),
                    url: spec.url.clone(),
                    resolved: spec.repo.clone(),
                    integrity: self.cache.integrity(&spec.name, &spec.version),
                    dependencies: BTreeMap::new(),
                };
                packages.push((entry.key(), entry));
            } else if let Some(existing) = existing_lockfile
                .packages
                .get(&crate::utils::hash::lockfile_key(&dep.name, &dep.version_spec))
            {
                packages.push((existing.key(), existing.clone()));
            }
        }
        let new_lockfile = Lockfile::new(packages, now_iso8601());
        new_lockfile.write(&lockfile_path)?;

        // Mirror the project's .bin shims into the per-project hashed
        // environment directory (spec.md §3) so a shell that has `cd`'d
        // into the project sees them via the (out-of-scope) shell hook.
        if let Err(e) = crate::environment::sync_bin_shims(&self.pantry_dir().join(".bin"), &env_bin_dir) {
            tracing::warn!("failed to sync environment bin shims: {e}");
        }

        // --- Cleanup ---
        if failed.is_empty() {
            InstallCheckpoint::clear(&self.project_dir).ok();
        }

        Ok(InstallSummary {
            up_to_date: false,
            skipped_count: 0,
            installed,
            failed,
            elapsed_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Folds every workspace member's dependencies (plus the root's own)
    /// into one aggregated, deduped list, per `spec.md §4.9`:
    /// - members are discovered via the root's `workspaces` globs and
    ///   narrowed by `options.name_filter` if set;
    /// - `catalog:`/`catalog:<name>` refs are resolved against the root's
    ///   `catalog`/`catalogs`; unresolved refs are warned and skipped;
    /// - root-level `overrides` replace matching dependency versions;
    /// - `workspace:*` refs are wired immediately via symlink and excluded
    ///   from the returned set (they are never installed through the
    ///   normal pipeline).
    fn aggregate_workspace_dependencies(
        &self,
        root_deps_file: &DepsFile,
        options: &InstallOptions,
        root_selected: Vec<Dependency>,
    ) -> Result<Vec<Dependency>> {
        let member_filter = match &options.name_filter {
            Some(pattern) => Some(crate::workspace::MemberFilter::parse(pattern)?),
            None => None,
        };

        let members = crate::workspace::discover_members(&self.project_dir, &root_deps_file.raw.workspaces)?;
        let mut aggregated = root_selected;

        for member_dir in &members {
            let published_name = crate::workspace::published_name(member_dir);
            let member_rel = member_dir
                .strip_prefix(&self.project_dir)
                .unwrap_or(member_dir)
                .to_string_lossy()
                .to_string();
            if let Some(filter) = &member_filter {
                if !filter.includes(&published_name, &member_rel) {
                    continue;
                }
            }

            let Some(member_deps_path) = crate::depsfile::DepsFile::find(member_dir) else {
                continue;
            };
            let member_deps_file = crate::depsfile::DepsFile::load(&member_deps_path)?;
            let mut member_deps = self.select_dependencies(&member_deps_file, options);

            for dep in member_deps.iter_mut() {
                if dep.is_workspace_ref() {
                    continue;
                }
                if dep.is_catalog_ref() {
                    match crate::workspace::resolve_catalog_ref(
                        &dep.version_spec,
                        &root_deps_file.raw.catalog,
                        &root_deps_file.raw.catalogs,
                        &dep.name,
                    ) {
                        Some(resolved) => dep.version_spec = resolved.to_string(),
                        None => {
                            tracing::warn!(
                                "unresolved catalog reference `{}` for `{}` in {}; skipping",
                                dep.version_spec,
                                dep.name,
                                member_rel
                            );
                        }
                    }
                }
            }

            crate::workspace::apply_overrides(&mut member_deps, &root_deps_file.raw.overrides);

            for dep in member_deps {
                if dep.is_workspace_ref() {
                    crate::workspace::wire_workspace_member(&self.project_dir, member_dir)?;
                    continue;
                }
                if dep.is_catalog_ref() {
                    // Left unresolved above; already warned.
                    continue;
                }
                aggregated.push(dep);
            }
        }

        Ok(crate::workspace::dedupe_by_name_version(aggregated))
    }

    fn select_dependencies(&self, deps_file: &DepsFile, options: &InstallOptions) -> Vec<Dependency> {
        deps_file
            .dependencies
            .iter()
            .filter(|dep| match options.dependency_filter {
                Some(DependencyFilter::ProductionOnly) => dep.kind == DependencyKind::Normal,
                Some(DependencyFilter::DevOnly) => dep.kind == DependencyKind::Dev,
                Some(DependencyFilter::PeerOnly) => dep.kind == DependencyKind::Peer,
                Some(DependencyFilter::All) | None => true,
            })
            .filter(|dep| match &options.name_filter {
                Some(pattern) => glob::Pattern::new(pattern)
                    .map(|p| p.matches(&dep.name))
                    .unwrap_or(true),
                None => true,
            })
            .cloned()
            .collect()
    }
}

fn run_one(
    dep: &Dependency,
    resolver: &Resolver,
    installer: &PackageInstaller<'_>,
    lifecycle: &LifecycleGate<'_>,
    ignore_scripts: bool,
    scripts: &BTreeMap<String, String>,
) -> InstallTaskResult {
    let name = dep.name.clone();
    let version = dep.version_spec.clone();

    let outcome: Result<()> = (|| {
        let spec = resolver.resolve(dep)?;
        let post_install = if ignore_scripts {
            None
        } else {
            scripts.get("postinstall").map(|s| s.as_str())
        };
        installer.install(&spec, lifecycle, post_install)?;
        Ok(())
    })();

    match outcome {
        Ok(()) => InstallTaskResult {
            name,
            version,
            success: true,
            error_message: None,
            elapsed_ms: 0,
        },
        Err(e) => InstallTaskResult {
            name,
            version,
            success: false,
            error_message: Some(e.to_string()),
            elapsed_ms: 0,
        },
    }
}

fn now_iso8601() -> String {
    chrono::Utc::now().to_rfc3339()
}
