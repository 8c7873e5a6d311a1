//! Package Installer: materializes one resolved [`PackageSpec`] into the
//! project environment (`spec.md §4.4`).

pub mod bin_discovery;
pub mod cache;

use crate::core::error::PantryError;
use crate::lifecycle::LifecycleGate;
use crate::resolver::PackageSpec;
use anyhow::{Context, Result};
use cache::PackageCache;
use std::path::{Path, PathBuf};

pub struct InstallOutcome {
    pub installed_version: String,
    pub install_path: PathBuf,
}

pub struct PackageInstaller<'a> {
    pub cache: &'a dyn PackageCache,
    pub project_dir: &'a Path,
    pub offline: bool,
}

impl<'a> PackageInstaller<'a> {
    pub fn new(cache: &'a dyn PackageCache, project_dir: &'a Path, offline: bool) -> Self {
        Self {
            cache,
            project_dir,
            offline,
        }
    }

    fn pantry_dir(&self) -> PathBuf {
        self.project_dir.join("pantry")
    }

    fn bin_dir(&self) -> PathBuf {
        self.pantry_dir().join(".bin")
    }

    /// The canonical install path for a spec, source-dependent per
    /// `spec.md §4.4` step 2a.
    pub fn canonical_install_path(&self, spec: &PackageSpec) -> PathBuf {
        match (spec.source, &spec.repo) {
            ("github", Some(repo)) => self
                .pantry_dir()
                .join("github.com")
                .join(repo)
                .join(&spec.version),
            _ => self.pantry_dir().join(&spec.name),
        }
    }

    /// Runs the full per-package pipeline: offline or normal fetch,
    /// extract (handled by the cache), bin discovery/linking, and the
    /// gated post-install script.
    pub fn install(
        &self,
        spec: &PackageSpec,
        lifecycle: &LifecycleGate<'_>,
        post_install_script: Option<&str>,
    ) -> Result<InstallOutcome> {
        let install_path = self.canonical_install_path(spec);

        let source_dir = if self.offline {
            self.cache
                .fetch_offline(&spec.name, &spec.version)?
                .ok_or_else(|| PantryError::OfflineCacheMiss {
                    name: spec.name.clone(),
                    version: spec.version.clone(),
                })?
        } else {
            let url = spec
                .url
                .as_deref()
                .ok_or_else(|| PantryError::NoTarballUrl {
                    name: spec.name.clone(),
                })?;
            self.cache.fetch(&spec.name, &spec.version, url)?
        };

        copy_tree(&source_dir, &install_path)
            .with_context(|| format!("failed to materialize {} into place", install_path.display()))?;

        let bin_dir = self.bin_dir();
        crate::utils::fs::ensure_dir(&bin_dir)?;
        bin_discovery::link_executables(&install_path, &bin_dir)?;

        if let Some(script) = post_install_script {
            lifecycle.run_package_script(&spec.name, &install_path, script)?;
        }

        Ok(InstallOutcome {
            installed_version: spec.version.clone(),
            install_path,
        })
    }
}

/// Recursively copies `src` into `dst`, creating `dst` if needed. The
/// Package Download Cache returns a shared, read-only extracted directory;
/// the installer copies rather than moves so the cache entry can be reused
/// by later installs of the same version.
fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    crate::utils::fs::ensure_dir(dst)?;
    for entry in walkdir::WalkDir::new(src).min_depth(1) {
        let entry = entry?;
        let rel = entry.path().strip_prefix(src).unwrap();
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            crate::utils::fs::ensure_dir(&target)?;
        } else if entry.file_type().is_symlink() {
            let link_target = std::fs::read_link(entry.path())?;
            crate::utils::fs::atomic_symlink(&link_target, &target)?;
        } else {
            if let Some(parent) = target.parent() {
                crate::utils::fs::ensure_dir(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::PackageSource;
    use std::sync::Mutex;
    use tempfile::tempdir;

    struct FakeCache {
        extracted: PathBuf,
        calls: Mutex<u32>,
    }

    impl PackageCache for FakeCache {
        fn fetch(&self, _name: &str, _version: &str, _url: &str) -> Result<PathBuf> {
            *self.calls.lock().unwrap() += 1;
            Ok(self.extracted.clone())
        }

        fn fetch_offline(&self, _name: &str, _version: &str) -> Result<Option<PathBuf>> {
            Ok(Some(self.extracted.clone()))
        }
    }

    #[test]
    fn install_copies_fetched_tree_and_links_bin() {
        let cache_dir = tempdir().unwrap();
        let extracted = cache_dir.path().join("extracted");
        std::fs::create_dir_all(extracted.join("bin")).unwrap();
        std::fs::write(extracted.join("bin").join("mytool"), "x").unwrap();

        let project_dir = tempdir().unwrap();
        let cache = FakeCache {
            extracted,
            calls: Mutex::new(0),
        };
        let installer = PackageInstaller::new(&cache, project_dir.path(), false);
        let trusted = vec![];
        let gate = LifecycleGate::new(&trusted);

        let spec = PackageSpec {
            name: "mytool".into(),
            version: "1.0.0".into(),
            source: PackageSource::Npm.as_str(),
            url: Some("https://example.com/mytool-1.0.0.tgz".into()),
            repo: None,
        };

        let outcome = installer.install(&spec, &gate, None).unwrap();
        assert!(outcome.install_path.join("bin").join("mytool").exists());
        assert!(project_dir.path().join("pantry").join(".bin").join("mytool").exists());
    }

    #[test]
    fn offline_install_uses_cache_without_url() {
        let cache_dir = tempdir().unwrap();
        let extracted = cache_dir.path().join("extracted");
        std::fs::create_dir_all(&extracted).unwrap();

        let project_dir = tempdir().unwrap();
        let cache = FakeCache {
            extracted,
            calls: Mutex::new(0),
        };
        let installer = PackageInstaller::new(&cache, project_dir.path(), true);
        let trusted = vec![];
        let gate = LifecycleGate::new(&trusted);

        let spec = PackageSpec {
            name: "mytool".into(),
            version: "1.0.0".into(),
            source: PackageSource::Npm.as_str(),
            url: None,
            repo: None,
        };

        let outcome = installer.install(&spec, &gate, None).unwrap();
        assert_eq!(outcome.installed_version, "1.0.0");
    }
}
