//! Local/Link Materializer: wires filesystem-path dependencies via
//! symlinks (`spec.md §4.8`).

use crate::config::PantryConfig;
use crate::core::error::PantryError;
use crate::depsfile::Dependency;
use crate::utils::fs::atomic_symlink;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub struct LocalLinkMaterializer<'a> {
    pub config: &'a PantryConfig,
    pub project_dir: &'a Path,
    /// The per-project hashed environment directory's `bin/` (`spec.md
    /// §3`), the target of step 3's convenience link -- not the project's
    /// own `pantry/.bin`.
    pub env_bin_dir: &'a Path,
}

impl<'a> LocalLinkMaterializer<'a> {
    pub fn new(config: &'a PantryConfig, project_dir: &'a Path, env_bin_dir: &'a Path) -> Self {
        Self {
            config,
            project_dir,
            env_bin_dir,
        }
    }

    fn pantry_dir(&self) -> PathBuf {
        self.project_dir.join("pantry")
    }

    fn bin_dir(&self) -> PathBuf {
        self.pantry_dir().join(".bin")
    }

    /// Resolves a dependency's `version_spec` (a `link:<name>` reference or
    /// a literal filesystem path) to the real target directory.
    fn resolve_local_path(&self, dep: &Dependency) -> Result<PathBuf> {
        if let Some(link_name) = dep.link_name() {
            let target = self.config.link_target(link_name);
            let resolved = std::fs::read_link(&target).with_context(|| {
                format!("failed to read registered link: {}", target.display())
            })?;
            return Ok(resolved);
        }

        let expanded = shellexpand::tilde(&dep.version_spec).into_owned();
        Ok(PathBuf::from(expanded))
    }

    /// Materializes one local/link dependency, per the four steps in
    /// `spec.md §4.8`. Runs sequentially -- the spec calls this
    /// microsecond-scale and not worth a thread pool.
    pub fn materialize(&self, dep: &Dependency) -> Result<PathBuf> {
        let local_path = self.resolve_local_path(dep)?;
        if !local_path.exists() {
            if dep.link_name().is_some() {
                return Err(PantryError::LinkNotFound(dep.link_name().unwrap().to_string()).into());
            }
            return Err(PantryError::LocalPathMissing {
                name: dep.name.clone(),
                path: local_path,
            }
            .into());
        }

        let pkg_dir = self.pantry_dir().join(&dep.name);
        crate::utils::fs::ensure_dir(&pkg_dir)?;

        // Step 2: <project>/pantry/<pkg>/src -> <local_path>/src, tolerating
        // a missing src/ directory as a warning (open question resolution,
        // recorded in DESIGN.md).
        let src_target = local_path.join("src");
        if src_target.exists() {
            atomic_symlink(&src_target, &pkg_dir.join("src"))?;
        } else {
            tracing::warn!(
                "local dependency `{}` has no src/ directory at {}; skipping src link",
                dep.name,
                local_path.display()
            );
        }

        // Step 3: <env-bin-dir>/<pkg_name> -> <local_path>, for convenience.
        crate::utils::fs::ensure_dir(self.env_bin_dir)?;
        atomic_symlink(&local_path, &self.env_bin_dir.join(&dep.name))?;

        // Step 4: link any executables under zig-out/bin (or analogous)
        // into <project>/pantry/.bin.
        let bin_dir = self.bin_dir();
        for candidate in ["zig-out/bin", "bin"] {
            let exe_dir = local_path.join(candidate);
            if exe_dir.is_dir() {
                crate::utils::fs::ensure_dir(&bin_dir)?;
                for entry in std::fs::read_dir(&exe_dir)? {
                    let entry = entry?;
                    if let Some(name) = entry.file_name().to_str() {
                        atomic_symlink(&entry.path(), &bin_dir.join(name))?;
                    }
                }
            }
        }

        Ok(pkg_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depsfile::DependencyKind;
    use tempfile::tempdir;

    fn config_for(dir: &Path) -> PantryConfig {
        PantryConfig {
            cache_dir: dir.join("cache"),
            envs_dir: dir.join("envs"),
            links_dir: dir.join("links"),
            offline: false,
        }
    }

    #[test]
    fn materializes_path_dependency_with_src_and_bin() {
        let project = tempdir().unwrap();
        let lib = tempdir().unwrap();
        std::fs::create_dir_all(lib.path().join("src")).unwrap();
        std::fs::create_dir_all(lib.path().join("zig-out").join("bin")).unwrap();
        std::fs::write(lib.path().join("zig-out").join("bin").join("mytool"), "x").unwrap();

        let config = config_for(project.path());
        let env_bin_dir = project.path().join("env-bin");
        let materializer = LocalLinkMaterializer::new(&config, project.path(), &env_bin_dir);
        let dep = Dependency::parse("mylib", &lib.path().display().to_string(), DependencyKind::Normal).unwrap();

        let pkg_dir = materializer.materialize(&dep).unwrap();
        assert!(pkg_dir.join("src").exists());
        assert!(project.path().join("pantry").join(".bin").join("mytool").exists());
        assert!(env_bin_dir.join("mylib").exists(), "step 3 convenience link must land in the env bin dir");
    }

    #[test]
    fn missing_src_is_a_warning_not_a_failure() {
        let project = tempdir().unwrap();
        let lib = tempdir().unwrap();
        // no src/ directory created

        let config = config_for(project.path());
        let env_bin_dir = project.path().join("env-bin");
        let materializer = LocalLinkMaterializer::new(&config, project.path(), &env_bin_dir);
        let dep = Dependency::parse("mylib", &lib.path().display().to_string(), DependencyKind::Normal).unwrap();

        let result = materializer.materialize(&dep);
        assert!(result.is_ok());
    }

    #[test]
    fn missing_local_path_is_an_error() {
        let project = tempdir().unwrap();
        let config = config_for(project.path());
        let env_bin_dir = project.path().join("env-bin");
        let materializer = LocalLinkMaterializer::new(&config, project.path(), &env_bin_dir);
        let dep = Dependency::parse("mylib", "/definitely/does/not/exist", DependencyKind::Normal).unwrap();

        assert!(materializer.materialize(&dep).is_err());
    }

    #[test]
    fn unregistered_link_is_an_error() {
        let project = tempdir().unwrap();
        let config = config_for(project.path());
        let env_bin_dir = project.path().join("env-bin");
        let materializer = LocalLinkMaterializer::new(&config, project.path(), &env_bin_dir);
        let dep = Dependency::parse("mylib", "link:mylib", DependencyKind::Normal).unwrap();

        let err = materializer.materialize(&dep).unwrap_err();
        assert!(err.to_string().contains("mylib"));
    }

    #[test]
    fn convenience_link_uses_bare_package_name_with_no_suffix() {
        let project = tempdir().unwrap();
        let lib = tempdir().unwrap();
        std::fs::create_dir_all(lib.path().join("src")).unwrap();

        let config = config_for(project.path());
        let env_bin_dir = project.path().join("env-bin");
        let materializer = LocalLinkMaterializer::new(&config, project.path(), &env_bin_dir);
        let dep = Dependency::parse("mylib", &lib.path().display().to_string(), DependencyKind::Normal).unwrap();

        materializer.materialize(&dep).unwrap();
        assert!(env_bin_dir.join("mylib").exists());
        assert!(!env_bin_dir.join("mylib-src").exists());
    }
}
