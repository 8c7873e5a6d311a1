//! Turns a declared [`Dependency`] into a concrete, installable
//! [`PackageSpec`] (`spec.md §4.1`).

pub mod constraints;
pub mod registry;

use crate::core::error::PantryError;
use crate::depsfile::{Dependency, SourceHint};
use anyhow::Result;
use dashmap::DashMap;
use registry::{BuiltinRegistry, NpmRegistryClient, PantryS3Registry};
use std::sync::{Arc, OnceLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageSource {
    BuiltinRegistry,
    Npm,
    PantryS3,
    Github,
    Http,
    Ziglang,
    Local,
}

impl PackageSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BuiltinRegistry => "builtin_registry",
            Self::Npm => "npm",
            Self::PantryS3 => "pantry_s3",
            Self::Github => "github",
            Self::Http => "http",
            Self::Ziglang => "ziglang",
            Self::Local => "local",
        }
    }
}

/// A resolved, installable package (`spec.md §3`).
#[derive(Debug, Clone, PartialEq)]
pub struct PackageSpec {
    pub name: String,
    pub version: String,
    pub source: PackageSourceKey,
    pub url: Option<String>,
    pub repo: Option<String>,
}

/// `PackageSource` without the non-`PartialEq` registry trait objects, kept
/// separate so `PackageSpec` can derive equality for the dedup law in
/// `spec.md §8` ("resolving a dep twice in one run returns byte-identical
/// PackageSpec").
pub type PackageSourceKey = &'static str;

fn validate_tarball_url(url: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(PantryError::InvalidTarballScheme {
            url: url.to_string(),
        }
        .into())
    }
}

/// A zig/ziglang dev-build version spec looks like a date-stamped nightly,
/// e.g. `0.14.0-dev.1234+abcdef`. We only need to recognize the shape, not
/// parse it precisely.
fn is_ziglang_dev_build(name: &str, version_spec: &str) -> bool {
    (name == "zig" || name == "ziglang") && version_spec.contains("-dev.")
}

pub struct Resolver {
    builtin: Arc<dyn BuiltinRegistry>,
    pantry_s3: Arc<dyn PantryS3Registry>,
    npm: NpmRegistryClient,
    /// In-flight resolution registry keyed by `name@version-spec`
    /// (`spec.md §3`, §9): concurrent requests for the same key share one
    /// result instead of racing each other. Each key maps to a single
    /// `OnceLock` so the *first* caller actually resolves while every other
    /// concurrent caller for that key blocks on `get_or_init` until it's
    /// done, rather than each racing a redundant resolution.
    in_flight: DashMap<String, Arc<OnceLock<std::result::Result<PackageSpec, String>>>>,
}

impl Resolver {
    pub fn new(builtin: Arc<dyn BuiltinRegistry>, pantry_s3: Arc<dyn PantryS3Registry>) -> Self {
        Self {
            builtin,
            pantry_s3,
            npm: NpmRegistryClient::new(),
            in_flight: DashMap::new(),
        }
    }

    /// Resolves one dependency. The first caller for a given `name@spec`
    /// key actually runs [`Self::resolve_uncached`]; any concurrent callers
    /// for the same key block on that one resolution and share its result
    /// (`spec.md §3`, §9), instead of each performing its own redundant
    /// network round-trip.
    pub fn resolve(&self, dep: &Dependency) -> Result<PackageSpec> {
        let key = crate::utils::hash::lockfile_key(&dep.name, &dep.version_spec);
        let cell = self
            .in_flight
            .entry(key)
            .or_insert_with(|| Arc::new(OnceLock::new()))
            .clone();

        cell.get_or_init(|| self.resolve_uncached(dep).map_err(|e| e.to_string()))
            .clone()
            .map_err(|e| anyhow::anyhow!(e))
    }

    fn resolve_uncached(&self, dep: &Dependency) -> Result<PackageSpec> {
        if dep.is_local() {
            return Ok(PackageSpec {
                name: dep.name.clone(),
                version: dep.version_spec.clone(),
                source: PackageSource::Local.as_str(),
                url: None,
                repo: None,
            });
        }

        if dep.source_hint == SourceHint::Github {
            if let Some(gh) = &dep.github_ref {
                let repo = format!("{}/{}", gh.owner, gh.repo);
                return Ok(PackageSpec {
                    name: dep.name.clone(),
                    version: gh.reference.clone(),
                    source: PackageSource::Github.as_str(),
                    url: None,
                    repo: Some(repo),
                });
            }
        }

        if dep.source_hint == SourceHint::Url {
            validate_tarball_url(&dep.version_spec)?;
            return Ok(PackageSpec {
                name: dep.name.clone(),
                version: dep.version_spec.clone(),
                source: PackageSource::Http.as_str(),
                url: Some(dep.version_spec.clone()),
                repo: None,
            });
        }

        // Decision order per spec.md §4.1.
        if is_ziglang_dev_build(&dep.name, &dep.version_spec) {
            return Ok(PackageSpec {
                name: dep.name.clone(),
                version: dep.version_spec.clone(),
                source: PackageSource::Ziglang.as_str(),
                url: None,
                repo: None,
            });
        }

        if let Some(version) = self.builtin.version_for(&dep.name) {
            return Ok(PackageSpec {
                name: dep.name.clone(),
                version,
                source: PackageSource::BuiltinRegistry.as_str(),
                url: None,
                repo: None,
            });
        }

        if let Some(entry) = self.pantry_s3.lookup(&dep.name)? {
            validate_tarball_url(&entry.tarball_url)?;
            return Ok(PackageSpec {
                name: dep.name.clone(),
                version: entry.version,
                source: PackageSource::PantryS3.as_str(),
                url: Some(entry.tarball_url),
                repo: None,
            });
        }

        match self.npm.resolve(&dep.name, &dep.version_spec) {
            Ok((version, tarball_url)) => {
                validate_tarball_url(&tarball_url)?;
                Ok(PackageSpec {
                    name: dep.name.clone(),
                    version,
                    source: PackageSource::Npm.as_str(),
                    url: Some(tarball_url),
                    repo: None,
                })
            }
            Err(_) => Err(PantryError::PackageNotFound {
                name: dep.name.clone(),
                version_spec: dep.version_spec.clone(),
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depsfile::DependencyKind;
    use registry::{EmptyPantryS3Registry, StaticBuiltinRegistry};

    fn resolver() -> Resolver {
        Resolver::new(Arc::new(StaticBuiltinRegistry), Arc::new(EmptyPantryS3Registry))
    }

    #[test]
    fn resolves_builtin_package_without_network() {
        let r = resolver();
        let dep = Dependency::parse("npm", "latest", DependencyKind::Normal).unwrap();
        let spec = r.resolve(&dep).unwrap();
        assert_eq!(spec.source, "builtin_registry");
    }

    #[test]
    fn resolves_local_dependency_without_network() {
        let r = resolver();
        let dep = Dependency::parse("mylib", "../mylib", DependencyKind::Normal).unwrap();
        let spec = r.resolve(&dep).unwrap();
        assert_eq!(spec.source, "local");
    }

    #[test]
    fn rejects_file_scheme_tarball_url() {
        assert!(validate_tarball_url("file:///etc/passwd").is_err());
        assert!(validate_tarball_url("https://example.com/pkg.tgz").is_ok());
    }

    #[test]
    fn dedup_returns_identical_spec_for_same_key() {
        let r = resolver();
        let dep = Dependency::parse("npm", "latest", DependencyKind::Normal).unwrap();
        let first = r.resolve(&dep).unwrap();
        let second = r.resolve(&dep).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn concurrent_resolutions_for_the_same_key_only_resolve_once() {
        struct CountingRegistry(std::sync::Arc<std::sync::atomic::AtomicUsize>);
        impl BuiltinRegistry for CountingRegistry {
            fn version_for(&self, name: &str) -> Option<String> {
                self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                std::thread::sleep(std::time::Duration::from_millis(20));
                (name == "widget").then(|| "1.0.0".to_string())
            }
        }

        let calls = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let resolver = Arc::new(Resolver::new(
            Arc::new(CountingRegistry(calls.clone())),
            Arc::new(EmptyPantryS3Registry),
        ));

        let dep = Dependency::parse("widget", "1.0.0", DependencyKind::Normal).unwrap();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let resolver = resolver.clone();
                let dep = dep.clone();
                std::thread::spawn(move || resolver.resolve(&dep).unwrap())
            })
            .collect();

        let results: Vec<PackageSpec> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for spec in &results {
            assert_eq!(spec.version, "1.0.0");
        }
        assert_eq!(
            calls.load(std::sync::atomic::Ordering::SeqCst),
            1,
            "only the first concurrent caller should actually resolve"
        );
    }

    #[test]
    fn recognizes_ziglang_dev_build() {
        assert!(is_ziglang_dev_build("zig", "0.14.0-dev.1234+abcdef"));
        assert!(!is_ziglang_dev_build("zig", "0.13.0"));
    }
}
