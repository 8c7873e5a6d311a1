//! Registry lookups consulted by the Resolver in decision order
//! (`spec.md §4.1`): the built-in registry, the Pantry S3 registry, and
//! npm. The first two are genuinely external collaborators (`spec.md §1`
//! names "the built-in package registry data" out of scope); this module
//! defines them as traits with a small illustrative default so the
//! Resolver has something to run against end to end.

use crate::core::error::PantryError;
use anyhow::{Context, Result};
use serde::Deserialize;

/// The built-in registry: well-known packages resolved without any network
/// call. Real deployments supply their own table; this one is intentionally
/// small.
pub trait BuiltinRegistry: Send + Sync {
    fn version_for(&self, name: &str) -> Option<String>;
}

pub struct StaticBuiltinRegistry;

impl BuiltinRegistry for StaticBuiltinRegistry {
    fn version_for(&self, name: &str) -> Option<String> {
        match name {
            "npm" => Some("10.8.2".to_string()),
            "corepack" => Some("0.29.4".to_string()),
            _ => None,
        }
    }
}

/// One entry returned from the Pantry S3 registry: a resolved version and
/// its tarball URL.
#[derive(Debug, Clone, Deserialize)]
pub struct PantryS3Entry {
    pub version: String,
    pub tarball_url: String,
}

/// `https://pantry-registry.s3.<region>.amazonaws.com/<s3-path>`
/// (`spec.md §6`), a K/V lookup keyed by package name.
pub trait PantryS3Registry: Send + Sync {
    fn lookup(&self, name: &str) -> Result<Option<PantryS3Entry>>;
}

/// An implementation that never finds anything, used when no S3 endpoint is
/// configured; the Resolver falls through to npm.
pub struct EmptyPantryS3Registry;

impl PantryS3Registry for EmptyPantryS3Registry {
    fn lookup(&self, _name: &str) -> Result<Option<PantryS3Entry>> {
        Ok(None)
    }
}

#[derive(Debug, Deserialize)]
struct NpmPackageDoc {
    #[serde(rename = "dist-tags")]
    dist_tags: std::collections::BTreeMap<String, String>,
    versions: std::collections::BTreeMap<String, NpmVersionDoc>,
}

#[derive(Debug, Deserialize)]
struct NpmVersionDoc {
    dist: Option<NpmDist>,
}

#[derive(Debug, Deserialize)]
struct NpmDist {
    tarball: Option<String>,
}

/// A minimal blocking npm registry client, used only after the built-in
/// and Pantry S3 registries miss (`spec.md §4.1` step 4).
pub struct NpmRegistryClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl NpmRegistryClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            base_url: "https://registry.npmjs.org".to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Resolves `name` against `version_spec` ("latest" or a constraint
    /// string) and returns `(version, tarball_url)`.
    pub fn resolve(&self, name: &str, version_spec: &str) -> Result<(String, String)> {
        let url = format!("{}/{}", self.base_url, name);
        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| PantryError::NetworkError {
                what: url.clone(),
                source: e.into(),
            })?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(PantryError::PackageNotFound {
                name: name.to_string(),
                version_spec: version_spec.to_string(),
            }
            .into());
        }
        let doc: NpmPackageDoc = resp
            .error_for_status()
            .map_err(|e| PantryError::NetworkError {
                what: url.clone(),
                source: e.into(),
            })?
            .json()
            .context("failed to parse npm registry response")?;

        let version = if version_spec == "latest" {
            doc.dist_tags
                .get("latest")
                .cloned()
                .ok_or_else(|| PantryError::PackageNotFound {
                    name: name.to_string(),
                    version_spec: version_spec.to_string(),
                })?
        } else {
            let constraint = crate::resolver::constraints::Constraint::parse(version_spec);
            constraint
                .best_match(doc.versions.keys().map(|s| s.as_str()))
                .map(|s| s.to_string())
                .ok_or_else(|| PantryError::PackageNotFound {
                    name: name.to_string(),
                    version_spec: version_spec.to_string(),
                })?
        };

        let tarball = doc
            .versions
            .get(&version)
            .and_then(|v| v.dist.as_ref())
            .and_then(|d| d.tarball.clone())
            .ok_or_else(|| PantryError::NoTarballUrl {
                name: name.to_string(),
            })?;

        Ok((version, tarball))
    }
}

impl Default for NpmRegistryClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_builtin_registry_knows_npm() {
        let reg = StaticBuiltinRegistry;
        assert!(reg.version_for("npm").is_some());
        assert!(reg.version_for("totally-unknown-pkg").is_none());
    }

    #[test]
    fn empty_s3_registry_always_misses() {
        let reg = EmptyPantryS3Registry;
        assert!(reg.lookup("anything").unwrap().is_none());
    }

    #[test]
    fn npm_registry_client_resolve_surfaces_network_error_for_unreachable_base_url() {
        let client = NpmRegistryClient::with_base_url("http://127.0.0.1:1");
        let err = client.resolve("left-pad", "latest").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PantryError>(),
            Some(PantryError::NetworkError { .. })
        ));
    }
}
