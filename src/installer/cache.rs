//! The Package Download Cache: an external collaborator per `spec.md §1`
//! ("tarball extraction", "on-disk cache storage for downloaded archives").
//! This module defines the narrow interface the installer consumes
//! (`fetch`) plus one small default implementation so the binary has
//! something to run against end to end.

use crate::core::error::PantryError;
use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Given a resolved artifact location, returns a local, already-extracted
/// directory the installer can copy/link from. Implementations are
/// responsible for their own at-most-one-concurrent-fetch guarantee per
/// `(name, version)` (`spec.md §5`).
pub trait PackageCache: Send + Sync {
    fn fetch(&self, name: &str, version: &str, url: &str) -> Result<PathBuf>;

    /// Offline-mode lookup: succeeds only if the artifact is already
    /// present locally (`spec.md §4.4` offline branch).
    fn fetch_offline(&self, name: &str, version: &str) -> Result<Option<PathBuf>>;

    /// The content hash recorded for this artifact's downloaded archive,
    /// if any, surfaced in the lockfile's `integrity` field
    /// (`spec.md §3`). Caches that don't compute one return `None`.
    fn integrity(&self, _name: &str, _version: &str) -> Option<String> {
        None
    }
}

/// Content-addressed cache rooted at `cache_dir`. Keys artifacts by
/// `<name>/<version>` and extracts `.tar.gz` archives on first fetch.
pub struct HttpPackageCache {
    cache_dir: PathBuf,
    client: reqwest::blocking::Client,
}

impl HttpPackageCache {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            client: reqwest::blocking::Client::new(),
        }
    }

    fn extracted_dir(&self, name: &str, version: &str) -> PathBuf {
        self.cache_dir.join(sanitize(name)).join(sanitize(version))
    }

    fn integrity_path(&self, name: &str, version: &str) -> PathBuf {
        self.cache_dir
            .join(sanitize(name))
            .join(format!("{}.sha256", sanitize(version)))
    }
}

fn sanitize(segment: &str) -> String {
    segment.replace(['/', '\\'], "_")
}

impl PackageCache for HttpPackageCache {
    fn fetch(&self, name: &str, version: &str, url: &str) -> Result<PathBuf> {
        let dest = self.extracted_dir(name, version);
        if dest.is_dir() {
            return Ok(dest);
        }

        let mut resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| PantryError::NetworkError {
                what: url.to_string(),
                source: e.into(),
            })?
            .error_for_status()
            .map_err(|e| PantryError::NetworkError {
                what: url.to_string(),
                source: e.into(),
            })?;

        let mut bytes = Vec::new();
        resp.read_to_end(&mut bytes)
            .with_context(|| format!("failed to read response body for {url}"))?;

        let digest = format!("sha256-{:x}", Sha256::digest(&bytes));
        let integrity_path = self.integrity_path(name, version);
        if let Some(parent) = integrity_path.parent() {
            crate::utils::fs::ensure_dir(parent)?;
        }
        crate::utils::fs::safe_write(&integrity_path, &digest)?;

        let staging = self.cache_dir.join(format!(".staging-{}", uuid::Uuid::new_v4()));
        crate::utils::fs::ensure_dir(&staging)?;
        extract_tar_gz(&bytes, &staging).map_err(|e| PantryError::ExtractionError {
            name: name.to_string(),
            reason: e.to_string(),
        })?;

        if let Some(parent) = dest.parent() {
            crate::utils::fs::ensure_dir(parent)?;
        }
        std::fs::rename(&staging, &dest)
            .with_context(|| format!("failed to move extracted archive into cache: {}", dest.display()))?;

        Ok(dest)
    }

    fn fetch_offline(&self, name: &str, version: &str) -> Result<Option<PathBuf>> {
        let dest = self.extracted_dir(name, version);
        Ok(if dest.is_dir() { Some(dest) } else { None })
    }

    fn integrity(&self, name: &str, version: &str) -> Option<String> {
        std::fs::read_to_string(self.integrity_path(name, version)).ok()
    }
}

fn extract_tar_gz(bytes: &[u8], dest: &Path) -> Result<()> {
    let decoder = flate2::read::GzDecoder::new(bytes);
    let mut archive = tar::Archive::new(decoder);
    archive
        .unpack(dest)
        .context("failed to unpack tar.gz archive")?;
    Ok(())
}
