//! Lockfile Store: read, write, and diff `pantry.lock` (`spec.md §4.2`).

use crate::core::error::PantryError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const LOCKFILE_NAME: &str = "pantry.lock";
pub const SCHEMA_VERSION: u32 = 1;
pub const LOCKFILE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockfileEntry {
    pub name: String,
    pub version: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integrity: Option<String>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

impl LockfileEntry {
    pub fn key(&self) -> String {
        crate::utils::hash::lockfile_key(&self.name, &self.version)
    }
}

/// On-disk lockfile shape (`spec.md §3`, `§6`). Top-level keys are declared
/// in this exact order so `serde_json`'s struct serialization emits them in
/// the fixed order the external contract requires: `version`,
/// `lockfileVersion`, `generatedAt`, `packages`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lockfile {
    pub version: u32,
    #[serde(rename = "lockfileVersion")]
    pub lockfile_version: u32,
    #[serde(rename = "generatedAt")]
    pub generated_at: String,
    /// Insertion-ordered: packages are emitted in the project's dependency
    /// declaration order (`spec.md §5`), so this is a `Vec` of `(key,
    /// entry)` pairs serialized as a JSON object, not a sorted map.
    pub packages: IndexedPackages,
}

/// A small insertion-order-preserving map, serialized as a plain JSON
/// object. `serde_json`'s `Map` preserves insertion order when the
/// `preserve_order` feature isn't needed here because we build the object
/// manually via `serde_json::Map`.
#[derive(Debug, Clone, Default)]
pub struct IndexedPackages(pub Vec<(String, LockfileEntry)>);

impl Serialize for IndexedPackages {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for IndexedPackages {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // serde_json's default Map is a BTreeMap unless `preserve_order` is
        // enabled; we read through `serde_json::Value` instead so we can
        // control ordering explicitly where it matters (it doesn't for
        // reads, only for writes).
        let map: BTreeMap<String, LockfileEntry> = BTreeMap::deserialize(deserializer)?;
        Ok(IndexedPackages(map.into_iter().collect()))
    }
}

impl IndexedPackages {
    pub fn get(&self, key: &str) -> Option<&LockfileEntry> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Lockfile {
    pub fn new(packages: Vec<(String, LockfileEntry)>, generated_at: String) -> Self {
        Self {
            version: SCHEMA_VERSION,
            lockfile_version: LOCKFILE_VERSION,
            generated_at,
            packages: IndexedPackages(packages),
        }
    }

    pub fn empty(generated_at: String) -> Self {
        Self::new(Vec::new(), generated_at)
    }

    /// Reads and parses a lockfile from `path`. Returns `Ok(None)` if the
    /// file doesn't exist.
    pub fn read(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read lockfile: {}", path.display()))?;
        let lockfile: Lockfile = serde_json::from_str(&text).map_err(|e| PantryError::LockfileMalformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Some(lockfile))
    }

    /// Serializes to the stable, pretty-printed shape: 2-space indent, LF
    /// newlines, trailing newline, no trailing commas (`spec.md §6`).
    pub fn to_json_string(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"  ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        serde::Serialize::serialize(self, &mut ser).context("failed to serialize lockfile")?;
        let mut text = String::from_utf8(buf).context("lockfile serialization was not valid UTF-8")?;
        text = text.replace("\r\n", "\n");
        if !text.ends_with('\n') {
            text.push('\n');
        }
        Ok(text)
    }

    /// Conditional write per `spec.md §4.2`: if an equivalent lockfile
    /// already exists at `path`, leave it untouched (preserving mtime);
    /// otherwise write atomically. Returns whether a write actually
    /// happened.
    pub fn write(&self, path: &Path) -> Result<bool> {
        if let Some(existing) = Self::read(path)? {
            if equivalent(self, &existing) {
                return Ok(false);
            }
        }
        let text = self.to_json_string()?;
        crate::utils::fs::safe_write(path, &text)?;
        Ok(true)
    }
}

/// Lockfile equivalence: ignores `generated_at`; compares schema fields,
/// package count, and every entry's name/version/source/url/resolved/
/// integrity/dependencies (`spec.md §4.2`).
pub fn equivalent(a: &Lockfile, b: &Lockfile) -> bool {
    if a.version != b.version || a.lockfile_version != b.lockfile_version {
        return false;
    }
    if a.packages.len() != b.packages.len() {
        return false;
    }
    for (key, entry_a) in &a.packages.0 {
        match b.packages.get(key) {
            Some(entry_b) if entry_a == entry_b => continue,
            _ => return false,
        }
    }
    true
}
