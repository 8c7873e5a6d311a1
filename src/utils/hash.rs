//! Hashing helpers for the environment directory layout (`spec.md §3`) and
//! the Skip Oracle's fast-path key assembly (`spec.md §4.3`).

use md5::{Digest, Md5};
use std::fmt::Write as _;
use std::path::Path;

/// First 4 bytes of MD5(canonical project path), lowercase hex.
pub fn proj_hash(project_dir: &Path) -> String {
    let canonical = project_dir
        .canonicalize()
        .unwrap_or_else(|_| project_dir.to_path_buf());
    let digest = Md5::digest(canonical.to_string_lossy().as_bytes());
    hex::encode(&digest[..4])
}

/// First 8 hex chars of MD5(deps-file path, or project dir if config-only),
/// prefixed with `d`.
pub fn deps_hash(deps_path_or_dir: &Path) -> String {
    let digest = Md5::digest(deps_path_or_dir.to_string_lossy().as_bytes());
    let hex = hex::encode(digest);
    format!("d{}", &hex[..8])
}

/// Number of bytes the Skip Oracle's key assembly keeps on the stack before
/// falling back to a heap-allocated `String` (`spec.md §4.3`, `§8`).
pub const STACK_BUFFER_SIZE: usize = 512;

/// Fixed-size stack buffer implementing [`std::fmt::Write`]; used to build
/// the Skip Oracle's lockfile key and candidate path without a heap
/// allocation in the common case. Writes that would overflow the buffer
/// make [`StackPath::overflowed`] return `true`; callers fall back to a
/// heap-allocated `String` built the normal way.
pub struct StackPath {
    buf: [u8; STACK_BUFFER_SIZE],
    len: usize,
    overflowed: bool,
}

impl StackPath {
    pub fn new() -> Self {
        Self {
            buf: [0u8; STACK_BUFFER_SIZE],
            len: 0,
            overflowed: false,
        }
    }

    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    pub fn as_str(&self) -> &str {
        // Safe: we only ever push valid UTF-8 byte sequences from `write_str`.
        std::str::from_utf8(&self.buf[..self.len]).unwrap_or("")
    }
}

impl Default for StackPath {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Write for StackPath {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        let bytes = s.as_bytes();
        if self.len + bytes.len() > self.buf.len() {
            self.overflowed = true;
            return Err(std::fmt::Error);
        }
        self.buf[self.len..self.len + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
        Ok(())
    }
}

/// Builds the `"{name}@{version_spec}"` lockfile lookup key, using the
/// stack buffer when it fits and falling back to a heap `String` beyond
/// [`STACK_BUFFER_SIZE`] bytes. Functionally identical either way.
pub fn lockfile_key(name: &str, version_spec: &str) -> String {
    let mut stack = StackPath::new();
    if write!(stack, "{name}@{version_spec}").is_ok() {
        stack.as_str().to_string()
    } else {
        format!("{name}@{version_spec}")
    }
}
