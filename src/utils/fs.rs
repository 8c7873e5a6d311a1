//! Atomic filesystem primitives: write-then-rename for files, and the
//! create-else-unlink-then-create protocol for symlinks (`spec.md §4.4`,
//! `§9`).

use crate::utils::platform::windows_long_path;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory: {}", dir.display()))?;
    }
    Ok(())
}

/// Writes bytes to `path` atomically: write to `path.tmp`, `sync_all`, then
/// `rename` over the destination. Readers never observe a partial write.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    use std::io::Write;

    let safe_path = windows_long_path(path);
    if let Some(parent) = safe_path.parent() {
        ensure_dir(parent)?;
    }

    let temp_path = safe_path.with_extension("tmp");
    {
        let mut file = fs::File::create(&temp_path)
            .with_context(|| format!("failed to create temp file: {}", temp_path.display()))?;
        file.write_all(content)
            .with_context(|| format!("failed to write temp file: {}", temp_path.display()))?;
        file.sync_all().context("failed to sync temp file to disk")?;
    }
    fs::rename(&temp_path, &safe_path)
        .with_context(|| format!("failed to rename into place: {}", safe_path.display()))?;
    Ok(())
}

pub fn safe_write(path: &Path, content: &str) -> Result<()> {
    atomic_write(path, content.as_bytes())
}

/// Validates a name destined to become a path component under `pantry/` or
/// `.bin/`: rejects path separators, `..`, a bare `.`, and backslashes
/// (`spec.md §4.4`).
pub fn validate_link_name(name: &str) -> Result<()> {
    if name.contains('/') || name.contains('\\') || name.contains("..") || name == "." || name.is_empty() {
        anyhow::bail!("invalid link destination name: {name:?}");
    }
    Ok(())
}

/// The atomic symlink protocol: attempt `symlink(target, dst)`; on
/// `EEXIST`, unlink and retry once. Portable replacement for an atomic
/// create-or-replace primitive that doesn't exist cross-platform.
#[cfg(unix)]
pub fn atomic_symlink(target: &Path, dst: &Path) -> Result<()> {
    use std::os::unix::fs::symlink;

    if let Some(name) = dst.file_name().and_then(|n| n.to_str()) {
        validate_link_name(name)?;
    }
    if let Some(parent) = dst.parent() {
        ensure_dir(parent)?;
    }

    match symlink(target, dst) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            fs::remove_file(dst)
                .or_else(|_| fs::remove_dir_all(dst))
                .with_context(|| format!("failed to unlink existing {}", dst.display()))?;
            symlink(target, dst)
                .with_context(|| format!("failed to symlink {} -> {}", dst.display(), target.display()))
        }
        Err(e) => Err(e).with_context(|| format!("failed to symlink {} -> {}", dst.display(), target.display())),
    }
}

#[cfg(windows)]
pub fn atomic_symlink(target: &Path, dst: &Path) -> Result<()> {
    use std::os::windows::fs::{symlink_dir, symlink_file};

    if let Some(name) = dst.file_name().and_then(|n| n.to_str()) {
        validate_link_name(name)?;
    }
    if let Some(parent) = dst.parent() {
        ensure_dir(parent)?;
    }

    let link = |t: &Path, d: &Path| if t.is_dir() { symlink_dir(t, d) } else { symlink_file(t, d) };

    match link(target, dst) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            fs::remove_file(dst)
                .or_else(|_| fs::remove_dir_all(dst))
                .with_context(|| format!("failed to unlink existing {}", dst.display()))?;
            link(target, dst)
                .with_context(|| format!("failed to symlink {} -> {}", dst.display(), target.display()))
        }
        Err(e) => Err(e).with_context(|| format!("failed to symlink {} -> {}", dst.display(), target.display())),
    }
}

/// Sets executable bits (0755) on a file. No-op on platforms without Unix
/// permission bits.
#[cfg(unix)]
pub fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)
        .with_context(|| format!("failed to stat {}", path.display()))?
        .permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms)
        .with_context(|| format!("failed to chmod {}", path.display()))
}

#[cfg(not(unix))]
pub fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn atomic_write_creates_and_overwrites() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("x.txt");
        atomic_write(&file, b"first").unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), "first");
        atomic_write(&file, b"second").unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), "second");
    }

    #[test]
    fn validate_link_name_rejects_traversal() {
        assert!(validate_link_name("../evil").is_err());
        assert!(validate_link_name("a/b").is_err());
        assert!(validate_link_name("a\\b").is_err());
        assert!(validate_link_name(".").is_err());
        assert!(validate_link_name("fine-name").is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn atomic_symlink_replaces_existing() {
        let dir = tempdir().unwrap();
        let target_a = dir.path().join("a");
        let target_b = dir.path().join("b");
        fs::write(&target_a, "a").unwrap();
        fs::write(&target_b, "b").unwrap();
        let link = dir.path().join("link");

        atomic_symlink(&target_a, &link).unwrap();
        assert_eq!(fs::read_link(&link).unwrap(), target_a);

        atomic_symlink(&target_b, &link).unwrap();
        assert_eq!(fs::read_link(&link).unwrap(), target_b);
    }
}
