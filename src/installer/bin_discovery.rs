//! Executable discovery and `.bin` shim linking (`spec.md §4.4` step 2b,
//! `§8` boundary behavior: "Directory walk for bin discovery stops at
//! depth 8").

use crate::utils::fs::{atomic_symlink, make_executable};
use anyhow::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const BIN_DISCOVERY_MAX_DEPTH: usize = 8;

/// Finds every file/symlink under any directory literally named `bin`,
/// within [`BIN_DISCOVERY_MAX_DEPTH`] levels of `install_root`.
pub fn discover_executables(install_root: &Path) -> Vec<PathBuf> {
    let mut executables = Vec::new();

    for entry in WalkDir::new(install_root)
        .max_depth(BIN_DISCOVERY_MAX_DEPTH)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.file_type().is_dir() && entry.file_name() == "bin" {
            for file in WalkDir::new(entry.path())
                .max_depth(1)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                if file.path() == entry.path() {
                    continue;
                }
                if file.file_type().is_file() || file.file_type().is_symlink() {
                    executables.push(file.path().to_path_buf());
                }
            }
        }
    }

    executables
}

/// Links every discovered executable into `<project>/pantry/.bin/<name>`,
/// chmod'ing it 0755 first (`spec.md §4.4`, `§8`: "is a symlink to `e` and
/// is mode 0755").
pub fn link_executables(install_root: &Path, bin_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut linked = Vec::new();
    for executable in discover_executables(install_root) {
        make_executable(&executable)?;
        let Some(name) = executable.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let link_path = bin_dir.join(name);
        atomic_symlink(&executable, &link_path)?;
        linked.push(link_path);
    }
    Ok(linked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn discovers_executable_under_bin_directory() {
        let dir = tempdir().unwrap();
        let bin = dir.path().join("pkg").join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::write(bin.join("mytool"), "#!/bin/sh\necho hi").unwrap();

        let found = discover_executables(dir.path());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].file_name().unwrap(), "mytool");
    }

    #[test]
    fn ignores_bin_directories_beyond_depth_limit() {
        let dir = tempdir().unwrap();
        let mut deep = dir.path().to_path_buf();
        for i in 0..10 {
            deep = deep.join(format!("level{i}"));
        }
        let bin = deep.join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::write(bin.join("toodeep"), "x").unwrap();

        let found = discover_executables(dir.path());
        assert!(found.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn link_executables_creates_mode_0755_symlinks() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let bin = dir.path().join("pkg").join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        let exe = bin.join("mytool");
        std::fs::write(&exe, "#!/bin/sh\necho hi").unwrap();

        let bin_dir = dir.path().join(".bin");
        std::fs::create_dir_all(&bin_dir).unwrap();
        let linked = link_executables(dir.path(), &bin_dir).unwrap();

        assert_eq!(linked.len(), 1);
        let link = &linked[0];
        assert!(std::fs::symlink_metadata(link).unwrap().file_type().is_symlink());
        let perms = std::fs::metadata(&exe).unwrap().permissions();
        assert_eq!(perms.mode() & 0o777, 0o755);
    }
}
