//! Skip Oracle: decides whether a dependency can be skipped given lockfile
//! and on-disk state (`spec.md §4.3`).

use crate::depsfile::Dependency;
use crate::lockfile::Lockfile;
use crate::utils::hash::lockfile_key;
use std::path::Path;

/// `can_skip(dep, lockfile, project_dir)` per `spec.md §4.3`. Returns
/// `true` iff the lockfile has a matching entry **and** the package
/// directory exists on disk. Uses a stack-buffer key via
/// [`lockfile_key`], falling back to the heap for long names/specs
/// transparently.
pub fn can_skip(dep: &Dependency, lockfile: &Lockfile, project_dir: &Path) -> bool {
    let key = lockfile_key(&dep.name, &dep.version_spec);

    let Some(entry) = lockfile.packages.get(&key) else {
        return false;
    };
    if entry.name != dep.name || entry.version != dep.version_spec {
        return false;
    }

    // "accessibility check via access, not a full stat": std::path::Path
    // ::exists ultimately calls stat, but we deliberately avoid reading
    // metadata beyond existence -- no mtime/size comparison is performed.
    package_dir(project_dir, &dep.name).exists()
}

pub fn package_dir(project_dir: &Path, clean_name: &str) -> std::path::PathBuf {
    project_dir.join("pantry").join(clean_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depsfile::DependencyKind;
    use crate::lockfile::LockfileEntry;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn entry(name: &str, version: &str) -> LockfileEntry {
        LockfileEntry {
            name: name.to_string(),
            version: version.to_string(),
            source: "npm".to_string(),
            url: None,
            resolved: None,
            integrity: None,
            dependencies: BTreeMap::new(),
        }
    }

    #[test]
    fn skips_when_lockfile_and_directory_both_match() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("pantry").join("lodash")).unwrap();
        let lockfile = Lockfile::new(
            vec![("lodash@4.17.21".into(), entry("lodash", "4.17.21"))],
            "t".into(),
        );
        let dep = Dependency::parse("lodash", "4.17.21", DependencyKind::Normal).unwrap();
        assert!(can_skip(&dep, &lockfile, dir.path()));
    }

    #[test]
    fn does_not_skip_when_directory_missing() {
        let dir = tempdir().unwrap();
        let lockfile = Lockfile::new(
            vec![("lodash@4.17.21".into(), entry("lodash", "4.17.21"))],
            "t".into(),
        );
        let dep = Dependency::parse("lodash", "4.17.21", DependencyKind::Normal).unwrap();
        assert!(!can_skip(&dep, &lockfile, dir.path()));
    }

    #[test]
    fn does_not_skip_when_lockfile_entry_missing() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("pantry").join("lodash")).unwrap();
        let lockfile = Lockfile::empty("t".into());
        let dep = Dependency::parse("lodash", "4.17.21", DependencyKind::Normal).unwrap();
        assert!(!can_skip(&dep, &lockfile, dir.path()));
    }

    #[test]
    fn does_not_skip_when_version_mismatches() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("pantry").join("lodash")).unwrap();
        let lockfile = Lockfile::new(
            vec![("lodash@4.17.20".into(), entry("lodash", "4.17.20"))],
            "t".into(),
        );
        let dep = Dependency::parse("lodash", "4.17.21", DependencyKind::Normal).unwrap();
        assert!(!can_skip(&dep, &lockfile, dir.path()));
    }
}
