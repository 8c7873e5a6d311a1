//! Shared fixtures for the binary-level integration tests, in the spirit of
//! the reference crate's own `tests/common`/`tests/fixtures` helpers.

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A throwaway project directory plus an isolated `$HOME`, so tests never
/// touch the real `~/.pantry`.
pub struct TestProject {
    pub project_dir: TempDir,
    pub home_dir: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        Self {
            project_dir: TempDir::new().unwrap(),
            home_dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.project_dir.path()
    }

    pub fn write_deps_file(&self, contents: &str) {
        std::fs::write(self.path().join("pantry.json"), contents).unwrap();
    }

    pub fn write_lockfile(&self, contents: &str) {
        std::fs::write(self.path().join("pantry.lock"), contents).unwrap();
    }

    /// Builds a `pantry install` command rooted at this project, with `HOME`
    /// redirected so global config/links never escape the sandbox.
    pub fn pantry_command(&self) -> Command {
        let mut cmd = Command::cargo_bin("pantry").unwrap();
        cmd.current_dir(self.path());
        cmd.env("HOME", self.home_dir.path());
        cmd.env_remove("RUST_LOG");
        cmd
    }

    pub fn links_dir(&self) -> PathBuf {
        self.home_dir.path().join(".pantry").join("links")
    }
}
