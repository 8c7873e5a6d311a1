//! Checkpoint: persists partial install progress for resumption and
//! rollback (`spec.md §4.7`).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

pub const CHECKPOINT_FILE_NAME: &str = ".pantry.checkpoint";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InstallCheckpoint {
    pub installed_packages: BTreeSet<String>,
    pub recorded_dirs: BTreeSet<PathBuf>,
    pub started_at: String,
}

impl InstallCheckpoint {
    pub fn new(started_at: String) -> Self {
        Self {
            installed_packages: BTreeSet::new(),
            recorded_dirs: BTreeSet::new(),
            started_at,
        }
    }

    /// Loads the checkpoint at `<project>/.pantry.checkpoint`. A present,
    /// non-empty file means this run is a resume; a missing file means a
    /// fresh start (`spec.md §4.7`).
    pub fn load(project_dir: &Path) -> Result<Option<Self>> {
        let path = checkpoint_path(project_dir);
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read checkpoint: {}", path.display()))?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        let checkpoint: InstallCheckpoint =
            serde_json::from_str(&text).context("checkpoint file was malformed")?;
        Ok(Some(checkpoint))
    }

    /// Records one completed package and durably writes the checkpoint.
    /// Write failures are best-effort warnings per `spec.md §7`
    /// ("Checkpoint write failures are best-effort warnings"); callers log
    /// and continue rather than aborting the batch.
    pub fn record_success(&mut self, project_dir: &Path, name: &str, install_dir: &Path) {
        self.installed_packages.insert(name.to_string());
        self.recorded_dirs.insert(install_dir.to_path_buf());
        if let Err(e) = self.save(project_dir) {
            tracing::warn!("failed to persist checkpoint after installing {name}: {e}");
        }
    }

    pub fn save(&self, project_dir: &Path) -> Result<()> {
        let path = checkpoint_path(project_dir);
        let text = serde_json::to_string_pretty(self).context("failed to serialize checkpoint")?;
        crate::utils::fs::safe_write(&path, &text)
    }

    pub fn was_installed(&self, name: &str) -> bool {
        self.installed_packages.contains(name)
    }

    /// On a clean finish (zero failures), removes the checkpoint file.
    pub fn clear(project_dir: &Path) -> Result<()> {
        let path = checkpoint_path(project_dir);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("failed to remove checkpoint: {}", path.display()))?;
        }
        Ok(())
    }

    /// Rollback on project-hook failure: removes every recorded directory.
    pub fn rollback(&self) -> Result<()> {
        for dir in &self.recorded_dirs {
            if dir.exists() {
                std::fs::remove_dir_all(dir)
                    .with_context(|| format!("failed to remove {} during rollback", dir.display()))?;
            }
        }
        Ok(())
    }
}

pub fn checkpoint_path(project_dir: &Path) -> PathBuf {
    project_dir.join(CHECKPOINT_FILE_NAME)
}
