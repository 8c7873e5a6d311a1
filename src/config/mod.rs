//! Global configuration: cache root, offline flag, and concurrency cap,
//! layered the way the reference CLI layers `~/.agpm/config.toml` over the
//! project manifest — here collapsed to environment variables plus
//! documented defaults, since a general external config-file loader is out
//! of scope (`spec.md §6`).

use std::path::PathBuf;

/// Environment variable that forces offline mode, documented in
/// `spec.md §6` ("offline-mode flag via a documented variable").
pub const OFFLINE_ENV_VAR: &str = "PANTRY_OFFLINE";

#[derive(Debug, Clone)]
pub struct PantryConfig {
    /// Root of the shared, content-addressed package cache.
    pub cache_dir: PathBuf,
    /// Root under which per-project hashed environments live
    /// (`~/.pantry/envs/<basename>_<proj-hash>-<deps-hash>/`).
    pub envs_dir: PathBuf,
    /// Root under which registered `link:` targets live
    /// (`~/.pantry/links/<name>`).
    pub links_dir: PathBuf,
    pub offline: bool,
}

impl PantryConfig {
    /// Loads configuration from the environment and the user's home
    /// directory. Never fails: falls back to `./.pantry` if no home
    /// directory can be determined, matching the reference CLI's
    /// best-effort posture for global config discovery.
    pub fn load() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let root = home.join(".pantry");
        let offline = std::env::var(OFFLINE_ENV_VAR)
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self {
            cache_dir: root.join("cache"),
            envs_dir: root.join("envs"),
            links_dir: root.join("links"),
            offline,
        }
    }

    pub fn link_target(&self, name: &str) -> PathBuf {
        self.links_dir.join(name)
    }
}

impl Default for PantryConfig {
    fn default() -> Self {
        Self::load()
    }
}

/// An alternative source of project configuration (e.g. a team-wide config
/// service) producing the same dependency list plus a global flag. Out of
/// scope per `spec.md §6`; no implementation ships with this crate, but the
/// orchestrator is written against this trait rather than `DepsFile`
/// directly wherever it would matter for such a source to be pluggable.
pub trait ExternalConfigLoader: Send + Sync {
    fn load(&self) -> anyhow::Result<Vec<(String, String)>>;
}
