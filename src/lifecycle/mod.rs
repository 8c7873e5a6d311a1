//! Lifecycle Gate: decides whether a package's post-install script may run,
//! and executes it with an augmented `PATH` (`spec.md §4.6`).

use crate::core::error::PantryError;
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

/// Default timeout for a package's post-install script.
pub const SCRIPT_TIMEOUT: Duration = Duration::from_millis(120_000);
/// Default timeout for a project-level pre/post-install hook.
pub const HOOK_TIMEOUT: Duration = Duration::from_millis(60_000);

/// Ancestor-walk depth limit for `PATH` synthesis (`spec.md §4.6`, `§8`).
pub const PATH_SYNTHESIS_DEPTH: usize = 20;

/// Pseudo-name a project opts into via `trustedDependencies` to allow its
/// own `preinstall`/`postinstall` hooks to run (`spec.md §4.6`).
pub const PROJECT_HOOK_TRUST_NAME: &str = ".";

/// A static set of well-known native-addon and build-tool packages allowed
/// to run lifecycle scripts without appearing in a project's
/// `trustedDependencies` (`spec.md §4.6`, `§9`: "treat it as configuration
/// data, not code").
pub const DEFAULT_TRUST_LIST: &[&str] = &[
    "node-gyp",
    "esbuild",
    "sharp",
    "fsevents",
    "bcrypt",
    "better-sqlite3",
    "core-js",
    "protobufjs",
    "puppeteer",
];

pub struct LifecycleGate<'a> {
    trusted_dependencies: &'a [String],
}

impl<'a> LifecycleGate<'a> {
    pub fn new(trusted_dependencies: &'a [String]) -> Self {
        Self { trusted_dependencies }
    }

    /// Is `clean_name` trusted to run a post-install script?
    pub fn is_trusted(&self, clean_name: &str) -> bool {
        DEFAULT_TRUST_LIST.contains(&clean_name)
            || self.trusted_dependencies.iter().any(|n| n == clean_name)
    }

    /// Runs `command` for `package_name` in `install_dir`, honoring the
    /// trust policy. Returns `Ok(None)` (and logs at debug) if the package
    /// isn't trusted; `Ok(Some(()))` on a trusted, successful run.
    pub fn run_package_script(
        &self,
        package_name: &str,
        install_dir: &Path,
        command: &str,
    ) -> Result<Option<()>> {
        if !self.is_trusted(package_name) {
            tracing::debug!("Skipping script for untrusted package: {package_name}");
            return Ok(None);
        }
        run_script(install_dir, command, SCRIPT_TIMEOUT).map(Some).map_err(|e| {
            PantryError::LifecycleScriptFailed {
                name: package_name.to_string(),
                status: e.exit_code.unwrap_or(-1),
            }
            .into()
        })
    }

    /// Runs a project-level `preinstall`/`postinstall` hook in `project_dir`.
    /// Hooks are governed by the same trust model, keyed by the project's
    /// own pseudo-name `"."` -- project hooks only run when
    /// `trustedDependencies` contains the literal entry `"."`. Without that
    /// opt-in, the hook is skipped (and logged) rather than executed.
    pub fn run_project_hook(&self, hook_name: &str, project_dir: &Path, command: &str) -> Result<()> {
        if !self.is_trusted(PROJECT_HOOK_TRUST_NAME) {
            tracing::debug!(
                "Skipping {hook_name} hook: add \".\" to trustedDependencies to allow project hooks to run"
            );
            return Ok(());
        }
        run_script(project_dir, command, HOOK_TIMEOUT).map_err(|e| {
            PantryError::HookFailed {
                hook: hook_name.to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }
}

/// Synthesizes a fresh `PATH` for a script run from `install_dir`: every
/// ancestor's `pantry/.bin` up to [`PATH_SYNTHESIS_DEPTH`] levels, followed
/// by the inherited `PATH`. Built fresh per invocation per `spec.md §9`
/// (never cached, since it depends on the current package's directory).
pub fn synthesize_path(install_dir: &Path) -> String {
    let mut bin_dirs: Vec<PathBuf> = Vec::new();
    let mut current = Some(install_dir);
    let mut depth = 0;

    while let Some(dir) = current {
        if depth >= PATH_SYNTHESIS_DEPTH {
            break;
        }
        let candidate = dir.join("pantry").join(".bin");
        if candidate.is_dir() {
            bin_dirs.push(candidate);
        }
        current = dir.parent();
        depth += 1;
    }

    let inherited = std::env::var("PATH").unwrap_or_default();
    let sep = if cfg!(windows) { ";" } else { ":" };
    let mut parts: Vec<String> = bin_dirs.into_iter().map(|p| p.display().to_string()).collect();
    parts.push(inherited);
    parts.join(sep)
}

struct ScriptError {
    exit_code: Option<i32>,
    message: String,
}

impl std::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

fn run_script(cwd: &Path, command: &str, timeout: Duration) -> std::result::Result<(), ScriptError> {
    let path = synthesize_path(cwd);
    let mut cmd = crate::utils::platform::shell_command(command);
    cmd.current_dir(cwd)
        .env("PATH", path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|e| ScriptError {
        exit_code: None,
        message: format!("failed to spawn script: {e}"),
    })?;

    let status = wait_with_timeout(&mut child, timeout).map_err(|e| ScriptError {
        exit_code: None,
        message: e,
    })?;

    match status {
        Some(status) if status.success() => Ok(()),
        Some(status) => Err(ScriptError {
            exit_code: status.code(),
            message: format!("script exited with status {status}"),
        }),
        None => Err(ScriptError {
            exit_code: None,
            message: "script timed out".to_string(),
        }),
    }
}

/// Polls the child for completion, killing (platform-appropriate TERM) and
/// returning `Ok(None)` on timeout.
fn wait_with_timeout(
    child: &mut std::process::Child,
    timeout: Duration,
) -> std::result::Result<Option<std::process::ExitStatus>, String> {
    let start = std::time::Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(Some(status)),
            Ok(None) => {
                if start.elapsed() >= timeout {
                    let _ = terminate(child);
                    let _ = child.wait();
                    return Ok(None);
                }
                std::thread::sleep(Duration::from_millis(25));
            }
            Err(e) => return Err(format!("failed to poll script process: {e}")),
        }
    }
}

#[cfg(unix)]
fn terminate(child: &mut std::process::Child) -> std::io::Result<()> {
    // SIGTERM is the platform-appropriate signal on Unix.
    let pid = child.id() as i32;
    let ret = unsafe { libc::kill(pid, libc::SIGTERM) };
    if ret == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(windows)]
fn terminate(child: &mut std::process::Child) -> std::io::Result<()> {
    child.kill()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_trust_list_allows_known_native_addons() {
        let trusted = vec![];
        let gate = LifecycleGate::new(&trusted);
        assert!(gate.is_trusted("node-gyp"));
        assert!(!gate.is_trusted("evil-pkg"));
    }

    #[test]
    fn project_trusted_dependencies_extend_default_list() {
        let trusted = vec!["evil-pkg".to_string()];
        let gate = LifecycleGate::new(&trusted);
        assert!(gate.is_trusted("evil-pkg"));
    }

    #[test]
    fn untrusted_package_script_is_skipped_not_run() {
        let trusted = vec![];
        let gate = LifecycleGate::new(&trusted);
        let dir = tempfile::tempdir().unwrap();
        let result = gate
            .run_package_script("evil-pkg", dir.path(), "echo GOT YOU")
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn project_hook_is_skipped_without_dot_opt_in() {
        let trusted: Vec<String> = vec![];
        let gate = LifecycleGate::new(&trusted);
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let cmd = format!("touch {}", marker.display());
        gate.run_project_hook("preinstall", dir.path(), &cmd).unwrap();
        assert!(!marker.exists());
    }

    #[test]
    fn project_hook_runs_with_dot_opt_in() {
        let trusted = vec![".".to_string()];
        let gate = LifecycleGate::new(&trusted);
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let cmd = format!("touch {}", marker.display());
        #[cfg(unix)]
        {
            gate.run_project_hook("preinstall", dir.path(), &cmd).unwrap();
            assert!(marker.exists());
        }
    }

    #[test]
    fn trusted_package_script_actually_runs() {
        let trusted = vec!["node-gyp".to_string()];
        let gate = LifecycleGate::new(&trusted);
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let cmd = format!("touch {}", marker.display());
        #[cfg(unix)]
        {
            gate.run_package_script("node-gyp", dir.path(), &cmd).unwrap();
            assert!(marker.exists());
        }
    }

    #[test]
    fn path_synthesis_stops_at_depth_limit() {
        let path = synthesize_path(Path::new("/a/b/c"));
        assert!(!path.is_empty());
    }
}
