//! Typed error taxonomy for the install engine.
//!
//! Internal plumbing mostly returns `anyhow::Result` with `.context(...)`
//! attached at each fallible step. At the boundaries that report to a user
//! (the orchestrator summary, the CLI exit path) errors are classified into
//! [`PantryError`] so that a [`RecoverySuggestion`] can be attached and the
//! right exit behavior chosen.

use std::path::PathBuf;
use thiserror::Error;

/// The full error taxonomy a caller can observe from the install engine.
#[derive(Debug, Error)]
pub enum PantryError {
    #[error("no deps file found in {0} or any parent directory")]
    ConfigMissing(PathBuf),

    #[error("invalid dependency spec for `{name}`: {reason}")]
    InvalidDepSpec { name: String, reason: String },

    #[error("{name}@{version_spec} not found in pantry or npm registry")]
    PackageNotFound { name: String, version_spec: String },

    #[error("npm registry response for `{name}` had no usable dist.tarball")]
    NoTarballUrl { name: String },

    #[error("refusing to fetch `{url}`: only http/https URLs are allowed")]
    InvalidTarballScheme { url: String },

    #[error("network error fetching `{what}`: {source}")]
    NetworkError {
        what: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to extract archive for `{name}`: {reason}")]
    ExtractionError { name: String, reason: String },

    #[error("offline mode: no cached artifact for `{name}@{version}`")]
    OfflineCacheMiss { name: String, version: String },

    #[error("postinstall script for `{name}` exited with status {status}")]
    LifecycleScriptFailed { name: String, status: i32 },

    #[error("project `{hook}` hook failed: {reason}")]
    HookFailed { hook: String, reason: String },

    #[error("link `{0}` is not registered under ~/.pantry/links")]
    LinkNotFound(String),

    #[error("local dependency `{name}` points at a nonexistent path: {path}")]
    LocalPathMissing { name: String, path: PathBuf },

    #[error("lockfile at {path} is malformed: {reason}")]
    LockfileMalformed { path: PathBuf, reason: String },

    #[error("deps file at {path} is malformed: {reason}")]
    DepsFileMalformed { path: PathBuf, reason: String },

    #[error("symlink error at {path}: {reason}")]
    SymlinkError { path: PathBuf, reason: String },

    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("path too long: {0}")]
    PathTooLong(PathBuf),
}

impl PantryError {
    /// A short, stable kind name used to key [`RecoverySuggestion`] lookups
    /// and to group failures in the final summary.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigMissing(_) => "ConfigMissing",
            Self::InvalidDepSpec { .. } => "InvalidDepSpec",
            Self::PackageNotFound { .. } => "PackageNotFound",
            Self::NoTarballUrl { .. } => "NoTarballUrl",
            Self::InvalidTarballScheme { .. } => "InvalidTarballScheme",
            Self::NetworkError { .. } => "NetworkError",
            Self::ExtractionError { .. } => "ExtractionError",
            Self::OfflineCacheMiss { .. } => "OfflineCacheMiss",
            Self::LifecycleScriptFailed { .. } => "LifecycleScriptFailed",
            Self::HookFailed { .. } => "HookFailed",
            Self::LinkNotFound(_) => "LinkNotFound",
            Self::LocalPathMissing { .. } => "LocalPathMissing",
            Self::LockfileMalformed { .. } => "LockfileMalformed",
            Self::DepsFileMalformed { .. } => "DepsFileMalformed",
            Self::SymlinkError { .. } => "SymlinkError",
            Self::IoError { .. } => "IoError",
            Self::PathTooLong(_) => "PathTooLong",
        }
    }

    /// Whether this error kind is fatal at the orchestrator level (exit 1)
    /// as opposed to a per-package failure that is recorded and surfaced in
    /// the summary while the batch continues.
    pub fn is_orchestrator_fatal(&self) -> bool {
        matches!(self, Self::ConfigMissing(_) | Self::HookFailed { .. })
    }
}

/// A short actionable hint attached to a user-facing failure.
#[derive(Debug, Clone)]
pub struct RecoverySuggestion(pub String);

impl RecoverySuggestion {
    /// Look up the suggestion for an error kind, per `spec.md §4.4`.
    pub fn for_kind(kind: &str) -> Option<Self> {
        let text = match kind {
            "PackageNotFound" => "try `pantry search <name>` to check the name and version",
            "NetworkError" => "check your network connection, or retry with --offline",
            "OfflineCacheMiss" => "the package isn't cached locally; retry without --offline",
            "LinkNotFound" => "register the link first with the companion `link` command",
            "LocalPathMissing" => "check that the path in your deps file still exists",
            _ => return None,
        };
        Some(Self(text.to_string()))
    }
}

/// Wraps an error with a suggestion and renders it for the user.
pub struct ErrorContext {
    pub error: PantryError,
    pub suggestion: Option<RecoverySuggestion>,
}

impl ErrorContext {
    pub fn new(error: PantryError) -> Self {
        let suggestion = RecoverySuggestion::for_kind(error.kind());
        Self { error, suggestion }
    }

    /// Render a colored, multi-line message suitable for stderr.
    pub fn display(&self) -> String {
        use colored::Colorize;
        let mut out = format!("{} {}", "error:".red().bold(), self.error);
        if let Some(RecoverySuggestion(hint)) = &self.suggestion {
            out.push_str(&format!("\n  {} {}", "hint:".yellow(), hint));
        }
        out
    }
}

/// Convert a top-level `anyhow::Error` into a displayable [`ErrorContext`].
///
/// Errors that downcast to [`PantryError`] get a suggestion attached;
/// anything else is shown as-is.
pub fn user_friendly_error(err: anyhow::Error) -> ErrorContext {
    match err.downcast::<PantryError>() {
        Ok(pantry_err) => ErrorContext::new(pantry_err),
        Err(other) => ErrorContext {
            error: PantryError::IoError {
                path: PathBuf::new(),
                source: std::io::Error::other(other.to_string()),
            },
            suggestion: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_not_found_has_suggestion() {
        let err = PantryError::PackageNotFound {
            name: "zzz-nope".into(),
            version_spec: "1.0.0".into(),
        };
        let ctx = ErrorContext::new(err);
        assert!(ctx.suggestion.is_some());
        assert!(ctx.display().contains("zzz-nope"));
    }

    #[test]
    fn config_missing_is_fatal() {
        let err = PantryError::ConfigMissing(PathBuf::from("/tmp"));
        assert!(err.is_orchestrator_fatal());
    }

    #[test]
    fn network_error_is_not_fatal() {
        let err = PantryError::NetworkError {
            what: "https://registry.npmjs.org/lodash".into(),
            source: anyhow::anyhow!("connection refused"),
        };
        assert!(!err.is_orchestrator_fatal());
    }
}
