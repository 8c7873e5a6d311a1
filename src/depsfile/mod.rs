//! Project deps file loading (`spec.md §6`): `pantry.json`, `pantry.jsonc`,
//! or `package.json`, each read into the same [`DepsFile`] shape.

pub mod dependency;

pub use dependency::{Dependency, DependencyKind, GithubRef, SourceHint};

use crate::core::error::PantryError;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// The three deps-file names the Resolver/Orchestrator recognize, in
/// lookup priority order.
pub const DEPS_FILE_NAMES: [&str; 3] = ["pantry.json", "pantry.jsonc", "package.json"];

#[derive(Debug, Deserialize, Default)]
pub struct RawDepsFile {
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default, rename = "devDependencies")]
    pub dev_dependencies: BTreeMap<String, String>,
    #[serde(default, rename = "peerDependencies")]
    pub peer_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub scripts: BTreeMap<String, String>,
    #[serde(default, rename = "trustedDependencies")]
    pub trusted_dependencies: Vec<String>,
    #[serde(default)]
    pub overrides: BTreeMap<String, String>,
    #[serde(default)]
    pub workspaces: Vec<String>,
    #[serde(default)]
    pub catalog: BTreeMap<String, String>,
    #[serde(default)]
    pub catalogs: BTreeMap<String, BTreeMap<String, String>>,
    #[serde(default)]
    pub name: Option<String>,
}

/// A fully parsed deps file: raw sections plus a flattened, validated
/// dependency list.
#[derive(Debug, Default)]
pub struct DepsFile {
    pub raw: RawDepsFile,
    pub dependencies: Vec<Dependency>,
    pub path: PathBuf,
}

impl DepsFile {
    /// Walks up from `start_dir` looking for one of [`DEPS_FILE_NAMES`],
    /// returning the first match. Mirrors "locate project root (the
    /// directory of the nearest deps file or cwd if none)" from
    /// `spec.md §4.10`.
    pub fn find(start_dir: &Path) -> Option<PathBuf> {
        let mut dir = Some(start_dir.to_path_buf());
        while let Some(d) = dir {
            for name in DEPS_FILE_NAMES {
                let candidate = d.join(name);
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
            dir = d.parent().map(|p| p.to_path_buf());
        }
        None
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read deps file: {}", path.display()))?;
        let text_for_parse = if path.extension().and_then(|e| e.to_str()) == Some("jsonc") {
            strip_jsonc_comments(&text)
        } else {
            text
        };

        let raw: RawDepsFile = serde_json::from_str(&text_for_parse).map_err(|e| {
            PantryError::DepsFileMalformed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;

        let dependencies = flatten_dependencies(&raw)?;

        Ok(Self {
            raw,
            dependencies,
            path: path.to_path_buf(),
        })
    }

    pub fn project_dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("."))
    }
}

fn flatten_dependencies(raw: &RawDepsFile) -> Result<Vec<Dependency>> {
    let mut out = Vec::new();
    for (name, spec) in &raw.dependencies {
        out.push(Dependency::parse(name, spec, DependencyKind::Normal)?);
    }
    for (name, spec) in &raw.dev_dependencies {
        out.push(Dependency::parse(name, spec, DependencyKind::Dev)?);
    }
    for (name, spec) in &raw.peer_dependencies {
        out.push(Dependency::parse(name, spec, DependencyKind::Peer)?);
    }
    Ok(out)
}

/// Strips `//` line comments and `/* */` block comments from a JSONC
/// document before handing it to `serde_json`. Comment markers inside
/// string literals are respected and left untouched.
pub fn strip_jsonc_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = ' ';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            _ => out.push(c),
        }
    }

    out
}
