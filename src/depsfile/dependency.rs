//! The `Dependency` input unit (`spec.md §3`) and the prefix-parsing rules
//! that turn a raw `name -> version-spec` pair from a deps file into one.

use crate::core::error::PantryError;
use anyhow::Result;

/// Maximum total length of a dependency name, mirroring npm's package-name
/// length limit.
pub const MAX_NAME_LENGTH: usize = 214;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceHint {
    Registry,
    Github,
    Git,
    Url,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    Normal,
    Dev,
    Peer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubRef {
    pub owner: String,
    pub repo: String,
    pub reference: String,
}

#[derive(Debug, Clone)]
pub struct Dependency {
    /// Clean name, with any `npm:`/`local:`/`auto:`/`github:` prefix
    /// already stripped.
    pub name: String,
    pub version_spec: String,
    pub source_hint: SourceHint,
    pub kind: DependencyKind,
    pub github_ref: Option<GithubRef>,
}

impl Dependency {
    /// Parses one `name -> version-spec` entry from a deps file section.
    ///
    /// Recognizes the `npm:`, `local:`, `auto:`, and `github:` name
    /// prefixes (`spec.md §3`). `local:` and filesystem-path version specs
    /// are detected here but materialized by the Local/Link Materializer,
    /// not the Resolver.
    pub fn parse(raw_name: &str, version_spec: &str, kind: DependencyKind) -> Result<Self> {
        let (name, source_hint, github_ref) = Self::split_prefix(raw_name, version_spec)?;
        Self::validate_name(&name)?;

        Ok(Self {
            name,
            version_spec: version_spec.to_string(),
            source_hint,
            kind,
            github_ref,
        })
    }

    fn split_prefix(
        raw_name: &str,
        version_spec: &str,
    ) -> Result<(String, SourceHint, Option<GithubRef>)> {
        if let Some(rest) = raw_name.strip_prefix("npm:") {
            return Ok((rest.to_string(), SourceHint::Registry, None));
        }
        if let Some(rest) = raw_name.strip_prefix("local:") {
            return Ok((rest.to_string(), SourceHint::Url, None));
        }
        if let Some(rest) = raw_name.strip_prefix("auto:") {
            return Ok((rest.to_string(), SourceHint::Registry, None));
        }
        if let Some(rest) = raw_name.strip_prefix("github:") {
            let github_ref = parse_github_ref(rest, version_spec);
            return Ok((rest.to_string(), SourceHint::Github, github_ref));
        }
        Ok((raw_name.to_string(), SourceHint::Registry, None))
    }

    fn validate_name(name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(PantryError::InvalidDepSpec {
                name: name.to_string(),
                reason: "name is empty after prefix stripping".into(),
            }
            .into());
        }
        if name.contains("..") || name.contains('\\') {
            return Err(PantryError::InvalidDepSpec {
                name: name.to_string(),
                reason: "name contains path-traversal characters".into(),
            }
            .into());
        }
        if name.len() > MAX_NAME_LENGTH {
            return Err(PantryError::InvalidDepSpec {
                name: name.to_string(),
                reason: format!("name exceeds {MAX_NAME_LENGTH} characters"),
            }
            .into());
        }
        Ok(())
    }

    pub fn is_local(&self) -> bool {
        self.version_spec.starts_with("link:")
            || self.version_spec.starts_with("~/")
            || self.version_spec.starts_with('/')
            || self.version_spec.starts_with("./")
            || self.version_spec.starts_with("../")
    }

    /// Name of a registered link target, if this dependency is a `link:`
    /// reference.
    pub fn link_name(&self) -> Option<&str> {
        self.version_spec.strip_prefix("link:")
    }

    /// Is this a `workspace:*`-style reference to a sibling workspace
    /// member? These are never installed from a registry; the Workspace
    /// Aggregator wires them via symlink instead (`spec.md §4.9`).
    pub fn is_workspace_ref(&self) -> bool {
        self.version_spec.starts_with("workspace:")
    }

    /// Is this a `catalog:`/`catalog:<name>` reference that the Workspace
    /// Aggregator must resolve against a root catalog before the Resolver
    /// ever sees it (`spec.md §4.9`)?
    pub fn is_catalog_ref(&self) -> bool {
        self.version_spec.starts_with("catalog:")
    }
}

/// `owner/repo` style github ref parsed from the stripped name plus the
/// version spec used as the ref (tag/branch/sha).
fn parse_github_ref(name_after_prefix: &str, version_spec: &str) -> Option<GithubRef> {
    let mut parts = name_after_prefix.splitn(2, '/');
    let owner = parts.next()?.to_string();
    let repo = parts.next()?.to_string();
    Some(GithubRef {
        owner,
        repo,
        reference: version_spec.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_registry_dependency() {
        let dep = Dependency::parse("lodash", "^4.17.0", DependencyKind::Normal).unwrap();
        assert_eq!(dep.name, "lodash");
        assert_eq!(dep.source_hint, SourceHint::Registry);
        assert!(!dep.is_local());
    }

    #[test]
    fn parses_npm_prefixed_dependency() {
        let dep = Dependency::parse("npm:left-pad", "1.3.0", DependencyKind::Dev).unwrap();
        assert_eq!(dep.name, "left-pad");
        assert_eq!(dep.kind, DependencyKind::Dev);
    }

    #[test]
    fn parses_github_prefixed_dependency() {
        let dep = Dependency::parse("github:foo/bar", "v1.2.3", DependencyKind::Normal).unwrap();
        assert_eq!(dep.name, "foo/bar");
        assert_eq!(dep.source_hint, SourceHint::Github);
        let gh = dep.github_ref.unwrap();
        assert_eq!(gh.owner, "foo");
        assert_eq!(gh.repo, "bar");
        assert_eq!(gh.reference, "v1.2.3");
    }

    #[test]
    fn rejects_path_traversal_in_name() {
        let err = Dependency::parse("../evil", "1.0.0", DependencyKind::Normal);
        assert!(err.is_err());
    }

    #[test]
    fn rejects_overlong_name() {
        let long = "x".repeat(300);
        let err = Dependency::parse(&long, "1.0.0", DependencyKind::Normal);
        assert!(err.is_err());
    }

    #[test]
    fn detects_local_link_dependency() {
        let dep = Dependency::parse("mylib", "link:mylib", DependencyKind::Normal).unwrap();
        assert!(dep.is_local());
        assert_eq!(dep.link_name(), Some("mylib"));
    }

    #[test]
    fn detects_local_path_dependency() {
        let dep = Dependency::parse("mylib", "../mylib", DependencyKind::Normal).unwrap();
        assert!(dep.is_local());
        assert_eq!(dep.link_name(), None);
    }

    #[test]
    fn detects_workspace_and_catalog_refs() {
        let ws = Dependency::parse("sibling", "workspace:*", DependencyKind::Normal).unwrap();
        assert!(ws.is_workspace_ref());
        assert!(!ws.is_local());

        let cat = Dependency::parse("react", "catalog:", DependencyKind::Normal).unwrap();
        assert!(cat.is_catalog_ref());
        assert!(!cat.is_workspace_ref());
    }
}
