//! Semver constraint matching per `spec.md §4.1`.
//!
//! Deliberately narrower than the `semver` crate's full grammar: Pantry's
//! constraint syntax is `^X.Y.Z`, `~X.Y.Z`, and the comparison operators
//! `>=`, `<=`, `>`, `<`, `=`, plus bare exact versions. Versions are
//! `MAJOR.MINOR.PATCH` with optional `v` prefix; pre-release suffixes are
//! ignored for ordering, matching the spec's explicit simplification rather
//! than full SemVer precedence rules.

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SimpleVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl SimpleVersion {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.strip_prefix('v').unwrap_or(raw);
        // Drop any pre-release/build metadata suffix for ordering purposes.
        let core = raw.split(['-', '+']).next().unwrap_or(raw);
        let mut parts = core.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next().unwrap_or("0").parse().ok()?;
        let patch = parts.next().unwrap_or("0").parse().ok()?;
        Some(Self { major, minor, patch })
    }
}

impl std::fmt::Display for SimpleVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[derive(Debug, Clone)]
pub enum Constraint {
    Exact(SimpleVersion),
    Caret(SimpleVersion),
    Tilde(SimpleVersion),
    Ge(SimpleVersion),
    Le(SimpleVersion),
    Gt(SimpleVersion),
    Lt(SimpleVersion),
    /// Not a version constraint at all: a tag, git ref, or other opaque
    /// spec that the Resolver must match structurally, not numerically.
    Opaque(String),
}

impl Constraint {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(rest) = raw.strip_prefix("^") {
            if let Some(v) = SimpleVersion::parse(rest) {
                return Constraint::Caret(v);
            }
        }
        if let Some(rest) = raw.strip_prefix('~') {
            if let Some(v) = SimpleVersion::parse(rest) {
                return Constraint::Tilde(v);
            }
        }
        if let Some(rest) = raw.strip_prefix(">=") {
            if let Some(v) = SimpleVersion::parse(rest.trim()) {
                return Constraint::Ge(v);
            }
        }
        if let Some(rest) = raw.strip_prefix("<=") {
            if let Some(v) = SimpleVersion::parse(rest.trim()) {
                return Constraint::Le(v);
            }
        }
        if let Some(rest) = raw.strip_prefix('>') {
            if let Some(v) = SimpleVersion::parse(rest.trim()) {
                return Constraint::Gt(v);
            }
        }
        if let Some(rest) = raw.strip_prefix('<') {
            if let Some(v) = SimpleVersion::parse(rest.trim()) {
                return Constraint::Lt(v);
            }
        }
        if let Some(rest) = raw.strip_prefix('=') {
            if let Some(v) = SimpleVersion::parse(rest.trim()) {
                return Constraint::Exact(v);
            }
        }
        if let Some(v) = SimpleVersion::parse(raw) {
            return Constraint::Exact(v);
        }
        Constraint::Opaque(raw.to_string())
    }

    /// Does `candidate` satisfy this constraint?
    pub fn matches(&self, candidate: &SimpleVersion) -> bool {
        match self {
            Constraint::Exact(v) => candidate == v,
            Constraint::Caret(v) => {
                let upper = if v.major == 0 {
                    SimpleVersion {
                        major: 0,
                        minor: v.minor + 1,
                        patch: 0,
                    }
                } else {
                    SimpleVersion {
                        major: v.major + 1,
                        minor: 0,
                        patch: 0,
                    }
                };
                candidate >= v && candidate < &upper
            }
            Constraint::Tilde(v) => {
                let upper = SimpleVersion {
                    major: v.major,
                    minor: v.minor + 1,
                    patch: 0,
                };
                candidate >= v && candidate < &upper
            }
            Constraint::Ge(v) => candidate >= v,
            Constraint::Le(v) => candidate <= v,
            Constraint::Gt(v) => candidate > v,
            Constraint::Lt(v) => candidate < v,
            Constraint::Opaque(_) => false,
        }
    }

    /// Picks the highest version in `candidates` that satisfies this
    /// constraint, per `spec.md §4.1` step 4.
    pub fn best_match<'a>(&self, candidates: impl Iterator<Item = &'a str>) -> Option<&'a str> {
        candidates
            .filter_map(|raw| SimpleVersion::parse(raw).map(|v| (raw, v)))
            .filter(|(_, v)| self.matches(v))
            .max_by_key(|(_, v)| *v)
            .map(|(raw, _)| raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caret_pins_major_for_nonzero() {
        let c = Constraint::parse("^1.2.3");
        assert!(c.matches(&SimpleVersion::parse("1.2.3").unwrap()));
        assert!(c.matches(&SimpleVersion::parse("1.9.0").unwrap()));
        assert!(!c.matches(&SimpleVersion::parse("2.0.0").unwrap()));
        assert!(!c.matches(&SimpleVersion::parse("1.2.2").unwrap()));
    }

    #[test]
    fn caret_pins_minor_for_major_zero() {
        let c = Constraint::parse("^0.2.3");
        assert!(c.matches(&SimpleVersion::parse("0.2.9").unwrap()));
        assert!(!c.matches(&SimpleVersion::parse("0.3.0").unwrap()));
    }

    #[test]
    fn tilde_pins_minor() {
        let c = Constraint::parse("~1.2.3");
        assert!(c.matches(&SimpleVersion::parse("1.2.9").unwrap()));
        assert!(!c.matches(&SimpleVersion::parse("1.3.0").unwrap()));
    }

    #[test]
    fn comparison_operators() {
        assert!(Constraint::parse(">=1.0.0").matches(&SimpleVersion::parse("1.0.0").unwrap()));
        assert!(!Constraint::parse(">1.0.0").matches(&SimpleVersion::parse("1.0.0").unwrap()));
        assert!(Constraint::parse("<=1.0.0").matches(&SimpleVersion::parse("1.0.0").unwrap()));
        assert!(Constraint::parse("<2.0.0").matches(&SimpleVersion::parse("1.9.9").unwrap()));
    }

    #[test]
    fn v_prefix_is_tolerated() {
        let v = SimpleVersion::parse("v1.2.3").unwrap();
        assert_eq!(v, SimpleVersion { major: 1, minor: 2, patch: 3 });
    }

    #[test]
    fn best_match_picks_highest_satisfying_version() {
        let c = Constraint::parse("^1.0.0");
        let candidates = ["1.0.0", "1.5.0", "2.0.0", "1.4.9"];
        assert_eq!(c.best_match(candidates.into_iter()), Some("1.5.0"));
    }

    #[test]
    fn opaque_spec_never_matches_numerically() {
        let c = Constraint::parse("main");
        assert!(!c.matches(&SimpleVersion::parse("1.0.0").unwrap()));
    }
}
