//! Exclude policies for source and output trees.
//!
//! A policy is an explicit value: callers pass it into every scan or collect
//! call, there is no process-wide default table.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Which match kinds a flat exclude list is tested with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchKinds {
    /// Pattern is a substring of the relative path.
    #[serde(default)]
    pub contains: bool,

    /// Pattern equals the relative path or the file name.
    #[serde(default)]
    pub exact: bool,

    /// Relative path or file name starts with the pattern.
    #[serde(default)]
    pub prefix: bool,

    /// Relative path or file name ends with the pattern.
    #[serde(default)]
    pub suffix: bool,
}

impl MatchKinds {
    /// No match kind enabled; a flat list under these kinds excludes nothing.
    pub const NONE: Self = Self {
        contains: false,
        exact: false,
        prefix: false,
        suffix: false,
    };

    /// Every match kind enabled.
    pub const ALL: Self = Self {
        contains: true,
        exact: true,
        prefix: true,
        suffix: true,
    };
}

impl Default for MatchKinds {
    fn default() -> Self {
        Self {
            exact: true,
            prefix: true,
            ..Self::NONE
        }
    }
}

/// Exclude patterns as they appear in configuration.
///
/// Either a flat list, interpreted through a [`MatchKinds`] set supplied by
/// the caller, or a table naming one list per match kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExcludeSpec {
    /// A flat list of patterns.
    List(Vec<String>),

    /// One list per match kind.
    ByKind {
        #[serde(default)]
        contains: Vec<String>,
        #[serde(default)]
        exact: Vec<String>,
        #[serde(default)]
        prefix: Vec<String>,
        #[serde(default)]
        suffix: Vec<String>,
    },
}

impl Default for ExcludeSpec {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

/// A resolved exclude policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExcludePolicy {
    contains: Vec<String>,
    exact: Vec<String>,
    prefix: Vec<String>,
    suffix: Vec<String>,
}

impl ExcludePolicy {
    /// A policy that excludes nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Build a policy from a flat list tested with the given match kinds.
    pub fn from_list<I, S>(patterns: I, kinds: MatchKinds) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        let pick = |enabled: bool| if enabled { patterns.clone() } else { Vec::new() };

        Self {
            contains: pick(kinds.contains),
            exact: pick(kinds.exact),
            prefix: pick(kinds.prefix),
            suffix: pick(kinds.suffix),
        }
    }

    /// Resolve a configured spec; `kinds` only applies to flat lists.
    pub fn from_spec(spec: &ExcludeSpec, kinds: MatchKinds) -> Self {
        match spec {
            ExcludeSpec::List(patterns) => Self::from_list(patterns.iter().cloned(), kinds),
            ExcludeSpec::ByKind {
                contains,
                exact,
                prefix,
                suffix,
            } => Self {
                contains: contains.clone(),
                exact: exact.clone(),
                prefix: prefix.clone(),
                suffix: suffix.clone(),
            },
        }
    }

    /// Add a substring pattern.
    pub fn contains(mut self, pattern: impl Into<String>) -> Self {
        self.contains.push(pattern.into());
        self
    }

    /// Add an exact pattern.
    pub fn exact(mut self, pattern: impl Into<String>) -> Self {
        self.exact.push(pattern.into());
        self
    }

    /// Add a prefix pattern.
    pub fn prefix(mut self, pattern: impl Into<String>) -> Self {
        self.prefix.push(pattern.into());
        self
    }

    /// Add a suffix pattern.
    pub fn suffix(mut self, pattern: impl Into<String>) -> Self {
        self.suffix.push(pattern.into());
        self
    }

    /// Whether the policy has no patterns at all.
    pub fn is_empty(&self) -> bool {
        self.contains.is_empty()
            && self.exact.is_empty()
            && self.prefix.is_empty()
            && self.suffix.is_empty()
    }

    /// Check whether a path, relative to its scan root, is excluded.
    pub fn is_excluded(&self, relative: &Path) -> bool {
        let rel = normalize(relative);
        let name = relative
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.contains.iter().any(|p| rel.contains(p.as_str()))
            || self.exact.iter().any(|p| rel == *p || name == *p)
            || self
                .prefix
                .iter()
                .any(|p| rel.starts_with(p.as_str()) || name.starts_with(p.as_str()))
            || self
                .suffix
                .iter()
                .any(|p| rel.ends_with(p.as_str()) || name.ends_with(p.as_str()))
    }
}

/// Forward-slash rendering of a relative path, independent of platform.
fn normalize(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_kinds_are_exact_and_prefix() {
        let policy = ExcludePolicy::from_list(["_", "drafts"], MatchKinds::default());

        assert!(policy.is_excluded(Path::new("_vars.scss")));
        assert!(policy.is_excluded(Path::new("partials/_mixins.scss")));
        assert!(policy.is_excluded(Path::new("drafts/post.html")));
        assert!(!policy.is_excluded(Path::new("posts/drafts.html")));
        assert!(!policy.is_excluded(Path::new("main.scss")));
    }

    #[test]
    fn test_contains_and_suffix() {
        let policy = ExcludePolicy::none().contains("vendor/").suffix(".min.js");

        assert!(policy.is_excluded(Path::new("lib/vendor/jquery.js")));
        assert!(policy.is_excluded(Path::new("app.min.js")));
        assert!(!policy.is_excluded(Path::new("app.js")));
    }

    #[test]
    fn test_flat_list_with_no_kinds_excludes_nothing() {
        let policy = ExcludePolicy::from_list(["a.html"], MatchKinds::NONE);
        assert!(policy.is_empty());
        assert!(!policy.is_excluded(Path::new("a.html")));
    }

    #[test]
    fn test_spec_parses_both_shapes() {
        let flat: ExcludeSpec = serde_json::from_str(r#"["_", "tmp"]"#).unwrap();
        assert_eq!(flat, ExcludeSpec::List(vec!["_".into(), "tmp".into()]));

        let by_kind: ExcludeSpec = serde_json::from_str(r#"{"suffix": [".bak"]}"#).unwrap();
        let policy = ExcludePolicy::from_spec(&by_kind, MatchKinds::ALL);
        assert!(policy.is_excluded(Path::new("page.html.bak")));
        assert!(!policy.is_excluded(Path::new("page.html")));
    }

    #[test]
    fn test_explicit_kinds_table_defaults_unset_fields_off() {
        let kinds: MatchKinds = serde_json::from_str(r#"{"suffix": true}"#).unwrap();
        assert_eq!(
            kinds,
            MatchKinds {
                suffix: true,
                ..MatchKinds::NONE
            }
        );
    }
}
