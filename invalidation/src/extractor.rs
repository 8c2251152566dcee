//! Reference extraction for style and template sources.
//!
//! Each format gets one extractor, chosen when a pass is configured. The
//! closed [`ReferenceExtractor`] enum is what passes hold; both variants
//! implement [`ExtractReferences`].

use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use crate::error::DanglingReference;

/// `@import`, `@use` and `@forward`, one directive per line.
static STYLE_DIRECTIVE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*@(?:import|use|forward)\s+([^;\n]+)").ok());

/// Quoted names inside a style directive.
static QUOTED: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r#"["']([^"']+)["']"#).ok());

/// `{% extends "x" %}`, `{%- include 'x' -%}` and friends.
static TEMPLATE_DIRECTIVE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"\{%-?\s*(?:extends|include|import|from)\s+["']([^"']+)["']"#).ok()
});

/// Capability shared by every reference extractor.
pub trait ExtractReferences {
    /// Names referenced by `contents`, in directive order.
    fn extract(&self, contents: &str) -> Vec<String>;

    /// Resolve `name`, written in the file `from`, to a path relative to `root`.
    fn resolve(&self, root: &Path, from: &Path, name: &str) -> Result<PathBuf, DanglingReference>;
}

/// Style partial imports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleReferences {
    /// Extra directories searched after the importing file's own directory,
    /// relative to the scan root.
    #[serde(default)]
    pub load_paths: Vec<PathBuf>,
}

impl StyleReferences {
    /// Create a style extractor with no extra load paths.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a load path.
    pub fn with_load_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.load_paths.push(path.into());
        self
    }

    /// File names a partial reference may live under.
    fn candidates(name: &str) -> Vec<PathBuf> {
        let path = Path::new(name);
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let Some(file) = path.file_name().map(|f| f.to_string_lossy().into_owned()) else {
            return Vec::new();
        };

        if path.extension().is_some() {
            vec![dir.join(&file), dir.join(format!("_{file}"))]
        } else {
            vec![
                dir.join(format!("{file}.scss")),
                dir.join(format!("_{file}.scss")),
                dir.join(format!("{file}.sass")),
                dir.join(format!("_{file}.sass")),
                dir.join(&file).join("_index.scss"),
                dir.join(&file).join("index.scss"),
            ]
        }
    }

    /// Plain CSS imports and built-in modules are not partials.
    fn is_partial(name: &str) -> bool {
        !(name.ends_with(".css")
            || name.starts_with("http://")
            || name.starts_with("https://")
            || name.starts_with("//")
            || name.starts_with("url(")
            || name.starts_with("sass:"))
    }
}

impl ExtractReferences for StyleReferences {
    fn extract(&self, contents: &str) -> Vec<String> {
        let (Some(directive), Some(quoted)) = (STYLE_DIRECTIVE.as_ref(), QUOTED.as_ref()) else {
            return Vec::new();
        };

        directive
            .captures_iter(contents)
            .filter_map(|caps| caps.get(1))
            .flat_map(|args| {
                quoted
                    .captures_iter(args.as_str())
                    .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
                    .collect::<Vec<_>>()
            })
            .filter(|name| Self::is_partial(name))
            .collect()
    }

    fn resolve(&self, root: &Path, from: &Path, name: &str) -> Result<PathBuf, DanglingReference> {
        let own_dir = from.parent().map(Path::to_path_buf).unwrap_or_default();
        let bases = std::iter::once(own_dir).chain(self.load_paths.iter().cloned());

        for base in bases {
            for candidate in Self::candidates(name) {
                let relative = normalize_relative(&base.join(candidate));
                if root.join(&relative).is_file() {
                    return Ok(relative);
                }
            }
        }

        Err(DanglingReference {
            from: from.to_path_buf(),
            reference: name.to_string(),
        })
    }
}

/// Template `extends` / `include` tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateReferences {
    /// Ordered search paths relative to the scan root; the first match wins.
    /// An empty list searches the root itself.
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,
}

impl TemplateReferences {
    /// Create a template extractor with the given search paths.
    pub fn new<I, P>(search_paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            search_paths: search_paths.into_iter().map(Into::into).collect(),
        }
    }
}

impl ExtractReferences for TemplateReferences {
    fn extract(&self, contents: &str) -> Vec<String> {
        let Some(directive) = TEMPLATE_DIRECTIVE.as_ref() else {
            return Vec::new();
        };

        directive
            .captures_iter(contents)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
            .collect()
    }

    fn resolve(&self, root: &Path, from: &Path, name: &str) -> Result<PathBuf, DanglingReference> {
        let root_only = [PathBuf::new()];
        let search_paths = if self.search_paths.is_empty() {
            &root_only[..]
        } else {
            &self.search_paths[..]
        };

        search_paths
            .iter()
            .map(|dir| normalize_relative(&dir.join(name)))
            .find(|candidate| root.join(candidate).is_file())
            .ok_or_else(|| DanglingReference {
                from: from.to_path_buf(),
                reference: name.to_string(),
            })
    }
}

/// The extractor a pass is configured with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReferenceExtractor {
    Style(StyleReferences),
    Template(TemplateReferences),
}

impl ExtractReferences for ReferenceExtractor {
    fn extract(&self, contents: &str) -> Vec<String> {
        match self {
            Self::Style(style) => style.extract(contents),
            Self::Template(template) => template.extract(contents),
        }
    }

    fn resolve(&self, root: &Path, from: &Path, name: &str) -> Result<PathBuf, DanglingReference> {
        match self {
            Self::Style(style) => style.resolve(root, from, name),
            Self::Template(template) => template.resolve(root, from, name),
        }
    }
}

impl From<StyleReferences> for ReferenceExtractor {
    fn from(style: StyleReferences) -> Self {
        Self::Style(style)
    }
}

impl From<TemplateReferences> for ReferenceExtractor {
    fn from(template: TemplateReferences) -> Self {
        Self::Template(template)
    }
}

/// Lexically fold `.` and `..` so one file always has one graph key.
fn normalize_relative(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
