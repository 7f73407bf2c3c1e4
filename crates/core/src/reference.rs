//! Extraction of embedded resource references from stored content.
//!
//! An owning entity's content (a markdown body, an HTML fragment) names the
//! artifacts it renders. Extracting those names lets the set of linked files
//! follow the content exactly.

use crate::error::{Error, Result};
use regex::Regex;
use std::collections::HashMap;

/// Markdown image syntax: `![alt](target)`.
pub const MARKDOWN_IMAGE_PATTERN: &str = r"!\[.*?]\((.*?)\)";

/// HTML `img` tag `src` attribute.
pub const HTML_IMG_PATTERN: &str = r#"(?i)<img[^>]+src=["']([^"']+)["']"#;

/// Registry of reference patterns keyed by content syntax.
///
/// Every pattern must have at least one capture group; the first group is
/// the raw reference.
#[derive(Clone, Debug, Default)]
pub struct ExtractorRegistry {
    patterns: HashMap<String, Regex>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `markdown` and `html` patterns installed.
    pub fn with_defaults() -> Self {
        let mut patterns = HashMap::new();
        for (syntax, pattern) in [
            ("markdown", MARKDOWN_IMAGE_PATTERN),
            ("html", HTML_IMG_PATTERN),
        ] {
            if let Ok(regex) = Regex::new(pattern) {
                patterns.insert(syntax.to_string(), regex);
            }
        }
        Self { patterns }
    }

    /// Add or replace the pattern for a syntax.
    pub fn register(&mut self, syntax: impl Into<String>, pattern: &str) -> Result<()> {
        let syntax = syntax.into();
        let regex = Regex::new(pattern).map_err(|e| Error::InvalidPattern {
            syntax: syntax.clone(),
            reason: e.to_string(),
        })?;
        if regex.captures_len() < 2 {
            return Err(Error::InvalidPattern {
                syntax,
                reason: "pattern has no capture group".to_string(),
            });
        }
        self.patterns.insert(syntax, regex);
        Ok(())
    }

    pub fn supports(&self, syntax: &str) -> bool {
        self.patterns.contains_key(syntax)
    }

    /// Basenames of every reference in `content`, in order of appearance.
    ///
    /// Duplicates are kept.
    pub fn extract(&self, content: &str, syntax: &str) -> Result<Vec<String>> {
        let regex = self
            .patterns
            .get(syntax)
            .ok_or_else(|| Error::UnknownSyntax(syntax.to_string()))?;

        Ok(regex
            .captures_iter(content)
            .filter_map(|caps| caps.get(1))
            .filter_map(|m| reference_basename(m.as_str()))
            .collect())
    }
}

/// Reduce a reference target to the final segment of its path.
///
/// Handles absolute URLs, protocol-relative URLs, relative paths, query
/// strings, fragments and a trailing markdown title.
pub fn reference_basename(target: &str) -> Option<String> {
    let target = target.split_whitespace().next()?;
    let target = target.trim_matches(|c| c == '<' || c == '>');
    let end = target.find(['?', '#']).unwrap_or(target.len());
    let mut path = &target[..end];

    let after_authority = if let Some((_, rest)) = path.split_once("://") {
        Some(rest)
    } else {
        path.strip_prefix("//")
    };
    if let Some(rest) = after_authority {
        path = rest.find('/').map(|i| &rest[i..]).unwrap_or("");
    }

    let name = path.rsplit('/').next().unwrap_or("");
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name.to_string())
}
