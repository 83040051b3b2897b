//! Path glob patterns.
//!
//! Patterns are absolute `/`-separated paths. Within a component `*`
//! matches any run of characters other than `/` and `?` matches exactly
//! one such character; everything else is literal.

use regex::Regex;

use crate::error::{TopoError, TopoResult};

/// A compiled path pattern.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    prefix: String,
    regex: Regex,
}

impl GlobPattern {
    pub fn compile(pattern: &str) -> TopoResult<Self> {
        let invalid = |reason: &str| TopoError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        let rest = pattern
            .strip_prefix('/')
            .ok_or_else(|| invalid("must be an absolute path"))?;
        if rest.is_empty() || rest.split('/').any(str::is_empty) {
            return Err(invalid("empty path component"));
        }

        let mut expr = String::from("^/");
        let mut literal = String::new();
        for ch in rest.chars() {
            match ch {
                '*' => {
                    expr.push_str(&regex::escape(&literal));
                    literal.clear();
                    expr.push_str("[^/]*");
                }
                '?' => {
                    expr.push_str(&regex::escape(&literal));
                    literal.clear();
                    expr.push_str("[^/]");
                }
                _ => literal.push(ch),
            }
        }
        expr.push_str(&regex::escape(&literal));
        expr.push('$');

        let regex = Regex::new(&expr).map_err(|e| invalid(&e.to_string()))?;
        let prefix = pattern
            .find(['*', '?'])
            .map_or(pattern, |idx| &pattern[..idx])
            .to_string();

        Ok(Self { prefix, regex })
    }

    /// Longest literal prefix; every match starts with it.
    pub fn literal_prefix(&self) -> &str {
        &self.prefix
    }

    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}
