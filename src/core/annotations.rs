//! Annotation extraction from leading comments.
//!
//! Annotations are comment tags attached to a declaration:
//! - `// @cloudfunction`
//! - `/** @warmup(rate=10, eventKey=ping) */`
//!
//! All leading comments of a node are joined with spaces and scanned in text
//! order. Names and parameter keys are case-insensitive and stored lowercase;
//! parameter values are kept as raw strings so each handler can apply its own
//! parsing and defaults.

use indexmap::IndexMap;
use regex::Regex;
use std::sync::LazyLock;
use swc_common::comments::Comment;

// Capture group 1: annotation name
// Capture group 2: parameter list (only when every entry is `key=value`)
static ANNOTATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"@(\w+)(?:\(\s*(\w+\s*=\s*[^\s,()]+\s*(?:,\s*\w+\s*=\s*[^\s,()]+\s*)*)?\))?",
    )
    .unwrap()
});

// Leading numeric prefix of a parameter value, so `256MB` reads as 256.
static INT_PREFIX_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[+-]?\d+").unwrap());
static FLOAT_PREFIX_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").unwrap()
});

/// A single parsed comment tag.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Annotation {
    pub name: String,
    pub params: IndexMap<String, String>,
}

impl Annotation {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_lowercase(),
            params: IndexMap::new(),
        }
    }

    /// Raw parameter value, keys are matched case-insensitively.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(&key.to_lowercase()).map(String::as_str)
    }

    /// Leading integer of a parameter, `None` when missing, invalid or not positive.
    ///
    /// Trailing text is ignored: `2.5` reads as 2 and `256MB` as 256.
    pub fn positive_int(&self, key: &str) -> Option<u32> {
        self.param(key)
            .and_then(|value| INT_PREFIX_REGEX.find(value))
            .and_then(|m| m.as_str().trim().parse::<u32>().ok())
            .filter(|value| *value > 0)
    }

    /// Leading number of a parameter, `None` when missing, invalid or not positive.
    pub fn positive_float(&self, key: &str) -> Option<f64> {
        self.param(key)
            .and_then(|value| FLOAT_PREFIX_REGEX.find(value))
            .and_then(|m| m.as_str().trim().parse::<f64>().ok())
            .filter(|value| value.is_finite() && *value > 0.0)
    }
}

/// Extract annotations from comment text.
///
/// Tokens that do not match `@name` or `@name(key=value, ...)` are skipped.
pub fn parse_annotations(text: &str) -> Vec<Annotation> {
    ANNOTATION_REGEX
        .captures_iter(text)
        .map(|captures| {
            let name = captures
                .get(1)
                .map_or("", |m| m.as_str())
                .to_lowercase();
            let params = captures
                .get(2)
                .map(|m| parse_params(m.as_str()))
                .unwrap_or_default();
            Annotation { name, params }
        })
        .collect()
}

/// Extract annotations from a node's leading comments.
pub fn extract_annotations(comments: &[Comment]) -> Vec<Annotation> {
    let text = comments
        .iter()
        .map(|comment| &*comment.text)
        .collect::<Vec<_>>()
        .join(" ");
    parse_annotations(&text)
}

fn parse_params(raw: &str) -> IndexMap<String, String> {
    raw.split(',')
        .filter_map(|piece| piece.split_once('='))
        .map(|(key, value)| (key.trim().to_lowercase(), value.trim().to_string()))
        .collect()
}
