//! Text → items.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::model::ConfigItem;

/// Why a line was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseIssue {
    MissingSeparator,
    AmbiguousSeparator,
}

impl fmt::Display for ParseIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseIssue::MissingSeparator => write!(f, "no '=' separator"),
            ParseIssue::AmbiguousSeparator => write!(f, "more than one '='"),
        }
    }
}

/// A malformed line. Non-fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseWarning {
    /// 1-based line number in the submitted text.
    pub line: usize,
    pub content: String,
    pub reason: ParseIssue,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {} [{}]", self.line, self.reason, self.content)
    }
}

/// Result of parsing: the valid items in source order plus skipped lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parsed {
    pub items: Vec<ConfigItem>,
    pub warnings: Vec<ParseWarning>,
}

/// Parse configuration text.
///
/// Only the last comment line before an item is attached to it. Blank and
/// malformed lines leave a pending comment in place.
pub fn parse(text: &str) -> Parsed {
    let mut parsed = Parsed::default();
    let mut pending: Option<String> = None;

    for (idx, raw) in text.split('\n').enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(comment) = line.strip_prefix('#') {
            let comment = comment.trim();
            pending = (!comment.is_empty()).then(|| comment.to_string());
            continue;
        }

        let reason = match line.matches('=').count() {
            0 => ParseIssue::MissingSeparator,
            1 => {
                if let Some((key, value)) = line.split_once('=') {
                    parsed.items.push(ConfigItem {
                        key: key.trim().to_string(),
                        value: value.trim().to_string(),
                        comment: pending.take(),
                    });
                }
                continue;
            }
            _ => ParseIssue::AmbiguousSeparator,
        };

        let warning = ParseWarning {
            line: idx + 1,
            content: line.to_string(),
            reason,
        };
        tracing::warn!(
            line = warning.line,
            content = %warning.content,
            reason = %warning.reason,
            "Skipping malformed config line"
        );
        parsed.warnings.push(warning);
    }

    parsed
}

/// Fold repeated keys into one item: the first occurrence keeps its position,
/// the last occurrence supplies value and comment.
pub fn collapse_duplicates(items: Vec<ConfigItem>) -> Vec<ConfigItem> {
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(items.len());
    let mut out: Vec<ConfigItem> = Vec::with_capacity(items.len());

    for item in items {
        match positions.get(&item.key) {
            Some(&pos) => out[pos] = item,
            None => {
                positions.insert(item.key.clone(), out.len());
                out.push(item);
            }
        }
    }
    out
}
