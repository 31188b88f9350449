//! Unified diff rendering for dry-run previews.

use similar::TextDiff;

/// A single rendered file diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub path: String,
    pub unified_diff: String,
}

impl FileDiff {
    pub fn is_empty(&self) -> bool {
        self.unified_diff.is_empty()
    }
}

/// Diff `old` against `new`; empty when they are identical.
pub fn unified(path: &str, old: &str, new: &str) -> FileDiff {
    if old == new {
        return FileDiff {
            path: path.to_string(),
            unified_diff: String::new(),
        };
    }
    let old_header = format!("a/{path}");
    let new_header = format!("b/{path}");
    let unified_diff = TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(3)
        .header(&old_header, &new_header)
        .to_string();
    FileDiff {
        path: path.to_string(),
        unified_diff,
    }
}
