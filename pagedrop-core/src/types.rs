//! Domain types for publishing into a versioned remote store.
//!
//! `Slug` and `SectionName` can only be obtained through
//! [`crate::normalize`], so holding one means the identifier is already in
//! canonical form.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A normalized publish identifier; also the path prefix of a site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Slug(String);

impl Slug {
    pub(crate) fn new_unchecked(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `{slug}/{relative}` after checking that `relative` stays inside the prefix.
    pub fn join(&self, relative: &str) -> Result<String, ValidationError> {
        validate_relative_path(relative)?;
        Ok(format!("{}/{}", self.0, relative))
    }

    /// Path of the primary document (`{slug}/index.html`).
    pub fn index_path(&self) -> String {
        format!("{}/{}", self.0, INDEX_FILE)
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A normalized section identifier: slug rules with separators removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SectionName(String);

impl SectionName {
    pub(crate) fn new_unchecked(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `<!-- SECTION:{name}:start -->`
    pub fn start_marker(&self) -> String {
        format!("<!-- SECTION:{}:start -->", self.0)
    }

    /// `<!-- SECTION:{name}:end -->`
    pub fn end_marker(&self) -> String {
        format!("<!-- SECTION:{}:end -->", self.0)
    }
}

impl fmt::Display for SectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque revision identifier handed out by the store.
///
/// Never fabricated by callers: it comes from a successful read or write.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionToken(pub String);

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for VersionToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VersionToken {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Remote files
// ---------------------------------------------------------------------------

/// Result of reading one path from the store.
///
/// A missing path is represented by `content == None && token == None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub path: String,
    pub content: Option<Vec<u8>>,
    pub token: Option<VersionToken>,
}

impl RemoteFile {
    pub fn missing(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: None,
            token: None,
        }
    }

    pub fn present(path: impl Into<String>, content: Vec<u8>, token: VersionToken) -> Self {
        Self {
            path: path.into(),
            content: Some(content),
            token: Some(token),
        }
    }

    pub fn exists(&self) -> bool {
        self.token.is_some()
    }

    /// Content as UTF-8 text, if present and valid.
    pub fn text(&self) -> Option<&str> {
        self.content
            .as_deref()
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
    }
}

// ---------------------------------------------------------------------------
// Publish units
// ---------------------------------------------------------------------------

pub const INDEX_FILE: &str = "index.html";
pub const STYLES_FILE: &str = "styles/main.css";
pub const SCRIPT_FILE: &str = "js/main.js";
pub const README_FILE: &str = "README.txt";

/// One file of a publish unit, addressed relative to the slug prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub relative_path: String,
    pub content: Vec<u8>,
}

/// The ordered set of files making up one site deployment.
///
/// Ephemeral: built per request and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishUnit {
    pub slug: Slug,
    files: Vec<FileEntry>,
}

impl PublishUnit {
    pub fn new(slug: Slug) -> Self {
        Self {
            slug,
            files: Vec::new(),
        }
    }

    /// Append a file; order of calls is the order of writes.
    pub fn push(
        &mut self,
        relative_path: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Result<(), ValidationError> {
        let relative_path = relative_path.into();
        validate_relative_path(&relative_path)?;
        if self.files.iter().any(|f| f.relative_path == relative_path) {
            return Err(ValidationError::InvalidPath(relative_path));
        }
        self.files.push(FileEntry {
            relative_path,
            content: content.into(),
        });
        Ok(())
    }

    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    pub fn into_files(self) -> (Slug, Vec<FileEntry>) {
        (self.slug, self.files)
    }
}

fn validate_relative_path(relative: &str) -> Result<(), ValidationError> {
    let bad = relative.is_empty()
        || relative.starts_with('/')
        || relative.contains('\\')
        || relative
            .split('/')
            .any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if bad {
        return Err(ValidationError::InvalidPath(relative.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn slug(s: &str) -> Slug {
        Slug::new_unchecked(s.to_string())
    }

    #[test]
    fn markers_use_literal_format() {
        let name = SectionName::new_unchecked("hero".into());
        assert_eq!(name.start_marker(), "<!-- SECTION:hero:start -->");
        assert_eq!(name.end_marker(), "<!-- SECTION:hero:end -->");
    }

    #[test]
    fn join_prefixes_slug() {
        assert_eq!(slug("mon-cafe").join("styles/main.css").unwrap(), "mon-cafe/styles/main.css");
        assert_eq!(slug("mon-cafe").index_path(), "mon-cafe/index.html");
    }

    #[test]
    fn join_rejects_escaping_paths() {
        for bad in ["", "/etc/passwd", "../other/index.html", "a//b", "a/./b", "a\\b"] {
            assert!(
                matches!(slug("s").join(bad), Err(ValidationError::InvalidPath(_))),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn push_keeps_order_and_rejects_duplicates() {
        let mut unit = PublishUnit::new(slug("site"));
        unit.push(INDEX_FILE, "<h1>hi</h1>").unwrap();
        unit.push(STYLES_FILE, "body{}").unwrap();
        let err = unit.push(INDEX_FILE, "again").unwrap_err();
        assert_eq!(err, ValidationError::InvalidPath(INDEX_FILE.into()));

        let paths: Vec<_> = unit.files().iter().map(|f| f.relative_path.as_str()).collect();
        assert_eq!(paths, vec![INDEX_FILE, STYLES_FILE]);
    }

    #[test]
    fn remote_file_missing_and_present() {
        let missing = RemoteFile::missing("a/index.html");
        assert!(!missing.exists());
        assert!(missing.text().is_none());

        let present = RemoteFile::present("a/index.html", b"hi".to_vec(), "t1".into());
        assert!(present.exists());
        assert_eq!(present.text(), Some("hi"));
    }
}
