//! Marker-delimited section patching.
//!
//! A section is the text between `<!-- SECTION:{name}:start -->` and
//! `<!-- SECTION:{name}:end -->`. Patching replaces only that interior; the
//! markers and every byte outside them are kept verbatim. The replacement is
//! never parsed, so malformed markup in it cannot spill past the markers.
//!
//! Only the first start marker and the first end marker following it are
//! considered. A document repeating a marker pair is patched at its first
//! occurrence; end markers ahead of the first start marker are ignored.

use tokio::time::Instant;

use pagedrop_core::{SectionName, Slug};

use crate::diff::{self, FileDiff};
use crate::error::{store_err, PublishError};
use crate::writer::{VersionedWriter, WriteResult};

/// Replace the interior of `section` in `document`.
///
/// Returns `None` if the start marker is missing or no end marker follows
/// the first start marker.
pub fn splice_section(document: &str, section: &SectionName, interior: &str) -> Option<String> {
    let start_marker = section.start_marker();
    let end_marker = section.end_marker();

    let start = document.find(&start_marker)?;
    let interior_start = start + start_marker.len();
    let end = document[interior_start..]
        .find(&end_marker)
        .map(|i| interior_start + i)?;

    let mut out = String::with_capacity(document.len() - (end - interior_start) + interior.len());
    out.push_str(&document[..interior_start]);
    out.push_str(interior);
    out.push_str(&document[end..]);
    Some(out)
}

/// Commit message for a section patch.
pub fn patch_message(slug: &Slug, section: &SectionName) -> String {
    format!("Update section {section} of {slug}")
}

/// Patches sections of a site's primary document (`{slug}/index.html`).
#[derive(Clone)]
pub struct SectionPatcher {
    writer: VersionedWriter,
    deadline: Option<Instant>,
}

impl SectionPatcher {
    pub fn new(writer: VersionedWriter) -> Self {
        Self {
            writer,
            deadline: None,
        }
    }

    /// Give up before reading, or before a retry writes, once `deadline` has passed.
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    fn check_deadline(&self, slug: &Slug) -> Result<(), PublishError> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                tracing::warn!("deadline reached patching {slug}");
                Err(PublishError::DeadlineExceeded {
                    slug: slug.clone(),
                    committed: Vec::new(),
                    remaining: 1,
                })
            }
            _ => Ok(()),
        }
    }

    /// Replace the interior of `section` and write the document back.
    ///
    /// The splice is recomputed against the freshly read document on every
    /// conflict retry. Missing document or markers fail without writing, as
    /// does a deadline that passes before an attempt's write.
    pub async fn patch(
        &self,
        slug: &Slug,
        section: &SectionName,
        interior: &str,
    ) -> Result<WriteResult, PublishError> {
        self.check_deadline(slug)?;
        let path = slug.index_path();
        let message = patch_message(slug, section);

        self.writer
            .upsert_with(&path, &message, |current| {
                self.check_deadline(slug)?;
                let document = as_document(&path, current)?;
                splice_section(document, section, interior)
                    .map(String::into_bytes)
                    .ok_or_else(|| section_not_found(&path, section))
            })
            .await
    }

    /// Show what [`patch`](Self::patch) would change, without writing.
    pub async fn preview(
        &self,
        slug: &Slug,
        section: &SectionName,
        interior: &str,
    ) -> Result<FileDiff, PublishError> {
        let path = slug.index_path();
        let current = self
            .writer
            .store()
            .read(&path)
            .await
            .map_err(|e| store_err(&path, e))?;
        let document = as_document(&path, current.content.as_deref())?;
        let patched =
            splice_section(document, section, interior).ok_or_else(|| section_not_found(&path, section))?;
        Ok(diff::unified(&path, document, &patched))
    }
}

fn as_document<'a>(path: &str, current: Option<&'a [u8]>) -> Result<&'a str, PublishError> {
    let bytes = current.ok_or_else(|| PublishError::NotFound {
        path: path.to_string(),
    })?;
    std::str::from_utf8(bytes).map_err(|_| PublishError::NotUtf8 {
        path: path.to_string(),
    })
}

fn section_not_found(path: &str, section: &SectionName) -> PublishError {
    PublishError::SectionNotFound {
        path: path.to_string(),
        section: section.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagedrop_core::normalize_section;

    fn x() -> SectionName {
        normalize_section("x").unwrap()
    }

    #[test]
    fn splice_preserves_surrounding_bytes() {
        let doc = "A<!-- SECTION:x:start -->B<!-- SECTION:x:end -->C";
        assert_eq!(
            splice_section(doc, &x(), "D").unwrap(),
            "A<!-- SECTION:x:start -->D<!-- SECTION:x:end -->C"
        );
    }

    #[test]
    fn splice_into_empty_interior() {
        let doc = "<!-- SECTION:x:start --><!-- SECTION:x:end -->";
        assert_eq!(
            splice_section(doc, &x(), "\n<p>new</p>\n").unwrap(),
            "<!-- SECTION:x:start -->\n<p>new</p>\n<!-- SECTION:x:end -->"
        );
    }

    #[test]
    fn splice_can_empty_a_section() {
        let doc = "a<!-- SECTION:x:start -->old<!-- SECTION:x:end -->b";
        assert_eq!(
            splice_section(doc, &x(), "").unwrap(),
            "a<!-- SECTION:x:start --><!-- SECTION:x:end -->b"
        );
    }

    #[test]
    fn splice_requires_both_markers() {
        assert!(splice_section("A<!-- SECTION:x:start -->B", &x(), "D").is_none());
        assert!(splice_section("B<!-- SECTION:x:end -->C", &x(), "D").is_none());
        assert!(splice_section("no markers", &x(), "D").is_none());
    }

    #[test]
    fn splice_rejects_end_before_start() {
        let doc = "<!-- SECTION:x:end -->B<!-- SECTION:x:start -->";
        assert!(splice_section(doc, &x(), "D").is_none());
    }

    #[test]
    fn splice_skips_stray_end_marker_before_start() {
        let doc = "<!-- SECTION:x:end -->A<!-- SECTION:x:start -->B<!-- SECTION:x:end -->C";
        assert_eq!(
            splice_section(doc, &x(), "D").unwrap(),
            "<!-- SECTION:x:end -->A<!-- SECTION:x:start -->D<!-- SECTION:x:end -->C"
        );
    }

    #[test]
    fn splice_leaves_other_sections_alone() {
        let doc = concat!(
            "<!-- SECTION:hero:start -->H<!-- SECTION:hero:end -->",
            "<!-- SECTION:x:start -->B<!-- SECTION:x:end -->",
            "<!-- SECTION:footer:start -->F<!-- SECTION:footer:end -->",
        );
        let out = splice_section(doc, &x(), "<div>unclosed").unwrap();
        assert_eq!(
            out,
            concat!(
                "<!-- SECTION:hero:start -->H<!-- SECTION:hero:end -->",
                "<!-- SECTION:x:start --><div>unclosed<!-- SECTION:x:end -->",
                "<!-- SECTION:footer:start -->F<!-- SECTION:footer:end -->",
            )
        );
    }

    #[test]
    fn splice_uses_first_pair_only() {
        let doc = "<!-- SECTION:x:start -->1<!-- SECTION:x:end --><!-- SECTION:x:start -->2<!-- SECTION:x:end -->";
        assert_eq!(
            splice_section(doc, &x(), "N").unwrap(),
            "<!-- SECTION:x:start -->N<!-- SECTION:x:end --><!-- SECTION:x:start -->2<!-- SECTION:x:end -->"
        );
    }

    #[test]
    fn similar_names_do_not_match() {
        let doc = "<!-- SECTION:xy:start -->B<!-- SECTION:xy:end -->";
        assert!(splice_section(doc, &x(), "D").is_none());
    }

    #[test]
    fn message_names_slug_and_section() {
        let slug = pagedrop_core::normalize_slug("Mon Café").unwrap();
        let section = normalize_section("Hero Banner").unwrap();
        assert_eq!(patch_message(&slug, &section), "Update section herobanner of mon-cafe");
    }
}
