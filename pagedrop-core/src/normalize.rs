//! Canonical forms for slugs and section names.
//!
//! Two raw inputs that normalize to the same string address the same publish
//! target, so every path prefix and marker name goes through here.

use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::error::ValidationError;
use crate::types::{SectionName, Slug};

const SEPARATOR: char = '-';

/// Lowercase, strip accents, collapse non-alphanumeric runs to `-`, trim `-`.
pub fn normalize_slug(raw: &str) -> Result<Slug, ValidationError> {
    let normalized = fold(raw);
    if normalized.is_empty() {
        return Err(ValidationError::EmptySlug {
            raw: raw.to_string(),
        });
    }
    Ok(Slug::new_unchecked(normalized))
}

/// Slug rules with every separator removed (`"Hero Banner"` → `herobanner`).
pub fn normalize_section(raw: &str) -> Result<SectionName, ValidationError> {
    let normalized: String = fold(raw).chars().filter(|c| *c != SEPARATOR).collect();
    if normalized.is_empty() {
        return Err(ValidationError::EmptySection {
            raw: raw.to_string(),
        });
    }
    Ok(SectionName::new_unchecked(normalized))
}

fn fold(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_separator = false;
    for c in raw.nfkd().filter(|c| !is_combining_mark(*c)) {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !out.is_empty() {
                out.push(SEPARATOR);
            }
            pending_separator = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }
    out
}
