//! Assembly of a site's publish unit from validated request fields.
//!
//! | Field  | Output path        | Required |
//! |--------|--------------------|----------|
//! | `html` | `index.html`       | yes      |
//! | `css`  | `styles/main.css`  | no       |
//! | `js`   | `js/main.js`       | no       |
//! | (none) | `README.txt`       | generated, always last |

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tera::{Context, Tera};

use pagedrop_core::{
    normalize_slug,
    types::{INDEX_FILE, README_FILE, SCRIPT_FILE, STYLES_FILE},
    PublishUnit, Slug, ValidationError,
};

use crate::error::PublishError;

const README_TEMPLATE: &str = include_str!("templates/readme.txt.tera");

/// Request fields as handed over by the request validator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteRequest {
    pub slug: String,
    pub html: Option<String>,
    pub css: Option<String>,
    pub js: Option<String>,
}

#[derive(Debug, Serialize)]
struct ReadmeContext<'a> {
    slug: &'a str,
    underline: String,
    published_at: String,
    files: Vec<&'a str>,
}

/// Build the ordered unit for `request`, appending a generated README.
pub fn build_unit(request: &SiteRequest, published_at: DateTime<Utc>) -> Result<PublishUnit, PublishError> {
    let slug = normalize_slug(&request.slug)?;
    let html = non_blank(request.html.as_deref()).ok_or(ValidationError::MissingContent("html"))?;

    let mut unit = PublishUnit::new(slug);
    unit.push(INDEX_FILE, html)?;
    if let Some(css) = non_blank(request.css.as_deref()) {
        unit.push(STYLES_FILE, css)?;
    }
    if let Some(js) = non_blank(request.js.as_deref()) {
        unit.push(SCRIPT_FILE, js)?;
    }

    let mut listed: Vec<&str> = unit.files().iter().map(|f| f.relative_path.as_str()).collect();
    listed.push(README_FILE);
    let readme = render_readme(&unit.slug, &listed, published_at)?;
    unit.push(README_FILE, readme)?;
    Ok(unit)
}

/// Render `README.txt` for a site.
pub fn render_readme(slug: &Slug, files: &[&str], published_at: DateTime<Utc>) -> Result<String, PublishError> {
    let ctx = ReadmeContext {
        slug: slug.as_str(),
        underline: "=".repeat(slug.as_str().len()),
        published_at: published_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        files: files.to_vec(),
    };
    let context = Context::from_serialize(&ctx)?;
    Ok(Tera::one_off(README_TEMPLATE, &context, false)?)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
