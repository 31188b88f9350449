//! [`RemoteFileStore`] over a Git-hosting contents API.
//!
//! | Operation | Request                                            | Outcome                     |
//! |-----------|----------------------------------------------------|-----------------------------|
//! | read      | `GET  {api}/repos/{owner}/{repo}/contents/{path}?ref={branch}` | 200 file, 404 absent |
//! | write     | `PUT  {api}/repos/{owner}/{repo}/contents/{path}` `{message, content, sha?, branch}` | 200/201 ok, 409 conflict |
//!
//! The blob `sha` returned by the API is the version token.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};

use pagedrop_core::{RemoteFile, StoreConfig, VersionToken};

use crate::error::StoreError;
use crate::store::{RemoteFileStore, WriteRequest};

const USER_AGENT: &str = concat!("pagedrop/", env!("CARGO_PKG_VERSION"));
const API_ACCEPT: &str = "application/vnd.github+json";
const MAX_ERROR_BODY: usize = 200;

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    sha: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Serialize)]
struct PutBody<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    branch: &'a str,
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    content: PutContent,
}

#[derive(Debug, Deserialize)]
struct PutContent {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: String,
}

/// Contents-API client bound to one `owner/repo@branch`.
pub struct GitHubContentsStore {
    client: Client,
    base: Url,
    owner: String,
    repo: String,
    branch: String,
}

impl GitHubContentsStore {
    /// Build a client from resolved configuration.
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token.expose()))
            .map_err(|_| StoreError::Config("token contains characters not allowed in a header".into()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static(API_ACCEPT));

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| StoreError::Config(format!("cannot build HTTP client: {e}")))?;

        Self::with_client(client, config)
    }

    /// Build with a caller-supplied reqwest client (headers are the caller's job).
    pub fn with_client(client: Client, config: &StoreConfig) -> Result<Self, StoreError> {
        let base = Url::parse(&config.api_base)
            .map_err(|e| StoreError::Config(format!("invalid api_base '{}': {e}", config.api_base)))?;
        if base.cannot_be_a_base() {
            return Err(StoreError::Config(format!(
                "api_base '{}' cannot be used as a base URL",
                config.api_base
            )));
        }
        Ok(Self {
            client,
            base,
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            branch: config.branch.clone(),
        })
    }

    /// `{api}/repos/{owner}/{repo}/contents/{path}` with every segment escaped.
    pub fn contents_url(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["repos", self.owner.as_str(), self.repo.as_str(), "contents"])
                .extend(path.split('/').filter(|s| !s.is_empty()));
        }
        url
    }
}

#[async_trait]
impl RemoteFileStore for GitHubContentsStore {
    async fn read(&self, path: &str) -> Result<RemoteFile, StoreError> {
        let mut url = self.contents_url(path);
        url.query_pairs_mut().append_pair("ref", &self.branch);

        tracing::debug!("GET {}", url.path());
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| StoreError::transport(e.status().map(|s| s.as_u16()), e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(RemoteFile::missing(path));
        }
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::transport(Some(status.as_u16()), e.to_string()))?;
        if !status.is_success() {
            return Err(classify_failure(path, status.as_u16(), &body));
        }

        let parsed: ContentsResponse = serde_json::from_str(&body).map_err(|e| StoreError::Decode {
            path: path.to_string(),
            message: format!("unexpected contents payload (is the path a directory?): {e}"),
        })?;
        let content = decode_content(path, &parsed)?;
        Ok(RemoteFile::present(path, content, VersionToken(parsed.sha)))
    }

    async fn write(&self, req: &WriteRequest<'_>) -> Result<VersionToken, StoreError> {
        let body = PutBody {
            message: req.message,
            content: STANDARD.encode(req.content),
            sha: req.expected.map(|t| t.0.as_str()),
            branch: &self.branch,
        };

        let url = self.contents_url(req.path);
        tracing::debug!("PUT {} (sha: {:?})", url.path(), body.sha);
        let response = self
            .client
            .put(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::transport(e.status().map(|s| s.as_u16()), e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| StoreError::transport(Some(status.as_u16()), e.to_string()))?;
        if !status.is_success() {
            return Err(classify_failure(req.path, status.as_u16(), &text));
        }

        let parsed: PutResponse = serde_json::from_str(&text).map_err(|e| StoreError::Decode {
            path: req.path.to_string(),
            message: format!("unexpected write response: {e}"),
        })?;
        Ok(VersionToken(parsed.content.sha))
    }
}

/// Map a non-success response to a [`StoreError`].
///
/// 409 is a version mismatch. 422 mentioning `sha` is the API's way of saying
/// a token was required (file now exists) or did not match; both are races.
pub fn classify_failure(path: &str, status: u16, body: &str) -> StoreError {
    let message = serde_json::from_str::<ApiMessage>(body)
        .map(|m| m.message)
        .unwrap_or_else(|_| body.chars().take(MAX_ERROR_BODY).collect());

    match status {
        409 => StoreError::Conflict {
            path: path.to_string(),
        },
        422 if message.to_ascii_lowercase().contains("sha") => StoreError::Conflict {
            path: path.to_string(),
        },
        _ => StoreError::Transport {
            status: Some(status),
            message,
        },
    }
}

fn decode_content(path: &str, parsed: &ContentsResponse) -> Result<Vec<u8>, StoreError> {
    match parsed.encoding.as_deref() {
        Some("base64") | None => {}
        Some(other) => {
            return Err(StoreError::Decode {
                path: path.to_string(),
                message: format!("unsupported encoding '{other}' (file too large for the contents API?)"),
            })
        }
    }
    let raw = parsed.content.as_deref().unwrap_or_default();
    let compact: String = raw.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD.decode(compact).map_err(|e| StoreError::Decode {
        path: path.to_string(),
        message: format!("invalid base64 content: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagedrop_core::{RetrySettings, Secret};

    fn config(api_base: &str) -> StoreConfig {
        StoreConfig {
            api_base: api_base.to_string(),
            owner: "acme".into(),
            repo: "sites".into(),
            branch: "main".into(),
            token: Secret::new("ghp_test"),
            retry: RetrySettings::default(),
        }
    }

    #[test]
    fn contents_url_escapes_segments() {
        let store = GitHubContentsStore::new(&config("https://api.github.com")).unwrap();
        let url = store.contents_url("mon-cafe/styles/main file.css");
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/acme/sites/contents/mon-cafe/styles/main%20file.css"
        );
    }

    #[test]
    fn contents_url_keeps_enterprise_prefix() {
        let store = GitHubContentsStore::new(&config("https://ghe.example.com/api/v3")).unwrap();
        let url = store.contents_url("a/index.html");
        assert_eq!(
            url.as_str(),
            "https://ghe.example.com/api/v3/repos/acme/sites/contents/a/index.html"
        );
    }

    #[test]
    fn token_with_newline_is_a_config_error_without_echo() {
        let mut cfg = config("https://api.github.com");
        cfg.token = Secret::new("bad\ntoken");
        let err = GitHubContentsStore::new(&cfg).err().expect("must fail");
        assert!(matches!(err, StoreError::Config(_)));
        assert!(!err.to_string().contains("bad\ntoken"));
    }

    #[test]
    fn classify_409_as_conflict() {
        let err = classify_failure("a/index.html", 409, r#"{"message":"a/index.html does not match"}"#);
        assert_eq!(err, StoreError::Conflict { path: "a/index.html".into() });
    }

    #[test]
    fn classify_422_sha_as_conflict() {
        let err = classify_failure("a", 422, r#"{"message":"Invalid request.\n\n\"sha\" wasn't supplied."}"#);
        assert!(err.is_conflict());
    }

    #[test]
    fn classify_other_422_as_transport() {
        let err = classify_failure("a", 422, r#"{"message":"path contains a malformed path component"}"#);
        assert_eq!(
            err,
            StoreError::Transport {
                status: Some(422),
                message: "path contains a malformed path component".into()
            }
        );
    }

    #[test]
    fn classify_non_json_body_truncates() {
        let body = "x".repeat(1000);
        match classify_failure("a", 502, &body) {
            StoreError::Transport { status, message } => {
                assert_eq!(status, Some(502));
                assert_eq!(message.len(), MAX_ERROR_BODY);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn decode_strips_line_breaks() {
        let parsed = ContentsResponse {
            sha: "abc".into(),
            content: Some("PGgxPmhp\nPC9oMT4=\n".into()),
            encoding: Some("base64".into()),
        };
        assert_eq!(decode_content("a", &parsed).unwrap(), b"<h1>hi</h1>");
    }

    #[test]
    fn decode_rejects_unsupported_encoding() {
        let parsed = ContentsResponse {
            sha: "abc".into(),
            content: Some(String::new()),
            encoding: Some("none".into()),
        };
        assert!(matches!(decode_content("a", &parsed), Err(StoreError::Decode { .. })));
    }

    #[test]
    fn put_body_omits_sha_for_create() {
        let body = PutBody {
            message: "Publish a: index.html",
            content: STANDARD.encode(b"hi"),
            sha: None,
            branch: "main",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("sha").is_none());
        assert_eq!(json["content"], "aGk=");
        assert_eq!(json["branch"], "main");
    }
}
