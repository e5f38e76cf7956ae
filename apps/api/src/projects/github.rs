//! Minimal GitHub REST client: repository metadata is fetched once when a
//! project is registered and stored alongside it.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum GithubError {
    #[error("Not a GitHub repository URL: {0}")]
    InvalidUrl(String),

    #[error("Repository {0} not found")]
    RepoNotFound(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GitHub API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepoMetadata {
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub stargazers_count: i32,
    #[serde(default)]
    pub forks_count: i32,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
}

/// Extracts `(owner, repo)` from a GitHub repository URL.
///
/// Accepts `https://github.com/o/r`, `http://`, `www.`, a trailing `.git` or
/// slash, and deeper paths such as `/tree/main`.
pub fn parse_repo_url(url: &str) -> Result<(String, String), GithubError> {
    let invalid = || GithubError::InvalidUrl(url.to_string());
    let trimmed = url.trim();
    let rest = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    let rest = rest.strip_prefix("www.").unwrap_or(rest);
    let path = rest.strip_prefix("github.com/").ok_or_else(invalid)?;

    let mut segments = path.split('/').filter(|s| !s.is_empty());
    let owner = segments.next().ok_or_else(invalid)?;
    let repo = segments.next().ok_or_else(invalid)?;
    let repo = repo.strip_suffix(".git").unwrap_or(repo);

    let valid = |s: &str| {
        !s.is_empty()
            && s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    };
    if !valid(owner) || !valid(repo) {
        return Err(invalid());
    }
    Ok((owner.to_string(), repo.to_string()))
}

#[derive(Clone)]
pub struct GithubClient {
    client: Client,
    api_url: String,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(api_url: String, token: Option<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(15))
                .user_agent(concat!("eduvault-api/", env!("CARGO_PKG_VERSION")))
                .build()
                .expect("Failed to build HTTP client"),
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    pub async fn fetch_repo(&self, owner: &str, repo: &str) -> Result<RepoMetadata, GithubError> {
        let mut request = self
            .client
            .get(format!("{}/repos/{owner}/{repo}", self.api_url))
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(GithubError::RepoNotFound(format!("{owner}/{repo}")));
        }
        if !status.is_success() {
            return Err(GithubError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let metadata: RepoMetadata = response.json().await?;
        debug!(
            "Fetched GitHub metadata for {} ({} stars)",
            metadata.full_name, metadata.stargazers_count
        );
        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_fake_service;
    use axum::{extract::Path, http::StatusCode as AxumStatus, routing::get, Json, Router};
    use serde_json::json;

    #[test]
    fn test_parse_plain_url() {
        assert_eq!(
            parse_repo_url("https://github.com/rust-lang/rust").unwrap(),
            ("rust-lang".to_string(), "rust".to_string())
        );
    }

    #[test]
    fn test_parse_git_suffix_and_trailing_slash() {
        assert_eq!(
            parse_repo_url("https://github.com/tokio-rs/axum.git").unwrap().1,
            "axum"
        );
        assert_eq!(
            parse_repo_url("http://www.github.com/tokio-rs/axum/").unwrap().1,
            "axum"
        );
        assert_eq!(
            parse_repo_url("https://github.com/tokio-rs/axum/tree/main").unwrap().1,
            "axum"
        );
    }

    #[test]
    fn test_parse_rejects_other_hosts_and_short_paths() {
        assert!(parse_repo_url("https://gitlab.com/a/b").is_err());
        assert!(parse_repo_url("https://github.com/only-owner").is_err());
        assert!(parse_repo_url("https://github.com/a b/c").is_err());
    }

    #[tokio::test]
    async fn test_fetch_repo_against_fake_api() {
        let app = Router::new().route(
            "/repos/:owner/:repo",
            get(|Path((owner, repo)): Path<(String, String)>| async move {
                if repo == "missing" {
                    return Err(AxumStatus::NOT_FOUND);
                }
                Ok(Json(json!({
                    "name": repo,
                    "full_name": format!("{owner}/{repo}"),
                    "html_url": format!("https://github.com/{owner}/{repo}"),
                    "description": "demo",
                    "stargazers_count": 7,
                    "forks_count": 2,
                    "language": "Rust",
                    "topics": ["cli"]
                })))
            }),
        );
        let base = spawn_fake_service(app).await;
        let client = GithubClient::new(base, None);

        let meta = client.fetch_repo("ada", "engine").await.unwrap();
        assert_eq!(meta.full_name, "ada/engine");
        assert_eq!(meta.stargazers_count, 7);
        assert_eq!(meta.topics, vec!["cli".to_string()]);

        let err = client.fetch_repo("ada", "missing").await.unwrap_err();
        assert!(matches!(err, GithubError::RepoNotFound(_)));
    }
}
