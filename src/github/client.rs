//! GitHub REST API client.
//!
//! Thin wrapper over reqwest that knows the handful of endpoints hookmon
//! needs, follows pagination and turns non-2xx responses into [`ApiError`]s.

use crate::error::ApiError;
use crate::github::DeliverySource;
use crate::models::{Delivery, DeliveryDetail, Hook};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, LINK, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::future::Future;
use std::process::Command;
use std::time::Duration;
use tracing::{debug, info};

const API_VERSION: &str = "2022-11-28";
const REPOS_PER_PAGE: usize = 100;

/// Settings for [`GithubClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// API root, e.g. `https://api.github.com`.
    pub base_url: String,
    /// Bearer token.
    pub token: String,
    /// Per-request timeout.
    pub timeout_seconds: u64,
    /// Upper bound on delivery pages fetched per hook.
    pub max_delivery_pages: u32,
}

/// Authenticated client for the GitHub REST API.
pub struct GithubClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    max_delivery_pages: u32,
}

#[derive(Debug, Deserialize)]
struct RepositoryEntry {
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl GithubClient {
    /// Build a client. No request is made until the first call.
    pub fn new(options: ClientOptions) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static(API_VERSION),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("hookmon/", env!("CARGO_PKG_VERSION"))),
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()
            .map_err(ApiError::Client)?;

        Ok(Self {
            http,
            base_url: options.base_url.trim_end_matches('/').to_string(),
            token: options.token,
            max_delivery_pages: options.max_delivery_pages.max(1),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    /// GET a JSON document. Returns the body and the `rel="next"` link, if any.
    async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<(T, Option<String>), ApiError> {
        let url = self.endpoint(path);
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                path: path.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                path: path.to_string(),
                status,
                message: error_message(&body),
            });
        }

        let next = response
            .headers()
            .get(LINK)
            .and_then(|value| value.to_str().ok())
            .and_then(next_link);

        let body = response.json::<T>().await.map_err(|source| ApiError::Decode {
            path: path.to_string(),
            source,
        })?;

        Ok((body, next))
    }

    /// GET every page of a list endpoint, following `Link` headers.
    async fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        max_pages: Option<u32>,
    ) -> Result<Vec<T>, ApiError> {
        follow_links(path.to_string(), max_pages, move |current: String| async move {
            self.get_page::<Vec<T>>(&current).await
        })
        .await
    }
}

/// Walk a `Link: rel="next"` chain starting at `first`. Stops when a page
/// has no next link or after `max_pages` pages, whichever comes first.
async fn follow_links<T, F, Fut>(
    first: String,
    max_pages: Option<u32>,
    mut fetch: F,
) -> Result<Vec<T>, ApiError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<(Vec<T>, Option<String>), ApiError>>,
{
    let mut items = Vec::new();
    let mut next = Some(first);
    let mut pages = 0u32;

    while let Some(current) = next.take() {
        let (page, following) = fetch(current).await?;
        items.extend(page);
        pages += 1;

        if max_pages.is_some_and(|max| pages >= max) {
            if let Some(skipped) = following {
                debug!("stopping after {} pages, not fetching {}", pages, skipped);
            }
            break;
        }
        next = following;
    }

    Ok(items)
}

/// Request pages 1, 2, ... until one comes back shorter than `page_size`.
async fn numbered_pages<T, F, Fut>(page_size: usize, mut fetch: F) -> Result<Vec<T>, ApiError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Vec<T>, ApiError>>,
{
    let mut items = Vec::new();
    let mut page = 1;

    loop {
        let entries = fetch(page).await?;
        let count = entries.len();
        items.extend(entries);

        if count < page_size {
            break;
        }
        page += 1;
    }

    Ok(items)
}

#[async_trait]
impl DeliverySource for GithubClient {
    async fn list_repositories(&self, org: &str) -> Result<Vec<String>, ApiError> {
        let entries: Vec<RepositoryEntry> = numbered_pages(REPOS_PER_PAGE, move |page| async move {
            let path = format!(
                "orgs/{}/repos?per_page={}&page={}",
                org, REPOS_PER_PAGE, page
            );
            let (entries, _) = self.get_page::<Vec<RepositoryEntry>>(&path).await?;
            Ok(entries)
        })
        .await?;

        Ok(entries.into_iter().map(|e| e.full_name).collect())
    }

    async fn list_hooks(&self, repo: &str) -> Result<Vec<Hook>, ApiError> {
        self.get_all(&format!("repos/{}/hooks?per_page=100", repo), None)
            .await
    }

    async fn list_deliveries(
        &self,
        repo: &str,
        hook_id: u64,
        per_page: u32,
    ) -> Result<Vec<Delivery>, ApiError> {
        let per_page = if per_page == 0 { 100 } else { per_page };
        let path = format!(
            "repos/{}/hooks/{}/deliveries?per_page={}",
            repo, hook_id, per_page
        );
        self.get_all(&path, Some(self.max_delivery_pages)).await
    }

    async fn get_delivery_detail(
        &self,
        repo: &str,
        hook_id: u64,
        delivery_id: u64,
    ) -> Result<DeliveryDetail, ApiError> {
        let path = format!("repos/{}/hooks/{}/deliveries/{}", repo, hook_id, delivery_id);
        let (detail, _) = self.get_page(&path).await?;
        Ok(detail)
    }
}

/// Pick the token: an explicit one (flag or environment) wins, otherwise
/// ask the `gh` CLI for the token it is logged in with.
pub fn resolve_token(explicit: Option<&str>) -> Result<String, ApiError> {
    if let Some(token) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
        return Ok(token.to_string());
    }

    debug!("No token supplied, asking gh CLI");
    let output = Command::new("gh")
        .args(["auth", "token"])
        .output()
        .map_err(|e| ApiError::MissingToken(format!("could not run gh: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ApiError::MissingToken(stderr.trim().to_string()));
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        return Err(ApiError::MissingToken("gh returned an empty token".to_string()));
    }

    info!("Using token from gh CLI");
    Ok(token)
}

/// Extract the `rel="next"` target from a `Link` header.
pub fn next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let mut sections = part.split(';');
        let target = sections.next()?.trim();
        let is_next = sections.any(|param| param.trim() == r#"rel="next""#);
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(str::to_string)
    })
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.message,
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}
