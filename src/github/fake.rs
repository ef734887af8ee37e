//! In-memory [`DeliverySource`] for tests.

use crate::error::ApiError;
use crate::github::DeliverySource;
use crate::models::{Delivery, DeliveryDetail, Hook, HookConfig};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Canned GitHub data with failure injection and call accounting.
#[derive(Default)]
pub struct FakeSource {
    orgs: HashMap<String, Vec<String>>,
    hooks: HashMap<String, Vec<Hook>>,
    deliveries: HashMap<(String, u64), Vec<Delivery>>,
    urls: HashMap<u64, String>,
    failing: HashSet<String>,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
    pub delivery_list_calls: AtomicUsize,
    pub detail_calls: AtomicUsize,
}

/// An unstamped delivery, as the listing endpoint returns it.
pub fn delivery(id: u64, status_code: u16, event: &str, at: DateTime<Utc>) -> Delivery {
    Delivery {
        id,
        guid: format!("guid-{}", id),
        delivered_at: at,
        redelivery: false,
        duration: 0.2,
        status: if status_code == 0 {
            String::new()
        } else {
            format!("{}", status_code)
        },
        status_code,
        event: event.to_string(),
        action: String::new(),
        url: None,
        repository: String::new(),
        hook_id: 0,
    }
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_org(mut self, org: &str, repos: &[&str]) -> Self {
        self.orgs
            .insert(org.to_string(), repos.iter().map(|r| r.to_string()).collect());
        self
    }

    pub fn with_hook(mut self, repo: &str, hook_id: u64, url: &str) -> Self {
        self.hooks.entry(repo.to_string()).or_default().push(Hook {
            id: hook_id,
            active: true,
            config: HookConfig {
                url: Some(url.to_string()),
            },
        });
        self
    }

    /// Register deliveries for a hook. The detail endpoint reports the
    /// hook's configured URL for them unless overridden with `with_detail_url`.
    pub fn with_deliveries(mut self, repo: &str, hook_id: u64, records: Vec<Delivery>) -> Self {
        let hook_url = self
            .hooks
            .get(repo)
            .and_then(|hooks| hooks.iter().find(|h| h.id == hook_id))
            .map(|h| h.target_url().to_string())
            .unwrap_or_default();
        for record in &records {
            self.urls.entry(record.id).or_insert_with(|| hook_url.clone());
        }
        self.deliveries
            .entry((repo.to_string(), hook_id))
            .or_default()
            .extend(records);
        self
    }

    pub fn with_detail_url(mut self, delivery_id: u64, url: &str) -> Self {
        self.urls.insert(delivery_id, url.to_string());
        self
    }

    /// Make a call fail. Keys: `repos:ORG`, `hooks:REPO`,
    /// `deliveries:REPO:HOOK`, `detail:DELIVERY_ID`.
    pub fn failing(mut self, key: &str) -> Self {
        self.failing.insert(key.to_string());
        self
    }

    /// Delay every call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    async fn call(&self, key: String) -> Result<(), ApiError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(&key) {
            return Err(ApiError::Status {
                path: key,
                status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn not_found(path: String) -> ApiError {
        ApiError::Status {
            path,
            status: reqwest::StatusCode::NOT_FOUND,
            message: "Not Found".to_string(),
        }
    }
}

#[async_trait]
impl DeliverySource for FakeSource {
    async fn list_repositories(&self, org: &str) -> Result<Vec<String>, ApiError> {
        self.call(format!("repos:{}", org)).await?;
        self.orgs
            .get(org)
            .cloned()
            .ok_or_else(|| Self::not_found(format!("orgs/{}/repos", org)))
    }

    async fn list_hooks(&self, repo: &str) -> Result<Vec<Hook>, ApiError> {
        self.call(format!("hooks:{}", repo)).await?;
        Ok(self.hooks.get(repo).cloned().unwrap_or_default())
    }

    async fn list_deliveries(
        &self,
        repo: &str,
        hook_id: u64,
        _per_page: u32,
    ) -> Result<Vec<Delivery>, ApiError> {
        self.delivery_list_calls.fetch_add(1, Ordering::SeqCst);
        self.call(format!("deliveries:{}:{}", repo, hook_id)).await?;
        Ok(self
            .deliveries
            .get(&(repo.to_string(), hook_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_delivery_detail(
        &self,
        repo: &str,
        hook_id: u64,
        delivery_id: u64,
    ) -> Result<DeliveryDetail, ApiError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        self.call(format!("detail:{}", delivery_id)).await?;
        match self.urls.get(&delivery_id) {
            Some(url) => Ok(DeliveryDetail {
                url: Some(url.clone()),
            }),
            None => Err(Self::not_found(format!(
                "repos/{}/hooks/{}/deliveries/{}",
                repo, hook_id, delivery_id
            ))),
        }
    }
}
