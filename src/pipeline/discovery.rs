//! Discovery: find every delivery of the target.

use super::{Limits, Query};
use crate::filters;
use crate::github::DeliverySource;
use crate::models::{Delivery, Target};
use crate::pool::FetchPool;
use anyhow::{Context, Result};
use indicatif::ProgressBar;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Deliveries found during discovery plus per-repository bookkeeping.
#[derive(Debug, Default)]
pub struct Discovery {
    pub deliveries: Vec<Delivery>,
    pub repositories_scanned: usize,
    pub repositories_failed: usize,
}

/// List the deliveries of every repository covered by the query's target.
///
/// For an organization, a repository that cannot be read is skipped with a
/// warning; failing to list the organization itself is an error. A single
/// repository target fails outright.
pub async fn discover(
    source: &Arc<dyn DeliverySource>,
    query: &Query,
    limits: &Limits,
    progress: Option<ProgressBar>,
) -> Result<Discovery> {
    match &query.target {
        Target::Repository(repo) => {
            let deliveries =
                collect_repository(source.as_ref(), repo, query.url_pattern(), limits.per_page)
                    .await
                    .with_context(|| format!("failed to process repository {}", repo))?;

            Ok(Discovery {
                deliveries,
                repositories_scanned: 1,
                repositories_failed: 0,
            })
        }
        Target::Organization(org) => {
            info!("Fetching repositories for organization: {}", org);
            let repos = source
                .list_repositories(org)
                .await
                .with_context(|| format!("failed to list repositories for organization {}", org))?;
            info!("Found {} repositories", repos.len());

            let repositories_scanned = repos.len();
            let mut pool = FetchPool::new("discovery", limits.discovery_workers);
            if let Some(pb) = progress {
                pool = pool.with_progress(pb);
            }

            let source = Arc::clone(source);
            let pattern = query.url_pattern().map(str::to_string);
            let per_page = limits.per_page;

            let report = pool
                .run(repos, move |repo: String| {
                    let source = Arc::clone(&source);
                    let pattern = pattern.clone();
                    async move {
                        debug!("Processing repository: {}", repo);
                        collect_repository(source.as_ref(), &repo, pattern.as_deref(), per_page)
                            .await
                    }
                })
                .await;

            Ok(Discovery {
                deliveries: report.fetched.into_iter().flatten().collect(),
                repositories_scanned,
                repositories_failed: report.failed.len(),
            })
        }
    }
}

/// All deliveries of one repository, stamped with repository and hook.
///
/// When `url_pattern` is set, hooks whose configured URL does not match
/// are skipped without listing their deliveries. A hook whose deliveries
/// cannot be listed is skipped with a warning; failing to list the hooks
/// fails the repository.
pub async fn collect_repository(
    source: &dyn DeliverySource,
    repo: &str,
    url_pattern: Option<&str>,
    per_page: u32,
) -> Result<Vec<Delivery>> {
    let hooks = source
        .list_hooks(repo)
        .await
        .context("failed to list webhooks")?;

    let mut deliveries = Vec::new();
    for hook in hooks {
        if let Some(pattern) = url_pattern {
            if !filters::hook_matches(&hook, pattern) {
                debug!("{}: skipping hook {} ({})", repo, hook.id, hook.target_url());
                continue;
            }
        }

        match source.list_deliveries(repo, hook.id, per_page).await {
            Ok(listed) => {
                debug!(
                    "{}: hook {} (active: {}) has {} deliveries",
                    repo,
                    hook.id,
                    hook.active,
                    listed.len()
                );
                deliveries.extend(listed.into_iter().map(|d| d.stamped(repo, hook.id)));
            }
            Err(e) => warn!(
                "failed to list deliveries for {} hook {}: {}",
                repo, hook.id, e
            ),
        }
    }

    Ok(deliveries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::fake::{delivery, FakeSource};
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::Ordering;

    fn ts(minute: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 12, 9, minute, 0).unwrap()
    }

    #[tokio::test]
    async fn test_collect_repository_stamps_identity() {
        let source = FakeSource::new()
            .with_hook("acme/api", 11, "https://ci.example.com/hook")
            .with_hook("acme/api", 12, "https://hooks.slack.com/x")
            .with_deliveries("acme/api", 11, vec![delivery(1, 200, "push", ts(1))])
            .with_deliveries("acme/api", 12, vec![delivery(2, 500, "issues", ts(2))]);

        let mut found = collect_repository(&source, "acme/api", None, 100).await.unwrap();
        found.sort_by_key(|d| d.id);

        assert_eq!(found.len(), 2);
        assert_eq!((found[0].repository.as_str(), found[0].hook_id), ("acme/api", 11));
        assert_eq!((found[1].repository.as_str(), found[1].hook_id), ("acme/api", 12));
        assert!(found.iter().all(|d| d.url.is_none()));
    }

    #[tokio::test]
    async fn test_collect_repository_skips_unmatched_hooks() {
        let source = FakeSource::new()
            .with_hook("acme/api", 11, "https://ci.example.com/hook")
            .with_hook("acme/api", 12, "https://hooks.slack.com/x")
            .with_deliveries("acme/api", 11, vec![delivery(1, 200, "push", ts(1))])
            .with_deliveries("acme/api", 12, vec![delivery(2, 500, "issues", ts(2))]);

        let found = collect_repository(&source, "acme/api", Some("SLACK"), 100)
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 2);
        assert_eq!(source.delivery_list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_collect_repository_tolerates_hook_failure() {
        let source = FakeSource::new()
            .with_hook("acme/api", 11, "https://a.example.com")
            .with_hook("acme/api", 12, "https://b.example.com")
            .with_deliveries("acme/api", 12, vec![delivery(2, 200, "push", ts(2))])
            .failing("deliveries:acme/api:11");

        let found = collect_repository(&source, "acme/api", None, 100).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].hook_id, 12);
    }

    #[tokio::test]
    async fn test_collect_repository_fails_when_hooks_unavailable() {
        let source = FakeSource::new().failing("hooks:acme/api");
        let err = collect_repository(&source, "acme/api", None, 100)
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("failed to list webhooks"));
    }
}
