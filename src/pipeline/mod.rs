//! Delivery aggregation.
//!
//! A run discovers deliveries (one pool over repositories), drops the ones
//! outside the time range or status filter, optionally fetches details to
//! learn each delivery's URL (a second pool), applies the URL filter, and
//! finally sorts and trims the result.

pub mod discovery;
pub mod enrich;
pub mod reduce;

use crate::filters::{StatusFilter, TimeRange};
use crate::github::DeliverySource;
use crate::models::{Delivery, Target};
use crate::ordering::SortSpec;
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tracing::{debug, info};

/// What to show. Built once from validated configuration and never changed.
#[derive(Debug, Clone)]
pub struct Query {
    pub target: Target,
    /// Case-insensitive URL substring. Empty means no URL filter.
    pub url_pattern: Option<String>,
    pub range: TimeRange,
    pub status: StatusFilter,
    /// Maximum deliveries per repository; 0 means no limit.
    pub head: usize,
    pub sort: SortSpec,
}

impl Query {
    /// A query for `target` with no filters, default sort and no limit.
    pub fn new(target: Target) -> Self {
        Self {
            target,
            url_pattern: None,
            range: TimeRange::default(),
            status: StatusFilter::All,
            head: 0,
            sort: SortSpec::default(),
        }
    }

    /// The URL pattern, if one is set and non-empty.
    pub fn url_pattern(&self) -> Option<&str> {
        self.url_pattern.as_deref().filter(|p| !p.is_empty())
    }
}

/// Concurrency and paging limits for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub discovery_workers: usize,
    pub enrichment_workers: usize,
    pub per_page: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            discovery_workers: 10,
            enrichment_workers: 5,
            per_page: 100,
        }
    }
}

/// Output of a run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Final deliveries, in display order.
    pub deliveries: Vec<Delivery>,
    pub repositories_scanned: usize,
    pub repositories_failed: usize,
    pub enrichment_failed: usize,
}

/// Runs one query against a delivery source.
pub struct Pipeline {
    source: Arc<dyn DeliverySource>,
    query: Query,
    limits: Limits,
    show_progress: bool,
}

impl Pipeline {
    pub fn new(source: Arc<dyn DeliverySource>, query: Query, limits: Limits) -> Self {
        Self {
            source,
            query,
            limits,
            show_progress: false,
        }
    }

    /// Draw progress bars on stderr while the pools run.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Execute the query.
    ///
    /// Fails only when the target itself cannot be read; individual
    /// repositories and deliveries that fail are logged and left out.
    pub async fn run(&self) -> Result<RunSummary> {
        let query = &self.query;
        debug!("Running {:?} with {:?}", query, self.limits);

        let found = discovery::discover(&self.source, query, &self.limits, self.discovery_progress())
            .await?;
        info!(
            "Discovered {} deliveries in {} repositories",
            found.deliveries.len(),
            found.repositories_scanned
        );

        let mut deliveries = reduce::retain_in_range(found.deliveries, &query.range);
        deliveries = reduce::retain_status(deliveries, query.status);

        let mut enrichment_failed = 0;
        if let Some(pattern) = query.url_pattern() {
            let enriched = enrich::enrich(
                &self.source,
                deliveries,
                self.limits.enrichment_workers,
                self.progress_bar("Fetching delivery details"),
            )
            .await;
            enrichment_failed = enriched.failed;
            deliveries = reduce::retain_url(enriched.deliveries, pattern);
        }

        let deliveries = reduce::order_and_limit(deliveries, &query.sort, query.head);

        Ok(RunSummary {
            deliveries,
            repositories_scanned: found.repositories_scanned,
            repositories_failed: found.repositories_failed,
            enrichment_failed,
        })
    }

    /// Only an organization scan goes through the discovery pool.
    fn discovery_progress(&self) -> Option<ProgressBar> {
        match self.query.target {
            Target::Organization(_) => self.progress_bar("Scanning repositories"),
            Target::Repository(_) => None,
        }
    }

    fn progress_bar(&self, message: &'static str) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }

        let style = ProgressStyle::with_template(
            "{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len} ({elapsed})",
        )
        .map(|s| s.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());

        let pb = ProgressBar::new(0).with_style(style).with_message(message);
        Some(pb)
    }
}
