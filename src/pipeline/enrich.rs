//! Enrichment: fill in target URLs from the delivery detail endpoint.
//!
//! The delivery list endpoint leaves out the URL, so when a URL pattern is
//! in play every remaining delivery is fetched again individually.

use crate::github::DeliverySource;
use crate::models::Delivery;
use crate::pool::FetchPool;
use indicatif::ProgressBar;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Default)]
pub struct Enrichment {
    /// Deliveries whose detail was fetched, each with `url` set.
    pub deliveries: Vec<Delivery>,
    /// Deliveries dropped because their detail could not be fetched.
    pub failed: usize,
}

pub async fn enrich(
    source: &Arc<dyn DeliverySource>,
    deliveries: Vec<Delivery>,
    workers: usize,
    progress: Option<ProgressBar>,
) -> Enrichment {
    if deliveries.is_empty() {
        return Enrichment::default();
    }
    info!("Fetching details for {} deliveries", deliveries.len());

    let mut pool = FetchPool::new("enrichment", workers);
    if let Some(pb) = progress {
        pool = pool.with_progress(pb);
    }

    let source = Arc::clone(source);
    let report = pool
        .run(deliveries, move |delivery: Delivery| {
            let source = Arc::clone(&source);
            async move {
                let detail = source
                    .get_delivery_detail(&delivery.repository, delivery.hook_id, delivery.id)
                    .await?;
                Ok(delivery.with_url(detail.url.unwrap_or_default()))
            }
        })
        .await;

    Enrichment {
        deliveries: report.fetched,
        failed: report.failed.len(),
    }
}
