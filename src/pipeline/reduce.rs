//! Narrowing and ordering the discovered deliveries.
//!
//! Everything here is synchronous and deterministic; given the same set of
//! deliveries in any order, the output is the same.

use crate::filters::{self, StatusFilter, TimeRange};
use crate::models::Delivery;
use crate::ordering::SortSpec;
use std::collections::HashMap;

pub fn retain_in_range(mut deliveries: Vec<Delivery>, range: &TimeRange) -> Vec<Delivery> {
    if !range.is_unbounded() {
        deliveries.retain(|d| filters::in_range(d, range));
    }
    deliveries
}

pub fn retain_status(mut deliveries: Vec<Delivery>, status: StatusFilter) -> Vec<Delivery> {
    if status != StatusFilter::All {
        deliveries.retain(|d| status.matches(d.status_code));
    }
    deliveries
}

/// Keeps deliveries whose enriched URL contains `pattern`.
pub fn retain_url(mut deliveries: Vec<Delivery>, pattern: &str) -> Vec<Delivery> {
    deliveries.retain(|d| filters::url_matches(d, pattern));
    deliveries
}

/// Keeps the first `limit` deliveries of each repository, in the order
/// given. Groups come back concatenated in no particular order.
pub fn limit_per_repository(deliveries: Vec<Delivery>, limit: usize) -> Vec<Delivery> {
    let mut grouped: HashMap<String, Vec<Delivery>> = HashMap::new();

    for delivery in deliveries {
        let group = grouped.entry(delivery.repository.clone()).or_default();
        if group.len() < limit {
            group.push(delivery);
        }
    }

    grouped.into_values().flatten().collect()
}

/// Sort, apply the per-repository limit (`head == 0` means unlimited),
/// and sort again so the groups interleave in global order.
pub fn order_and_limit(mut deliveries: Vec<Delivery>, sort: &SortSpec, head: usize) -> Vec<Delivery> {
    sort.sort(&mut deliveries);

    if head > 0 {
        deliveries = limit_per_repository(deliveries, head);
        sort.sort(&mut deliveries);
    }

    deliveries
}
