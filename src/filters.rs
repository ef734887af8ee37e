//! Predicates applied to individual deliveries.
//!
//! Every function here looks at one record and one criterion; the
//! pipeline decides the order in which they run.

use crate::models::{Delivery, Hook, StatusClass};
use chrono::{DateTime, Utc};

/// Inclusive time window. A missing bound leaves that side open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn new(since: Option<DateTime<Utc>>, until: Option<DateTime<Utc>>) -> Self {
        Self { since, until }
    }

    /// Whether neither bound is set.
    pub fn is_unbounded(&self) -> bool {
        self.since.is_none() && self.until.is_none()
    }

    /// Whether `at` falls inside the window (both ends inclusive).
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        if let Some(since) = self.since {
            if at < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if at > until {
                return false;
            }
        }
        true
    }
}

/// Which delivery outcomes to keep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum StatusFilter {
    /// Keep everything
    #[default]
    All,
    /// 4xx, 5xx, or no response
    Failed,
    /// 200-399
    Successful,
}

impl StatusFilter {
    pub fn matches(self, status_code: u16) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Failed => is_failed(status_code),
            StatusFilter::Successful => is_successful(status_code),
        }
    }
}

/// A failed delivery got no response (`0`) or a 4xx/5xx response.
pub fn is_failed(status_code: u16) -> bool {
    status_code == 0 || status_code >= 400
}

/// A successful delivery got a 2xx or 3xx response.
pub fn is_successful(status_code: u16) -> bool {
    matches!(
        StatusClass::of(status_code),
        StatusClass::Success | StatusClass::Redirect
    )
}

/// Case-insensitive substring match. An empty pattern matches everything.
pub fn matches_pattern(url: &str, pattern: &str) -> bool {
    if pattern.is_empty() {
        return true;
    }
    url.to_lowercase().contains(&pattern.to_lowercase())
}

/// Time-range predicate for a delivery.
pub fn in_range(delivery: &Delivery, range: &TimeRange) -> bool {
    range.contains(delivery.delivered_at)
}

/// URL predicate for an enriched delivery. Deliveries without a URL only
/// match an empty pattern.
pub fn url_matches(delivery: &Delivery, pattern: &str) -> bool {
    matches_pattern(delivery.url.as_deref().unwrap_or(""), pattern)
}

/// Pre-filter on the hook's configured URL, used to skip listing deliveries
/// for hooks that are unlikely to match. The delivery URL check stays
/// authoritative.
pub fn hook_matches(hook: &Hook, pattern: &str) -> bool {
    matches_pattern(hook.target_url(), pattern)
}
