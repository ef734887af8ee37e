//! Sort order for delivery listings.
//!
//! A sort is a field plus a direction. Each field has its own default
//! direction, and ties on the selected field are broken by a fixed chain
//! of secondary keys so that the resulting order does not depend on the
//! order in which concurrent fetches happened to return.

use crate::error::ValidationError;
use crate::models::Delivery;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Field a listing can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Repository,
    Timestamp,
    Code,
    Event,
}

impl SortField {
    /// Looks up a field by its command-line name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "repository" => Some(SortField::Repository),
            "timestamp" => Some(SortField::Timestamp),
            "code" => Some(SortField::Code),
            "event" => Some(SortField::Event),
            _ => None,
        }
    }

    /// Alphabetical fields default to ascending, time and numeric fields
    /// to descending.
    pub fn default_order(self) -> SortOrder {
        match self {
            SortField::Repository | SortField::Event => SortOrder::Ascending,
            SortField::Timestamp | SortField::Code => SortOrder::Descending,
        }
    }

    fn compare(self, a: &Delivery, b: &Delivery) -> Ordering {
        match self {
            SortField::Repository => a.repository.cmp(&b.repository),
            SortField::Timestamp => a.delivered_at.cmp(&b.delivered_at),
            SortField::Code => a.status_code.cmp(&b.status_code),
            SortField::Event => a.event.cmp(&b.event),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortField::Repository => "repository",
            SortField::Timestamp => "timestamp",
            SortField::Code => "code",
            SortField::Event => "event",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "asc" => Some(SortOrder::Ascending),
            "desc" => Some(SortOrder::Descending),
            _ => None,
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Ascending => f.write_str("asc"),
            SortOrder::Descending => f.write_str("desc"),
        }
    }
}

/// A resolved sort: which field, which direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: SortField,
    pub order: SortOrder,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self::for_field(SortField::Timestamp)
    }
}

impl SortSpec {
    pub fn new(field: SortField, order: SortOrder) -> Self {
        Self { field, order }
    }

    /// Sort by `field` in its default direction.
    pub fn for_field(field: SortField) -> Self {
        Self::new(field, field.default_order())
    }

    /// Resolves a field name that was not validated up front. Unknown
    /// fields fall back to newest-first by timestamp, ignoring `order`.
    pub fn resolve(name: &str, order: Option<SortOrder>) -> Self {
        match SortField::from_name(name) {
            Some(field) => Self::new(field, order.unwrap_or_else(|| field.default_order())),
            None => Self::default(),
        }
    }

    /// Full comparison: the selected field in the selected direction, then
    /// newest first, then repository, hook and delivery id ascending.
    pub fn compare(&self, a: &Delivery, b: &Delivery) -> Ordering {
        self.order
            .apply(self.field.compare(a, b))
            .then_with(|| b.delivered_at.cmp(&a.delivered_at))
            .then_with(|| a.repository.cmp(&b.repository))
            .then_with(|| a.hook_id.cmp(&b.hook_id))
            .then_with(|| a.id.cmp(&b.id))
    }

    /// Stable in-place sort.
    pub fn sort(&self, deliveries: &mut [Delivery]) {
        deliveries.sort_by(|a, b| self.compare(a, b));
    }
}

impl FromStr for SortSpec {
    type Err = ValidationError;

    /// Parses `field` or `field:order`, e.g. `code:asc`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() > 2 {
            return Err(ValidationError::SortFormat(s.to_string()));
        }

        let field = SortField::from_name(parts[0])
            .ok_or_else(|| ValidationError::SortField(parts[0].to_string()))?;

        let order = match parts.get(1) {
            Some(token) => SortOrder::from_token(token)
                .ok_or_else(|| ValidationError::SortOrder(token.to_string()))?,
            None => field.default_order(),
        };

        Ok(Self::new(field, order))
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field, self.order)
    }
}
