//! Data models for webhook deliveries.
//!
//! This module contains the records fetched from the GitHub REST API
//! (hooks, deliveries, delivery details) and the target selector used
//! to decide what gets scanned.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// What a run scans: every repository of an organization, or one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// All repositories owned by the organization.
    Organization(String),
    /// A single `OWNER/REPO` repository.
    Repository(String),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Organization(org) => write!(f, "organization {}", org),
            Target::Repository(repo) => write!(f, "repository {}", repo),
        }
    }
}

/// Outcome class derived from an HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 2xx
    Success,
    /// 3xx
    Redirect,
    /// 4xx, 5xx, or the `0` sentinel (no response received)
    Failure,
    /// Anything else (1xx and codes above 599)
    Other,
}

impl StatusClass {
    /// Classify a delivery status code.
    pub fn of(code: u16) -> Self {
        match code {
            0 => StatusClass::Failure,
            200..=299 => StatusClass::Success,
            300..=399 => StatusClass::Redirect,
            400..=599 => StatusClass::Failure,
            _ => StatusClass::Other,
        }
    }
}

/// A webhook registered on a repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hook {
    /// Hook identifier.
    pub id: u64,
    /// Whether GitHub currently sends events to this hook.
    #[serde(default)]
    pub active: bool,
    /// Hook configuration (holds the target URL).
    #[serde(default)]
    pub config: HookConfig,
}

/// The `config` object of a hook.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookConfig {
    /// URL that receives the webhook payloads.
    #[serde(default)]
    pub url: Option<String>,
}

impl Hook {
    /// Returns the configured target URL, or an empty string when GitHub omits it.
    pub fn target_url(&self) -> &str {
        self.config.url.as_deref().unwrap_or("")
    }
}

/// A single webhook delivery attempt.
///
/// Values are never modified after they leave the fetch layer: stamping the
/// owning repository and filling in the URL both return a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    /// Delivery identifier, unique within the owning repository.
    pub id: u64,
    /// Delivery GUID (matches the `X-GitHub-Delivery` header).
    #[serde(default)]
    pub guid: String,
    /// When the delivery was attempted.
    pub delivered_at: DateTime<Utc>,
    /// Whether this delivery was a manual redelivery.
    #[serde(default)]
    pub redelivery: bool,
    /// Round-trip time in seconds.
    #[serde(default)]
    pub duration: f64,
    /// Status label, e.g. "OK". May be empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub status: String,
    /// HTTP status code; `0` means no response was received.
    #[serde(default)]
    pub status_code: u16,
    /// Event type, e.g. "push".
    #[serde(default, deserialize_with = "null_as_empty")]
    pub event: String,
    /// Event action, e.g. "opened". May be empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub action: String,
    /// Target URL. Only known after the delivery detail has been fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Owning repository (`OWNER/REPO`), stamped after listing.
    #[serde(default)]
    pub repository: String,
    /// Owning hook, stamped after listing.
    #[serde(default)]
    pub hook_id: u64,
}

impl Delivery {
    /// Returns a copy tagged with the repository and hook it was listed from.
    pub fn stamped(self, repository: &str, hook_id: u64) -> Self {
        Self {
            repository: repository.to_string(),
            hook_id,
            ..self
        }
    }

    /// Returns a replacement record carrying the target URL from the detail endpoint.
    pub fn with_url(&self, url: String) -> Self {
        Self {
            url: Some(url),
            ..self.clone()
        }
    }

    /// Returns the status class for coloring and filtering.
    pub fn status_class(&self) -> StatusClass {
        StatusClass::of(self.status_code)
    }

    /// Whether no HTTP response was received for this delivery.
    pub fn is_unanswered(&self) -> bool {
        self.status_code == 0
    }
}

impl fmt::Display for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "delivery {} ({} hook {})",
            self.id, self.repository, self.hook_id
        )
    }
}

/// The subset of the delivery detail endpoint that the pipeline uses.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryDetail {
    /// Target URL the payload was sent to.
    #[serde(default)]
    pub url: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_class() {
        assert_eq!(StatusClass::of(0), StatusClass::Failure);
        assert_eq!(StatusClass::of(200), StatusClass::Success);
        assert_eq!(StatusClass::of(204), StatusClass::Success);
        assert_eq!(StatusClass::of(302), StatusClass::Redirect);
        assert_eq!(StatusClass::of(404), StatusClass::Failure);
        assert_eq!(StatusClass::of(503), StatusClass::Failure);
        assert_eq!(StatusClass::of(101), StatusClass::Other);
    }

    #[test]
    fn test_deserialize_api_delivery() {
        let json = r#"{
            "id": 12345678,
            "guid": "0b989ba4-242f-11e5-81e1-c7b6966d2516",
            "delivered_at": "2019-06-03T00:57:16Z",
            "redelivery": false,
            "duration": 0.27,
            "status": "Invalid HTTP Response: 400",
            "status_code": 400,
            "event": "issues",
            "action": null,
            "installation_id": 123,
            "repository_id": 456
        }"#;

        let delivery: Delivery = serde_json::from_str(json).unwrap();
        assert_eq!(delivery.id, 12345678);
        assert_eq!(delivery.status_code, 400);
        assert_eq!(delivery.event, "issues");
        assert_eq!(delivery.action, "");
        assert!(delivery.url.is_none());
        assert_eq!(delivery.repository, "");
    }

    #[test]
    fn test_stamp_and_enrich_produce_new_values() {
        let json = r#"{"id": 1, "delivered_at": "2026-01-05T10:00:00Z", "status_code": 0, "event": "push"}"#;
        let listed: Delivery = serde_json::from_str(json).unwrap();

        let stamped = listed.clone().stamped("acme/api", 7);
        assert_eq!(stamped.repository, "acme/api");
        assert_eq!(stamped.hook_id, 7);
        assert_eq!(listed.repository, "");

        let enriched = stamped.with_url("https://hooks.example.com/in".to_string());
        assert_eq!(enriched.url.as_deref(), Some("https://hooks.example.com/in"));
        assert!(stamped.url.is_none());
        assert!(enriched.is_unanswered());
    }

    #[test]
    fn test_deserialize_delivery_detail() {
        let json = r#"{
            "id": 12345678,
            "guid": "0b989ba4-242f-11e5-81e1-c7b6966d2516",
            "status_code": 502,
            "url": "https://hooks.example.com/in",
            "request": {"headers": {}, "payload": {}},
            "response": {"headers": {}, "payload": null}
        }"#;
        let detail: DeliveryDetail = serde_json::from_str(json).unwrap();
        assert_eq!(detail.url.as_deref(), Some("https://hooks.example.com/in"));

        let bare: DeliveryDetail = serde_json::from_str(r#"{"id": 1}"#).unwrap();
        assert!(bare.url.is_none());
    }

    #[test]
    fn test_hook_target_url() {
        let hook: Hook =
            serde_json::from_str(r#"{"id": 9, "active": true, "config": {"url": "https://x.io/h"}}"#)
                .unwrap();
        assert_eq!(hook.target_url(), "https://x.io/h");

        let bare: Hook = serde_json::from_str(r#"{"id": 10}"#).unwrap();
        assert_eq!(bare.target_url(), "");
    }
}
