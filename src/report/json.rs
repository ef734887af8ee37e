use super::UNANSWERED_STATUS;
use crate::models::Delivery;
use anyhow::{Context, Result};

/// Pretty-printed JSON array of deliveries, in the order given.
pub fn generate_json_report(deliveries: &[Delivery]) -> Result<String> {
    let rows: Vec<Delivery> = deliveries
        .iter()
        .map(|d| {
            let mut row = d.clone();
            if row.is_unanswered() && row.status.is_empty() {
                row.status = UNANSWERED_STATUS.to_string();
            }
            row
        })
        .collect();

    serde_json::to_string_pretty(&rows).context("Failed to serialize deliveries")
}
