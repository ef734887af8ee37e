//! Output rendering for delivery lists.

mod json;
mod table;

pub use json::generate_json_report;
pub use table::{generate_table_report, TableOptions};

use crate::models::Delivery;
use anyhow::Result;
use std::io::Write;

/// Shown in place of a status when no HTTP response was received.
pub const UNANSWERED_STATUS: &str = "delivery failed";

/// Render `deliveries` as JSON or as a table and write them to `out`.
pub fn write_report<W: Write>(
    out: &mut W,
    deliveries: &[Delivery],
    json: bool,
    options: TableOptions,
) -> Result<()> {
    let rendered = if json {
        generate_json_report(deliveries)?
    } else {
        generate_table_report(deliveries, options)
    };

    out.write_all(rendered.as_bytes())?;
    if !rendered.ends_with('\n') {
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::fake::delivery;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_write_report_switches_format() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let rows = vec![delivery(9, 200, "push", at).stamped("acme/api", 1)];

        let mut buf = Vec::new();
        write_report(&mut buf, &rows, true, TableOptions::default()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.trim_start().starts_with('['));
        assert!(text.ends_with('\n'));

        let mut buf = Vec::new();
        write_report(&mut buf, &rows, false, TableOptions::default()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("Delivery ID"));
    }
}
