//! Plain-text table rendering.
//!
//! Cells are padded before they are colored so that escape codes never
//! count towards a column's width.

use super::UNANSWERED_STATUS;
use crate::models::{Delivery, StatusClass};
use chrono::SecondsFormat;
use colored::{ColoredString, Colorize};

const HEADERS: [&str; 9] = [
    "Delivery ID",
    "Repository",
    "Hook ID",
    "Timestamp",
    "Status",
    "Code",
    "Event",
    "Action",
    "URL",
];

/// Index of the Status column.
const STATUS_COLUMN: usize = 4;

const MAX_URL_WIDTH: usize = 50;

const COLUMN_GAP: &str = "  ";

#[derive(Debug, Clone, Copy, Default)]
pub struct TableOptions {
    /// Color the status column by outcome.
    pub color: bool,
}

/// Render deliveries as an aligned table, one row per delivery.
pub fn generate_table_report(deliveries: &[Delivery], options: TableOptions) -> String {
    if deliveries.is_empty() {
        return "No webhook deliveries found\n".to_string();
    }

    let rows: Vec<[String; 9]> = deliveries.iter().map(row_cells).collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let color = options.color;
    let mut output = String::new();
    let header: Vec<String> = HEADERS.iter().map(|h| h.to_string()).collect();
    push_line(&mut output, &header, &widths, |_, cell| {
        if color {
            cell.bold()
        } else {
            cell.normal()
        }
    });

    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_line(&mut output, &rule, &widths, |_, cell| cell.normal());

    for (delivery, row) in deliveries.iter().zip(rows.iter()) {
        let class = delivery.status_class();
        push_line(&mut output, row, &widths, |column, cell| {
            if color && column == STATUS_COLUMN {
                paint_status(cell, class)
            } else {
                cell.normal()
            }
        });
    }

    output
}

fn row_cells(delivery: &Delivery) -> [String; 9] {
    [
        delivery.id.to_string(),
        delivery.repository.clone(),
        delivery.hook_id.to_string(),
        delivery
            .delivered_at
            .to_rfc3339_opts(SecondsFormat::Secs, true),
        status_text(delivery),
        delivery.status_code.to_string(),
        or_dash(&delivery.event),
        or_dash(&delivery.action),
        truncate_url(delivery.url.as_deref().unwrap_or_default()),
    ]
}

fn status_text(delivery: &Delivery) -> String {
    if delivery.is_unanswered() {
        UNANSWERED_STATUS.to_string()
    } else {
        or_dash(&delivery.status)
    }
}

fn or_dash(value: &str) -> String {
    if value.is_empty() {
        "-".to_string()
    } else {
        value.to_string()
    }
}

/// Shorten long URLs to 47 characters plus an ellipsis.
fn truncate_url(url: &str) -> String {
    if url.is_empty() {
        return "-".to_string();
    }
    if url.chars().count() <= MAX_URL_WIDTH {
        return url.to_string();
    }
    let head: String = url.chars().take(MAX_URL_WIDTH - 3).collect();
    format!("{}...", head)
}

fn paint_status(cell: &str, class: StatusClass) -> ColoredString {
    match class {
        StatusClass::Success => cell.green(),
        StatusClass::Redirect => cell.yellow(),
        StatusClass::Failure => cell.red(),
        StatusClass::Other => cell.normal(),
    }
}

fn pad(cell: &str, width: usize) -> String {
    format!("{:<width$}", cell, width = width)
}

fn push_line<F>(output: &mut String, cells: &[String], widths: &[usize], style: F)
where
    F: Fn(usize, &str) -> ColoredString,
{
    let last = cells.len().saturating_sub(1);
    let rendered: Vec<String> = cells
        .iter()
        .enumerate()
        .map(|(column, cell)| {
            // The last column is not padded so lines carry no trailing blanks.
            let text = if column == last {
                cell.clone()
            } else {
                pad(cell, widths[column])
            };
            style(column, &text).to_string()
        })
        .collect();
    output.push_str(&rendered.join(COLUMN_GAP));
    output.push('\n');
}
