use crate::cli::commands::SortArg;
use crate::model::{Record, str_field};
use anyhow::Result;
use chrono::{DateTime, Utc};
use colored::{ColoredString, Colorize};
use serde::Serialize;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Left-aligned table; the first column is highlighted.
pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let header: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| format!("{:<w$}", h, w = *w))
        .collect();
    println!("{}", header.join("  ").trim_end().bold());

    for row in rows {
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(i, (cell, w))| {
                let padded = format!("{:<w$}", cell, w = *w);
                if i == 0 {
                    padded.cyan().to_string()
                } else {
                    padded
                }
            })
            .collect();
        println!("{}", cells.join("  ").trim_end());
    }
}

/// `Label:   value` lines, skipping empty values.
pub fn print_fields(fields: &[(&str, String)]) {
    let width = fields.iter().map(|(k, _)| k.len()).max().unwrap_or(0) + 1;
    for (key, value) in fields {
        if value.is_empty() {
            continue;
        }
        println!("{:<width$} {}", format!("{}:", key), value, width = width);
    }
}

/// Newest first by a timestamp field; records without it go last.
pub fn sort_newest_first(records: &mut [Record], field: &str) {
    records.sort_by(|a, b| str_field(b, field).cmp(&str_field(a, field)));
}

/// Optional newest-first ordering, then the limit.
pub fn arrange(records: &mut Vec<Record>, sort: Option<SortArg>, limit: usize) {
    if let Some(sort) = sort {
        sort_newest_first(records, sort.field());
    }
    records.truncate(limit);
}

pub fn print_empty(what: &str) {
    println!("No {} found.", what);
}

pub fn warn(message: &str) {
    eprintln!("{} {}", "Warning:".yellow().bold(), message);
}

pub fn text(record: &Record, field: &str) -> String {
    str_field(record, field).unwrap_or_default().to_string()
}

/// `YYYY-MM-DD HH:MM` for an RFC 3339 timestamp field, or the raw value.
pub fn timestamp(record: &Record, field: &str) -> String {
    let Some(raw) = str_field(record, field) else {
        return String::new();
    };
    match raw.parse::<DateTime<Utc>>() {
        Ok(ts) => ts.format("%Y-%m-%d %H:%M").to_string(),
        Err(_) => raw.to_string(),
    }
}

pub fn format_priority(priority: &str) -> ColoredString {
    match priority {
        "urgent" => "urgent".red().bold(),
        "high" => "high".red(),
        "medium" => "medium".yellow(),
        "low" => "low".dimmed(),
        "" | "none" => "none".dimmed(),
        other => other.normal(),
    }
}

/// Colors a state name by its workflow group.
pub fn format_state(name: &str, group: &str) -> ColoredString {
    match group {
        "backlog" => name.dimmed(),
        "unstarted" => name.white(),
        "started" => name.yellow(),
        "completed" => name.green(),
        "cancelled" => name.red(),
        _ => name.normal(),
    }
}

/// Wrap plain text as the HTML body the API stores.
pub fn to_html(text: &str) -> String {
    let escaped = text
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    escaped
        .lines()
        .map(|line| format!("<p>{}</p>", line))
        .collect::<Vec<_>>()
        .join("")
}
