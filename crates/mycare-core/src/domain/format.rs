//! Presentation helpers shared by every front end
//!
//! Formatting of sizes, dates, and labels exactly as the share screen
//! shows them (Portuguese copy, `DD/MM/YYYY` dates).

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const SIZE_UNITS: &[&str] = &["Bytes", "KB", "MB", "GB"];

/// Formats a byte count with base-1024 units
///
/// `0` ⇒ `"0 Bytes"`, `512` ⇒ `"512 Bytes"`, `1024` ⇒ `"1.00 KB"`,
/// `1536` ⇒ `"1.50 KB"`. Sizes beyond the GB range stay in GB.
pub fn format_file_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} Bytes");
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{value:.2} {}", SIZE_UNITS[unit])
}

/// Formats an ISO 8601 date or RFC 3339 timestamp as `DD/MM/YYYY`
///
/// Returns `"Data inválida"` when the input cannot be parsed.
pub fn format_date_ddmmyyyy(input: &str) -> String {
    let input = input.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return ts.format("%d/%m/%Y").to_string();
    }

    // Plain dates, optionally followed by a time component
    let date_part = input.get(..10).unwrap_or(input);
    match NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
        Ok(date) => date.format("%d/%m/%Y").to_string(),
        Err(_) => "Data inválida".to_string(),
    }
}

/// Parses a server timestamp leniently
///
/// Accepts RFC 3339, a datetime without offset (`T` or space separated,
/// taken as UTC) and a plain `YYYY-MM-DD` date (midnight UTC).
pub fn parse_timestamp(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Some(ts.with_timezone(&Utc));
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, pattern) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Formats a UTC timestamp as `DD/MM/YYYY`
pub fn format_timestamp_ddmmyyyy(ts: &DateTime<Utc>) -> String {
    ts.format("%d/%m/%Y").to_string()
}

/// Header shown above the exam list: "1 exame compartilhado" / "N exames compartilhados"
pub fn exam_count_label(count: usize) -> String {
    if count == 1 {
        "1 exame compartilhado".to_string()
    } else {
        format!("{count} exames compartilhados")
    }
}

/// Shown for exams without attachments
pub const NO_FILES_LABEL: &str = "PDF não disponível";
