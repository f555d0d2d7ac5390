//! Date handling for issue dates and output file names

use std::fmt::Write as _;

use chrono::format::{Item, StrftimeItems};
use chrono::{Local, NaiveDate, NaiveDateTime};
use crate::error::{Error, Result};

/// Issue date expression types
#[derive(Debug, Clone, PartialEq)]
pub enum DateExpression {
    /// Use today's date
    Today,
    /// Use an explicit date
    Explicit(NaiveDate),
}

/// Parse an issue date expression
///
/// Supported formats:
/// - `"today"` → Today
/// - `"2024-11-20"` → Explicit date (ISO format)
/// - `"20/11/2024"` → Explicit date (day first)
pub fn parse_date_expression(expr: &str) -> Result<DateExpression> {
    let expr = expr.trim();

    if expr.eq_ignore_ascii_case("today") {
        return Ok(DateExpression::Today);
    }

    if let Ok(date) = NaiveDate::parse_from_str(expr, "%Y-%m-%d") {
        return Ok(DateExpression::Explicit(date));
    }

    if let Ok(date) = NaiveDate::parse_from_str(expr, "%d/%m/%Y") {
        return Ok(DateExpression::Explicit(date));
    }

    Err(Error::InvalidDateExpression(format!("Unable to parse date expression: {}", expr)))
}

/// Resolve a DateExpression to an actual date
pub fn resolve_date(expr: &DateExpression) -> NaiveDate {
    match expr {
        DateExpression::Today => Local::now().date_naive(),
        DateExpression::Explicit(date) => *date,
    }
}

/// Format a date with a chrono format string, e.g. `"%Y-%m-%d"`
///
/// Fails on unknown specifiers and on time fields, which a date cannot fill.
pub fn format_date(date: &NaiveDate, format: &str) -> Result<String> {
    let items = StrftimeItems::new(format);
    if items.clone().any(|item| matches!(item, Item::Error)) {
        return Err(Error::Config(format!("Invalid date format: {:?}", format)));
    }

    let mut out = String::new();
    write!(out, "{}", date.format_with_items(items))
        .map_err(|_| Error::Config(format!("Date format {:?} needs more than a date", format)))?;
    Ok(out)
}

/// Timestamp fragment used for fallback output names: `20240120_153012_045`
pub fn timestamp_stamp(at: &NaiveDateTime) -> String {
    at.format("%Y%m%d_%H%M%S_%3f").to_string()
}

/// Current local time as a file name fragment
pub fn now_stamp() -> String {
    timestamp_stamp(&Local::now().naive_local())
}
