//! Field normalization
//!
//! Every regulator has its own tenement-type codes, status vocabulary and date
//! encoding. The functions here fold them into one vocabulary. Unmapped codes
//! pass through trimmed so nothing upstream is silently lost.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use tenement_common::Jurisdiction;

/// Tenement-type codes per jurisdiction
fn type_table(jurisdiction: Jurisdiction) -> &'static [(&'static str, &'static str)] {
    match jurisdiction {
        Jurisdiction::Wa => &[
            ("E", "Exploration Licence"),
            ("EL", "Exploration Licence"),
            ("M", "Mining Lease"),
            ("ML", "Mining Lease"),
            ("P", "Prospecting Licence"),
            ("PL", "Prospecting Licence"),
            ("L", "Miscellaneous Licence"),
            ("G", "General Purpose Lease"),
            ("R", "Retention Licence"),
        ],
        Jurisdiction::Nsw => &[
            ("EL", "Exploration Licence"),
            ("ML", "Mining Lease"),
            ("AL", "Assessment Lease"),
            ("MPL", "Mining Purposes Lease"),
            ("CML", "Consolidated Mining Lease"),
            ("PLL", "Petroleum Lease"),
        ],
        Jurisdiction::Vic => &[
            ("EL", "Exploration Licence"),
            ("MIN", "Mining Licence"),
            ("ML", "Mining Licence"),
            ("RL", "Retention Licence"),
            ("PL", "Prospecting Licence"),
        ],
        Jurisdiction::Nt => &[
            ("EL", "Exploration Licence"),
            ("ELR", "Exploration Licence in Retention"),
            ("ML", "Mineral Lease"),
            ("MA", "Mineral Authority"),
            ("EMEL", "Extractive Mineral Exploration Licence"),
            ("EMP", "Extractive Mineral Permit"),
        ],
        Jurisdiction::Qld => &[
            ("EPM", "Exploration Permit for Minerals"),
            ("EPC", "Exploration Permit for Coal"),
            ("ML", "Mining Lease"),
            ("MDL", "Mineral Development Licence"),
            ("PP", "Prospecting Permit"),
        ],
        Jurisdiction::Tas => &[
            ("EL", "Exploration Licence"),
            ("ML", "Mining Lease"),
            ("RL", "Retention Licence"),
            ("SEL", "Special Exploration Licence"),
        ],
    }
}

const STATUS_TABLE: &[(&str, &str)] = &[
    ("LIVE", "Active"),
    ("ACTIVE", "Active"),
    ("GRANTED", "Active"),
    ("CURRENT", "Active"),
    ("PENDING", "Pending"),
    ("APPLICATION", "Pending"),
    ("EXPIRED", "Expired"),
    ("CANCELLED", "Expired"),
    ("SURRENDERED", "Expired"),
];

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

/// Map a raw tenement-type code to its long label
pub fn normalize_type(raw: &str, jurisdiction: Jurisdiction) -> String {
    let trimmed = raw.trim();
    type_table(jurisdiction)
        .iter()
        .find(|(code, _)| code.eq_ignore_ascii_case(trimmed))
        .map(|(_, label)| (*label).to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

/// Map a raw status to Active, Pending or Expired
///
/// The table is shared by every jurisdiction; the parameter keeps the call
/// sites uniform with [`normalize_type`].
pub fn normalize_status(raw: &str, _jurisdiction: Jurisdiction) -> String {
    let trimmed = raw.trim();
    STATUS_TABLE
        .iter()
        .find(|(code, _)| code.eq_ignore_ascii_case(trimmed))
        .map(|(_, label)| (*label).to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

/// Upper-cased number with runs of whitespace collapsed to one space
pub fn canonical_number(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Alphabetic prefix of a tenement number (`EL9123` gives `EL`)
pub fn type_from_number(number: &str) -> Option<String> {
    let prefix: String = number
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    (!prefix.is_empty()).then(|| prefix.to_ascii_uppercase())
}

/// Coerce an attribute of unknown encoding into a date
pub fn coerce_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .and_then(date_from_epoch_millis),
        Value::String(s) => parse_date(s),
        _ => None,
    }
}

/// Parse a textual date in any of the encodings the regulators publish
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if s.chars().all(|c| c.is_ascii_digit()) {
        if s.len() == 8 {
            return NaiveDate::parse_from_str(s, "%Y%m%d").ok();
        }
        return s.parse::<i64>().ok().and_then(date_from_epoch_millis);
    }
    if let Some(digits) = s.strip_prefix('-') {
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            return s.parse::<i64>().ok().and_then(date_from_epoch_millis);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.date());
        }
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.date_naive());
    }

    // Date part of "DD/MM/YYYY 12:00:00 AM" style exports
    let date_part = s.split_whitespace().next().unwrap_or(s);
    for format in ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(date_part, format) {
            return Some(date);
        }
    }

    parse_day_month_name(date_part)
}

/// `DD-Mon-YYYY`, month name case-insensitive
fn parse_day_month_name(s: &str) -> Option<NaiveDate> {
    let mut parts = s.split('-');
    let day: u32 = parts.next()?.parse().ok()?;
    let month_name = parts.next()?.to_ascii_uppercase();
    let year: i32 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    let month = MONTHS.iter().position(|m| month_name.starts_with(m))? as u32 + 1;
    NaiveDate::from_ymd_opt(year, month, day)
}

pub fn date_from_epoch_millis(millis: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp_millis(millis).map(|dt| dt.date_naive())
}

/// Area in hectares; negative and non-finite values are dropped
pub fn coerce_area(value: &Value) -> Option<f64> {
    let area = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    }?;
    (area.is_finite() && area >= 0.0).then_some(area)
}

/// Truthy flag values: Y, YES, TRUE, T, 1
pub fn coerce_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64().is_some_and(|v| v != 0),
        Value::String(s) => matches!(
            s.trim().to_ascii_uppercase().as_str(),
            "Y" | "YES" | "TRUE" | "T" | "1"
        ),
        _ => false,
    }
}
