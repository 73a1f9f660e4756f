//! Delimited text parsing (CSV and TAB)
//!
//! Used by the NSW CSV feed and the entries of the NT archive. Parsing is
//! tolerant: rows the csv reader rejects, or rows with no tenement number,
//! are skipped and counted rather than failing the file.

use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, Trim};
use tenement_common::Jurisdiction;
use tracing::{debug, warn};

use super::attributes::{map_record, Attributes, FieldMap};
use crate::ingest::models::TenementRecord;

/// One data row keyed by its header
#[derive(Debug, Clone)]
pub struct TabularRow {
    pub line: u64,
    pub attributes: Attributes,
}

/// Tab when the header line has more tabs than commas (outside quotes)
pub fn detect_delimiter(text: &str) -> u8 {
    let header = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let mut in_quotes = false;
    let (mut tabs, mut commas) = (0usize, 0usize);

    for c in header.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            '\t' if !in_quotes => tabs += 1,
            ',' if !in_quotes => commas += 1,
            _ => {},
        }
    }

    if tabs > commas {
        b'\t'
    } else {
        b','
    }
}

/// Parse a whole file into header-keyed rows
pub fn parse_rows(text: &str, delimiter: u8) -> Vec<TabularRow> {
    let text = text.trim_start_matches('\u{feff}');
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers = match reader.headers() {
        Ok(h) => h.clone(),
        Err(e) => {
            warn!(error = %e, "Unreadable header row");
            return Vec::new();
        },
    };

    let mut rows = Vec::new();
    let mut rejected = 0usize;

    for result in reader.records() {
        match result {
            Ok(record) => {
                let line = record.position().map(|p| p.line()).unwrap_or_default();
                let attributes = Attributes::from_pairs(
                    headers
                        .iter()
                        .zip(record.iter())
                        .filter(|(h, _)| !h.is_empty())
                        .map(|(h, v)| (h, v.to_string())),
                );
                if !attributes.is_empty() {
                    rows.push(TabularRow { line, attributes });
                }
            },
            Err(e) => {
                rejected += 1;
                debug!(error = %e, "Skipping unreadable row");
            },
        }
    }

    if rejected > 0 {
        warn!(rejected, "Rows rejected by the delimited reader");
    }

    rows
}

/// Parse a file and map every usable row
pub fn records_from_text(
    text: &str,
    jurisdiction: Jurisdiction,
    fields: &FieldMap,
    synced_at: DateTime<Utc>,
) -> Vec<TenementRecord> {
    let delimiter = detect_delimiter(text);
    let rows = parse_rows(text, delimiter);
    let total = rows.len();

    let records: Vec<TenementRecord> = rows
        .into_iter()
        .filter_map(|row| {
            let record = map_record(&row.attributes, jurisdiction, fields, None, synced_at);
            if record.is_none() {
                debug!(line = row.line, "Row has no tenement number");
            }
            record
        })
        .collect();

    if records.len() < total {
        debug!(
            skipped = total - records.len(),
            total,
            jurisdiction = %jurisdiction,
            "Skipped rows without a tenement number"
        );
    }

    records
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_fields_keep_embedded_delimiters() {
        let text = "Holder,Title,Status\n\"Smith, Jones Pty Ltd\",ML123,Active\n\"He said \"\"hi\"\"\",EL9,\"Current\"\n";
        let rows = parse_rows(text, detect_delimiter(text));

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].attributes.text(&["holder"]).as_deref(), Some("Smith, Jones Pty Ltd"));
        assert_eq!(rows[0].attributes.text(&["title"]).as_deref(), Some("ML123"));
        assert_eq!(rows[0].attributes.text(&["status"]).as_deref(), Some("Active"));
        assert_eq!(rows[1].attributes.text(&["holder"]).as_deref(), Some(r#"He said "hi""#));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("TITLE_ID\tTYPE\tSTATUS\n"), b'\t');
        assert_eq!(detect_delimiter("Title,Type,Status\n"), b',');
        assert_eq!(detect_delimiter("\"a\tb\",c\n"), b',');
    }

    #[test]
    fn test_parse_rows_keeps_quoted_delimiters() {
        let text = "Title,Holder,Status\nEL9123,\"Acme, Pty Ltd\",Current\n";
        let rows = parse_rows(text, b',');
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].attributes.text(&["holder"]).as_deref(), Some("Acme, Pty Ltd"));
    }

    #[test]
    fn test_records_from_text_skips_rows_without_number() {
        let text = "\u{feff}Title Number,Title Type,Status,Holder\n\
                    EL9123,EL,Current,Acme\n\
                    ,ML,Current,Nobody\n\
                    ML1234,ML,Expired,Beta\n";
        let fields = FieldMap::for_jurisdiction(Jurisdiction::Nsw);
        let records = records_from_text(text, Jurisdiction::Nsw, &fields, Utc::now());

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].number, "EL9123");
        assert_eq!(records[1].status, "Expired");
        assert_eq!(records[1].tenement_type, "Mining Lease");
    }
}
