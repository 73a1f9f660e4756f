//! Built-in sample tenements served when a live VIC feed is unavailable

use chrono::{DateTime, NaiveDate, Utc};
use tenement_common::Jurisdiction;

use crate::ingest::models::TenementRecord;
use crate::ingest::normalizer::{normalize_status, normalize_type};

// number, type code, status, holder, grant (y, m, d), expiry (y, m, d), area
type SampleRow = (&'static str, &'static str, &'static str, &'static str, (i32, u32, u32), (i32, u32, u32), f64);

const VIC_SAMPLE: &[SampleRow] = &[
    ("EL6789", "EL", "Current", "Goldfields Exploration Pty Ltd", (2019, 4, 2), (2024, 4, 1), 12_500.0),
    ("EL7012", "EL", "Current", "Ballarat Minerals Ltd", (2021, 9, 14), (2026, 9, 13), 8_430.0),
    ("MIN5567", "MIN", "Current", "Bendigo Mining Ltd", (2008, 11, 20), (2028, 11, 19), 1_210.5),
    ("RL2003", "RL", "Current", "Stawell Gold Mines Pty Ltd", (2016, 2, 8), (2026, 2, 7), 420.0),
    ("EL5430", "EL", "Expired", "Gippsland Resources NL", (2012, 6, 30), (2017, 6, 29), 9_800.0),
];

/// Sample records for a jurisdiction; only VIC has a set
pub fn sample_records(jurisdiction: Jurisdiction, synced_at: DateTime<Utc>) -> Vec<TenementRecord> {
    let rows: &[SampleRow] = match jurisdiction {
        Jurisdiction::Vic => VIC_SAMPLE,
        _ => &[],
    };

    rows.iter()
        .map(|(number, code, status, holder, grant, expiry, area)| {
            let mut record = TenementRecord::new(
                jurisdiction,
                *number,
                normalize_type(code, jurisdiction),
                normalize_status(status, jurisdiction),
                synced_at,
            );
            record.holder_name = Some((*holder).to_string());
            record.grant_date = NaiveDate::from_ymd_opt(grant.0, grant.1, grant.2);
            record.expiry_date = NaiveDate::from_ymd_opt(expiry.0, expiry.1, expiry.2);
            record.area_ha = Some(*area);
            record
        })
        .collect()
}
