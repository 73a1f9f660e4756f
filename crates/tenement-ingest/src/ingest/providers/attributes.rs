//! Attribute lookup and record mapping
//!
//! ArcGIS attributes, WFS properties and tabular rows all arrive as loose
//! key/value bags with regulator-specific column names. [`Attributes`] indexes
//! them by a normalized key (lower-case ASCII alphanumerics only), so
//! `TENEMENT_NO`, `Tenement No` and `tenementno` are the same column.
//! [`FieldMap`] lists the candidate columns for each canonical field.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tenement_common::Jurisdiction;

use crate::ingest::models::TenementRecord;
use crate::ingest::normalizer::{
    canonical_number, coerce_area, coerce_date, coerce_flag, normalize_status, normalize_type,
    type_from_number,
};

/// Placeholder for a missing type or status column
pub const UNKNOWN: &str = "Unknown";

pub fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Attribute bag indexed by normalized key
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    values: HashMap<String, Value>,
}

impl Attributes {
    pub fn from_map(map: Map<String, Value>) -> Self {
        let mut values = HashMap::with_capacity(map.len());
        for (key, value) in map {
            values.entry(normalize_key(&key)).or_insert(value);
        }
        Self { values }
    }

    /// Tabular cells; the first column wins when two headers normalize alike
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut values = HashMap::new();
        for (key, value) in pairs {
            values
                .entry(normalize_key(key.as_ref()))
                .or_insert_with(|| Value::String(value.into()));
        }
        Self { values }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// First alias holding a non-null, non-blank value
    pub fn get(&self, aliases: &[&str]) -> Option<&Value> {
        aliases.iter().find_map(|alias| {
            self.values.get(&normalize_key(alias)).filter(|v| match v {
                Value::Null => false,
                Value::String(s) => !s.trim().is_empty(),
                _ => true,
            })
        })
    }

    /// Trimmed text of the first populated alias; numbers are rendered
    pub fn text(&self, aliases: &[&str]) -> Option<String> {
        match self.get(aliases)? {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

/// Candidate column names for each canonical field, most specific first
#[derive(Debug, Clone)]
pub struct FieldMap {
    pub number: Vec<&'static str>,
    pub tenement_type: Vec<&'static str>,
    pub status: Vec<&'static str>,
    pub holder: Vec<&'static str>,
    pub application_date: Vec<&'static str>,
    pub grant_date: Vec<&'static str>,
    pub expiry_date: Vec<&'static str>,
    pub anniversary_date: Vec<&'static str>,
    pub markout_date: Vec<&'static str>,
    pub area: Vec<&'static str>,
    pub section29: Vec<&'static str>,
}

const NUMBER: &[&str] = &[
    "tenement_id", "tenement_no", "tenement_number", "title_no", "title_number", "title_id",
    "permit_no", "lease_no", "licence_no", "tenement", "title", "number",
];
const TYPE: &[&str] = &[
    "tenement_type", "title_type", "permit_type", "licence_type", "type_code", "type",
];
const STATUS: &[&str] = &["tenement_status", "title_status", "permit_status", "current_status", "status"];
const HOLDER: &[&str] = &[
    "holder_name", "holder", "holders", "title_holder", "titleholder", "authorised_holder_name",
    "applicant", "company",
];
const APPLICATION_DATE: &[&str] = &["application_date", "lodge_date", "lodged_date", "app_date", "date_applied"];
const GRANT_DATE: &[&str] = &["grant_date", "granted_date", "date_granted", "approve_date", "start_date"];
const EXPIRY_DATE: &[&str] = &["expiry_date", "expiry", "date_expiry", "end_date"];
const ANNIVERSARY_DATE: &[&str] = &["anniversary_date", "anniversary", "anniv_date"];
const MARKOUT_DATE: &[&str] = &["markout_date", "marked_out_date", "markout"];
const AREA: &[&str] = &["area_ha", "area_hectares", "legal_area", "hectares", "area"];
const SECTION29: &[&str] = &["section29_flag", "section29", "section_29", "sec29", "s29"];

impl FieldMap {
    /// Shared aliases with the regulator's own column names in front
    pub fn for_jurisdiction(jurisdiction: Jurisdiction) -> Self {
        let mut map = Self::common();
        match jurisdiction {
            Jurisdiction::Wa => {
                map.number.insert(0, "tenid");
                map.status.insert(0, "tenstatus");
                map.holder.insert(0, "holder1");
                map.grant_date.insert(0, "startdate");
                map.expiry_date.insert(0, "enddate");
            },
            Jurisdiction::Qld => {
                map.number.insert(0, "displayname");
                map.number.insert(1, "permitid");
                map.tenement_type.insert(0, "permittype");
                map.status.insert(0, "permitstatus");
                map.holder.insert(0, "authorisedholdername");
                map.application_date.insert(0, "lodgedate");
                map.grant_date.insert(0, "approvedate");
            },
            Jurisdiction::Vic => {
                map.number.insert(0, "tno");
                map.tenement_type.insert(0, "ttype");
                map.holder.insert(0, "pname");
            },
            Jurisdiction::Nt => {
                map.number.insert(0, "titleid");
                map.tenement_type.insert(0, "titletype");
            },
            Jurisdiction::Nsw | Jurisdiction::Tas => {},
        }
        map
    }

    fn common() -> Self {
        Self {
            number: NUMBER.to_vec(),
            tenement_type: TYPE.to_vec(),
            status: STATUS.to_vec(),
            holder: HOLDER.to_vec(),
            application_date: APPLICATION_DATE.to_vec(),
            grant_date: GRANT_DATE.to_vec(),
            expiry_date: EXPIRY_DATE.to_vec(),
            anniversary_date: ANNIVERSARY_DATE.to_vec(),
            markout_date: MARKOUT_DATE.to_vec(),
            area: AREA.to_vec(),
            section29: SECTION29.to_vec(),
        }
    }
}

/// Map one attribute bag to a canonical record
///
/// Returns `None` when no tenement number can be found. A missing type falls
/// back to the number's alphabetic prefix.
pub fn map_record(
    attrs: &Attributes,
    jurisdiction: Jurisdiction,
    fields: &FieldMap,
    geometry: Option<Value>,
    synced_at: DateTime<Utc>,
) -> Option<TenementRecord> {
    let number = attrs
        .text(&fields.number)
        .map(|n| canonical_number(&n))
        .filter(|n| !n.is_empty())?;

    let raw_type = attrs
        .text(&fields.tenement_type)
        .or_else(|| type_from_number(&number))
        .unwrap_or_else(|| UNKNOWN.to_string());
    let raw_status = attrs
        .text(&fields.status)
        .unwrap_or_else(|| UNKNOWN.to_string());

    let date = |aliases: &[&str]| attrs.get(aliases).and_then(coerce_date);

    Some(TenementRecord {
        tenement_type: normalize_type(&raw_type, jurisdiction),
        status: normalize_status(&raw_status, jurisdiction),
        holder_name: attrs.text(&fields.holder),
        application_date: date(&fields.application_date),
        grant_date: date(&fields.grant_date),
        expiry_date: date(&fields.expiry_date),
        anniversary_date: date(&fields.anniversary_date),
        markout_date: date(&fields.markout_date),
        area_ha: attrs.get(&fields.area).and_then(coerce_area),
        section29_flag: attrs.get(&fields.section29).is_some_and(coerce_flag),
        geometry: geometry.filter(|g| !g.is_null()),
        number,
        jurisdiction,
        last_sync_at: synced_at,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn attrs(value: Value) -> Attributes {
        match value {
            Value::Object(map) => Attributes::from_map(map),
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_lookup_ignores_case_and_punctuation() {
        let a = attrs(json!({"TENEMENT_NO": "E 45/1234", "Holder Name": " Acme Pty Ltd "}));
        assert_eq!(a.text(&["tenement no"]).as_deref(), Some("E 45/1234"));
        assert_eq!(a.text(&["holdername"]).as_deref(), Some("Acme Pty Ltd"));
    }

    #[test]
    fn test_blank_values_fall_through_to_next_alias() {
        let a = attrs(json!({"holder": "", "company": "Beta Mining"}));
        assert_eq!(a.text(&["holder", "company"]).as_deref(), Some("Beta Mining"));
    }

    #[test]
    fn test_map_wa_arcgis_attributes() {
        let a = attrs(json!({
            "TENID": "e 45/1234",
            "TYPE": "E",
            "TENSTATUS": "LIVE",
            "HOLDER1": "Acme Pty Ltd",
            "STARTDATE": 1579046400000i64,
            "ENDDATE": null,
            "LEGAL_AREA": 250.5,
            "SECTION29": "Y"
        }));
        let record = map_record(
            &a,
            Jurisdiction::Wa,
            &FieldMap::for_jurisdiction(Jurisdiction::Wa),
            None,
            Utc::now(),
        )
        .unwrap();

        assert_eq!(record.number, "E 45/1234");
        assert_eq!(record.tenement_type, "Exploration Licence");
        assert_eq!(record.status, "Active");
        assert_eq!(record.grant_date, NaiveDate::from_ymd_opt(2020, 1, 15));
        assert_eq!(record.expiry_date, None);
        assert_eq!(record.area_ha, Some(250.5));
        assert!(record.section29_flag);
    }

    #[test]
    fn test_type_derived_from_number_prefix() {
        let a = Attributes::from_pairs([("Title", "EL9123"), ("Status", "Current")]);
        let record = map_record(
            &a,
            Jurisdiction::Nsw,
            &FieldMap::for_jurisdiction(Jurisdiction::Nsw),
            None,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(record.tenement_type, "Exploration Licence");
        assert_eq!(record.status, "Active");
    }

    #[test]
    fn test_missing_number_is_skipped() {
        let a = Attributes::from_pairs([("Status", "Current")]);
        let fields = FieldMap::for_jurisdiction(Jurisdiction::Tas);
        assert!(map_record(&a, Jurisdiction::Tas, &fields, None, Utc::now()).is_none());
    }
}
