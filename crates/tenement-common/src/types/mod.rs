//! Common types used across the tenement workspace

use serde::{Deserialize, Serialize};

use crate::error::CommonError;

/// Australian state/territory mining regulator
///
/// Every tenement number is only unique within its jurisdiction, so this is
/// half of the natural key of a stored tenement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Jurisdiction {
    Wa,
    Nsw,
    Vic,
    Nt,
    Qld,
    Tas,
}

impl Jurisdiction {
    /// All jurisdictions in a stable order
    pub const ALL: [Jurisdiction; 6] = [
        Jurisdiction::Wa,
        Jurisdiction::Nsw,
        Jurisdiction::Vic,
        Jurisdiction::Nt,
        Jurisdiction::Qld,
        Jurisdiction::Tas,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Jurisdiction::Wa => "WA",
            Jurisdiction::Nsw => "NSW",
            Jurisdiction::Vic => "VIC",
            Jurisdiction::Nt => "NT",
            Jurisdiction::Qld => "QLD",
            Jurisdiction::Tas => "TAS",
        }
    }

    /// Full state or territory name
    pub fn display_name(&self) -> &'static str {
        match self {
            Jurisdiction::Wa => "Western Australia",
            Jurisdiction::Nsw => "New South Wales",
            Jurisdiction::Vic => "Victoria",
            Jurisdiction::Nt => "Northern Territory",
            Jurisdiction::Qld => "Queensland",
            Jurisdiction::Tas => "Tasmania",
        }
    }
}

impl std::fmt::Display for Jurisdiction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Jurisdiction {
    type Err = CommonError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "WA" => Ok(Jurisdiction::Wa),
            "NSW" => Ok(Jurisdiction::Nsw),
            "VIC" => Ok(Jurisdiction::Vic),
            "NT" => Ok(Jurisdiction::Nt),
            "QLD" => Ok(Jurisdiction::Qld),
            "TAS" => Ok(Jurisdiction::Tas),
            _ => Err(CommonError::UnknownJurisdiction(s.to_string())),
        }
    }
}

/// Wire format of an upstream data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    /// ArcGIS REST feature service (`/query`, paged)
    ArcgisRest,
    /// OGC WFS 2.0 GetFeature with GeoJSON output
    Wfs,
    /// Raw CSV over HTTP
    Csv,
    /// ZIP archive holding CSV/TAB files
    TabInZip,
}

impl SourceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::ArcgisRest => "arcgis_rest",
            SourceFormat::Wfs => "wfs",
            SourceFormat::Csv => "csv",
            SourceFormat::TabInZip => "tab_in_zip",
        }
    }
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceFormat {
    type Err = CommonError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "arcgis_rest" | "arcgis" | "rest" => Ok(SourceFormat::ArcgisRest),
            "wfs" => Ok(SourceFormat::Wfs),
            "csv" => Ok(SourceFormat::Csv),
            "tab_in_zip" | "zip" => Ok(SourceFormat::TabInZip),
            _ => Err(CommonError::UnknownSourceFormat(s.to_string())),
        }
    }
}
