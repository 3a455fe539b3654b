//! Errata listing types.

use chrono::{NaiveDateTime, SecondsFormat};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::clients::ErrataRecord;

/// Timestamp layout used by the content index for errata dates
const INDEX_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Query parameters for errata listings
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ErrataQuery {
    /// Errata id filter
    pub search: Option<String>,
    /// Comma separated list of errata types
    #[serde(rename = "type")]
    pub errata_type: Option<String>,
    /// Comma separated list of severities
    pub severity: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub sort_by: Option<String>,
}

/// An erratum inside a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SnapshotErrata {
    pub id: String,
    pub errata_id: String,
    pub title: String,
    pub summary: String,
    pub description: String,
    /// RFC3339 UTC, or empty when the source date could not be parsed
    pub issued_date: String,
    pub updated_date: String,
    #[serde(rename = "type")]
    pub errata_type: String,
    pub severity: String,
    pub reboot_suggested: bool,
    pub cves: Vec<String>,
}

impl From<ErrataRecord> for SnapshotErrata {
    fn from(record: ErrataRecord) -> Self {
        Self {
            id: record.id,
            errata_id: record.errata_id,
            title: record.title,
            summary: record.summary,
            description: record.description,
            issued_date: reformat_errata_date(Some(&record.issued_date)),
            updated_date: reformat_errata_date(record.updated_date.as_deref()),
            errata_type: record.errata_type,
            severity: record.severity,
            reboot_suggested: record.reboot_suggested,
            cves: record.cves.unwrap_or_default(),
        }
    }
}

/// Converts `YYYY-MM-DD HH:MM:SS` (UTC) to RFC3339; anything else becomes "".
pub fn reformat_errata_date(raw: Option<&str>) -> String {
    raw.and_then(|value| NaiveDateTime::parse_from_str(value, INDEX_DATE_FORMAT).ok())
        .map(|parsed| {
            parsed
                .and_utc()
                .to_rfc3339_opts(SecondsFormat::Secs, true)
        })
        .unwrap_or_default()
}
