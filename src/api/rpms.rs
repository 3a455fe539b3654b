//! Package request and response bodies.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::clients::IndexedPackage;
use crate::models::rpm;

/// Default number of names returned by package searches
pub const SEARCH_LIMIT_DEFAULT: u64 = 100;
/// Upper bound for package search limits
pub const SEARCH_LIMIT_MAXIMUM: u64 = 500;

/// A package listed in a repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RepositoryRpm {
    /// Identifier of the rpm
    pub uuid: Uuid,
    pub name: String,
    pub arch: String,
    pub version: String,
    pub release: String,
    pub epoch: i32,
    pub summary: String,
    pub checksum: String,
}

impl From<rpm::Model> for RepositoryRpm {
    fn from(model: rpm::Model) -> Self {
        Self {
            uuid: model.uuid,
            name: model.name,
            arch: model.arch,
            version: model.version,
            release: model.release,
            epoch: model.epoch,
            summary: model.summary,
            checksum: model.checksum,
        }
    }
}

/// A package inside a snapshot, as reported by the content index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SnapshotRpm {
    pub name: String,
    pub arch: String,
    pub version: String,
    pub release: String,
    pub epoch: String,
    pub summary: String,
}

impl From<IndexedPackage> for SnapshotRpm {
    fn from(package: IndexedPackage) -> Self {
        Self {
            name: package.name,
            arch: package.arch,
            version: package.version,
            release: package.release,
            epoch: package.epoch,
            summary: package.summary,
        }
    }
}

/// Query parameters for `GET /repositories/{uuid}/rpms`
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RepositoryRpmQuery {
    /// Substring filter on the package name
    pub search: Option<String>,
    /// `name`, `release`, `version` or `arch`, optionally suffixed with `:asc`/`:desc`
    pub sort_by: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Query parameters for snapshot and template package listings
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SnapshotRpmQuery {
    /// Name filter forwarded to the content index
    pub search: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Search for package names across repositories
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ContentUnitSearchRequest {
    /// URLs of repositories to search
    #[serde(default)]
    pub urls: Vec<String>,
    /// Repository configuration UUIDs to search
    #[serde(default)]
    pub uuids: Vec<Uuid>,
    /// Case-insensitive name prefix
    #[serde(default)]
    pub search: String,
    /// Exact package names; takes precedence over `search`
    #[serde(default)]
    pub exact_names: Vec<String>,
    /// Maximum number of records to return (default 100, max 500)
    pub limit: Option<u64>,
    /// Whether to include module information
    #[serde(default)]
    pub include_package_sources: bool,
}

/// Search for package names inside snapshots
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SnapshotSearchRpmRequest {
    /// Snapshot UUIDs to search
    #[serde(default)]
    pub uuids: Vec<Uuid>,
    #[serde(default)]
    pub search: String,
    pub limit: Option<u64>,
    #[serde(default)]
    pub include_package_sources: bool,
}

/// Detect which package names exist in a set of repositories
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct DetectRpmsRequest {
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub uuids: Vec<Uuid>,
    /// Package names to look for
    #[serde(default)]
    pub rpm_names: Vec<String>,
    pub limit: Option<u64>,
}

/// A distinct package name matched by a search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SearchRpmResponse {
    pub package_name: String,
    pub summary: String,
    /// Module streams (or a plain package entry) providing the package
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub package_sources: Vec<PackageSourcesResponse>,
}

/// Where a searched package comes from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PackageSourcesResponse {
    /// `package` or `module`
    #[serde(rename = "type")]
    pub source_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stream: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub context: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub arch: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Lifecycle start date from the roadmap service
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub start_date: String,
    /// Lifecycle end date from the roadmap service
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub end_date: String,
}

impl PackageSourcesResponse {
    pub fn package() -> Self {
        Self {
            source_type: "package".to_string(),
            ..Default::default()
        }
    }
}

/// Package names found and missing in the requested repositories
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DetectRpmsResponse {
    pub found: Vec<String>,
    pub missing: Vec<String>,
}
