//! Template request and response bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::models::template;

/// Create a template
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TemplateRequest {
    /// Name of the template, unique per organization
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Repository configuration UUIDs pinned by the template
    #[serde(default)]
    pub repository_uuids: Vec<Uuid>,
    pub arch: Option<String>,
    pub version: Option<String>,
    /// Snapshot date the template pins; mutually exclusive with `use_latest`
    pub date: Option<DateTime<Utc>>,
    /// Follow the latest snapshot of every repository
    #[serde(default)]
    pub use_latest: Option<bool>,
    /// Organization, taken from the request header
    #[serde(skip)]
    pub org_id: Option<String>,
    /// Acting user, taken from the request header
    #[serde(skip)]
    pub user: Option<String>,
}

/// Partially update a template
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TemplateUpdateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Replaces the pinned repository configurations when present
    pub repository_uuids: Option<Vec<Uuid>>,
    pub arch: Option<String>,
    pub version: Option<String>,
    /// Absent leaves the date untouched, `null` clears it
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub date: Option<Option<DateTime<Utc>>>,
    pub use_latest: Option<bool>,
    #[serde(skip)]
    pub user: Option<String>,
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A template with its pinned repository configurations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TemplateResponse {
    pub uuid: Uuid,
    pub name: String,
    pub org_id: String,
    pub description: String,
    pub repository_uuids: Vec<Uuid>,
    pub arch: String,
    pub version: String,
    pub date: Option<DateTime<Utc>>,
    pub use_latest: bool,
    pub created_by: Option<String>,
    pub last_updated_by: Option<String>,
    pub last_update_task_uuid: Option<String>,
    pub last_update_snapshot_error: Option<String>,
    /// Entitlement environment backing the template
    pub rhsm_environment_id: String,
    pub rhsm_environment_created: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TemplateResponse {
    pub fn from_model(model: template::Model, repository_uuids: Vec<Uuid>) -> Self {
        Self {
            rhsm_environment_id: model.environment_id(),
            uuid: model.uuid,
            name: model.name,
            org_id: model.org_id,
            description: model.description,
            repository_uuids,
            arch: model.arch,
            version: model.version,
            date: model.date.map(|d| d.with_timezone(&Utc)),
            use_latest: model.use_latest,
            created_by: model.created_by,
            last_updated_by: model.last_updated_by,
            last_update_task_uuid: model.last_update_task_uuid,
            last_update_snapshot_error: model.last_update_snapshot_error,
            rhsm_environment_created: model.rhsm_environment_created,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
            deleted_at: model.deleted_at.map(|d| d.with_timezone(&Utc)),
        }
    }
}

/// Query parameters for `GET /templates`
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TemplateListQuery {
    /// Exact name match
    pub name: Option<String>,
    pub version: Option<String>,
    pub arch: Option<String>,
    /// Substring match on the name
    pub search: Option<String>,
    /// Comma separated repository configuration UUIDs the template must pin
    pub repository_uuids: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    /// `name`, `version`, `arch` or `created_at`, optionally suffixed with `:asc`/`:desc`
    pub sort_by: Option<String>,
}

/// Filters applied when listing templates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateFilters {
    pub name: Option<String>,
    pub version: Option<String>,
    pub arch: Option<String>,
    pub search: Option<String>,
    pub repository_uuids: Vec<Uuid>,
}
