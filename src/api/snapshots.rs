//! Snapshot response body.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::snapshot;

/// A point-in-time copy of a repository configuration's content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SnapshotResponse {
    pub uuid: Uuid,
    pub repository_configuration_uuid: Uuid,
    pub created_at: DateTime<Utc>,
    pub distribution_path: String,
    /// Count of each content type
    #[schema(value_type = Object)]
    pub content_counts: JsonValue,
    #[schema(value_type = Object)]
    pub added_counts: JsonValue,
    #[schema(value_type = Object)]
    pub removed_counts: JsonValue,
}

impl From<snapshot::Model> for SnapshotResponse {
    fn from(model: snapshot::Model) -> Self {
        Self {
            uuid: model.uuid,
            repository_configuration_uuid: model.repository_configuration_uuid,
            created_at: model.created_at.with_timezone(&Utc),
            distribution_path: model.distribution_path,
            content_counts: model.content_counts,
            added_counts: model.added_counts,
            removed_counts: model.removed_counts,
        }
    }
}
