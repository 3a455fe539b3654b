//! Public repository listing types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::repository::{self, IntrospectionStatus, RepositoryOrigin};

/// A repository readable by every organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PublicRepository {
    pub uuid: Uuid,
    pub url: String,
    pub origin: RepositoryOrigin,
    pub status: IntrospectionStatus,
    pub last_introspection_time: Option<DateTime<Utc>>,
    pub last_introspection_success_time: Option<DateTime<Utc>>,
    pub last_introspection_update_time: Option<DateTime<Utc>>,
    pub last_introspection_error: Option<String>,
    pub failed_introspections_count: i32,
    pub package_count: i32,
}

impl From<repository::Model> for PublicRepository {
    fn from(model: repository::Model) -> Self {
        Self {
            uuid: model.uuid,
            url: model.url,
            origin: model.origin,
            status: model.status,
            last_introspection_time: model.last_introspection_time.map(|d| d.with_timezone(&Utc)),
            last_introspection_success_time: model
                .last_introspection_success_time
                .map(|d| d.with_timezone(&Utc)),
            last_introspection_update_time: model
                .last_introspection_update_time
                .map(|d| d.with_timezone(&Utc)),
            last_introspection_error: model.last_introspection_error,
            failed_introspections_count: model.failed_introspections_count,
            package_count: model.package_count,
        }
    }
}
