//! # Data Models
//!
//! This module contains the SeaORM entities backing the content catalog.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod module_stream;
pub mod repository;
pub mod repository_configuration;
pub mod repository_module_stream;
pub mod repository_rpm;
pub mod rpm;
pub mod snapshot;
pub mod template;
pub mod template_repository_configuration;

pub use module_stream::Entity as ModuleStream;
pub use repository::Entity as Repository;
pub use repository_configuration::Entity as RepositoryConfiguration;
pub use repository_module_stream::Entity as RepositoryModuleStream;
pub use repository_rpm::Entity as RepositoryRpm;
pub use rpm::Entity as Rpm;
pub use snapshot::Entity as Snapshot;
pub use template::Entity as Template;
pub use template_repository_configuration::Entity as TemplateRepositoryConfiguration;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "content-sources".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
