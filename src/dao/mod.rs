//! # Data Access Layer
//!
//! DAO types wrapping SeaORM operations for the catalog. Every DAO is built
//! from a [`DaoRegistry`], which carries the connection pool, the injected
//! [`CatalogPolicy`] and the optional external collaborators.

use std::sync::Arc;

use sea_orm::{ConnectionTrait, DatabaseConnection, Order};

use crate::clients::{ContentIndex, EntitlementClient, RoadmapClient};
use crate::config::CatalogPolicy;

pub mod checksums;
pub mod orphans;
pub mod reconcile;
pub mod repositories;
pub mod rpms;
pub mod snapshots;
pub mod template_diff;
pub mod templates;
pub mod visibility;

pub use orphans::{OrphanCollector, OrphanSweepReport};
pub use repositories::RepositoryDao;
pub use rpms::{IngestReport, PackageInput, RpmDao};
pub use snapshots::SnapshotDao;
pub use templates::TemplateDao;

/// Shared handles needed to build DAOs.
#[derive(Clone)]
pub struct DaoRegistry {
    pub db: DatabaseConnection,
    pub policy: Arc<CatalogPolicy>,
    pub content_index: Option<Arc<dyn ContentIndex>>,
    pub roadmap: Option<Arc<dyn RoadmapClient>>,
    pub entitlements: Option<Arc<dyn EntitlementClient>>,
}

impl DaoRegistry {
    /// The policy's batch limits are capped for the connection's backend.
    pub fn new(db: DatabaseConnection, policy: CatalogPolicy) -> Self {
        let policy = policy.for_backend(db.get_database_backend());
        Self {
            db,
            policy: Arc::new(policy),
            content_index: None,
            roadmap: None,
            entitlements: None,
        }
    }

    pub fn with_content_index(mut self, index: Arc<dyn ContentIndex>) -> Self {
        self.content_index = Some(index);
        self
    }

    pub fn with_roadmap(mut self, roadmap: Arc<dyn RoadmapClient>) -> Self {
        self.roadmap = Some(roadmap);
        self
    }

    pub fn with_entitlements(mut self, entitlements: Arc<dyn EntitlementClient>) -> Self {
        self.entitlements = Some(entitlements);
        self
    }

    pub fn rpms(&self) -> RpmDao {
        RpmDao::new(
            self.db.clone(),
            Arc::clone(&self.policy),
            self.content_index.clone(),
            self.roadmap.clone(),
        )
    }

    pub fn repositories(&self) -> RepositoryDao {
        RepositoryDao::new(self.db.clone(), Arc::clone(&self.policy))
    }

    pub fn templates(&self) -> TemplateDao {
        TemplateDao::new(self.db.clone(), Arc::clone(&self.policy))
    }

    pub fn snapshots(&self) -> SnapshotDao {
        SnapshotDao::new(self.db.clone(), Arc::clone(&self.policy))
    }
}

/// Resolves a `sort_by` value such as `name:desc,version` against the allowed columns.
///
/// Unknown fields are ignored; when nothing usable remains `default` is returned.
pub(crate) fn sort_order<C: Copy>(
    sort_by: Option<&str>,
    columns: &[(&str, C)],
    default: (C, Order),
) -> Vec<(C, Order)> {
    let mut orders = Vec::new();

    for part in sort_by.unwrap_or_default().split(',') {
        let mut pieces = part.trim().splitn(2, ':');
        let field = pieces.next().unwrap_or_default().trim();
        let direction = match pieces.next().map(|d| d.trim().to_ascii_lowercase()) {
            Some(d) if d == "desc" => Order::Desc,
            _ => Order::Asc,
        };

        if let Some((_, column)) = columns.iter().find(|(name, _)| *name == field) {
            orders.push((*column, direction));
        }
    }

    if orders.is_empty() {
        orders.push(default);
    }
    orders
}
