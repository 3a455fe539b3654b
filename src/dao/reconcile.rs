//! Repository to package association reconciliation.
//!
//! After ingestion the association set of a repository must equal the
//! package uuids of its latest listing. Removals run before additions and each
//! is applied in bounded batches; a failure part way leaves the work already
//! committed in place and the next ingestion converges it.

use std::collections::HashSet;

use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect, Set};
use uuid::Uuid;

use crate::dao::checksums::batch_ranges;
use crate::models::repository_rpm;

/// Associations to insert and delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssociationDelta {
    pub to_add: Vec<Uuid>,
    pub to_remove: Vec<Uuid>,
}

impl AssociationDelta {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Bounds applied to reconciliation batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileLimits {
    pub in_clause_limit: usize,
    pub insert_batch_size: usize,
}

/// Rows changed by a reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub added: u64,
    pub removed: u64,
}

/// `desired - existing` (in desired order) and `existing - desired` (in existing order).
pub fn compute_delta(existing: &[Uuid], desired: &[Uuid]) -> AssociationDelta {
    let existing_set: HashSet<&Uuid> = existing.iter().collect();
    let desired_set: HashSet<&Uuid> = desired.iter().collect();

    let mut queued = HashSet::new();
    let to_add = desired
        .iter()
        .filter(|uuid| !existing_set.contains(uuid) && queued.insert(**uuid))
        .copied()
        .collect();

    let to_remove = existing
        .iter()
        .filter(|uuid| !desired_set.contains(uuid))
        .copied()
        .collect();

    AssociationDelta { to_add, to_remove }
}

/// Makes the association set of `repository_uuid` equal to `desired`.
pub async fn reconcile_associations<C: ConnectionTrait>(
    db: &C,
    repository_uuid: Uuid,
    desired: &[Uuid],
    limits: ReconcileLimits,
) -> Result<ReconcileOutcome, DbErr> {
    let existing: Vec<Uuid> = repository_rpm::Entity::find()
        .select_only()
        .column(repository_rpm::Column::RpmUuid)
        .filter(repository_rpm::Column::RepositoryUuid.eq(repository_uuid))
        .into_tuple()
        .all(db)
        .await?;

    let delta = compute_delta(&existing, desired);
    let mut outcome = ReconcileOutcome::default();

    for range in batch_ranges(delta.to_remove.len(), limits.in_clause_limit) {
        let result = repository_rpm::Entity::delete_many()
            .filter(repository_rpm::Column::RepositoryUuid.eq(repository_uuid))
            .filter(repository_rpm::Column::RpmUuid.is_in(delta.to_remove[range].iter().copied()))
            .exec(db)
            .await?;
        outcome.removed += result.rows_affected;
    }

    for range in batch_ranges(delta.to_add.len(), limits.insert_batch_size) {
        let rows = delta.to_add[range]
            .iter()
            .map(|rpm_uuid| repository_rpm::ActiveModel {
                repository_uuid: Set(repository_uuid),
                rpm_uuid: Set(*rpm_uuid),
            });

        outcome.added += repository_rpm::Entity::insert_many(rows)
            .on_conflict(
                OnConflict::columns([
                    repository_rpm::Column::RepositoryUuid,
                    repository_rpm::Column::RpmUuid,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(db)
            .await?;
    }

    tracing::debug!(
        repository_uuid = %repository_uuid,
        added = outcome.added,
        removed = outcome.removed,
        "Reconciled repository package associations"
    );

    Ok(outcome)
}
