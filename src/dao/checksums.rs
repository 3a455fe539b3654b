//! Checksum deduplication for package ingestion.
//!
//! Packages are global rows keyed by checksum. Before inserting a listing we
//! look up which checksums already exist, partitioning the lookup so no single
//! `IN (...)` list exceeds the configured bound.

use std::collections::HashSet;
use std::ops::Range;

use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect};

use crate::dao::rpms::PackageInput;
use crate::models::rpm;

/// Checksums already present in the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChecksumLookup {
    pub found: HashSet<String>,
    /// Number of existence queries issued
    pub batches: usize,
}

/// Splits `0..len` into consecutive ranges of at most `limit` items.
pub fn batch_ranges(len: usize, limit: usize) -> Vec<Range<usize>> {
    let limit = limit.max(1);
    (0..len)
        .step_by(limit)
        .map(|start| start..(start + limit).min(len))
        .collect()
}

/// Loads the subset of `checksums` that already exists, one query per batch.
pub async fn existing_checksums<C: ConnectionTrait>(
    db: &C,
    checksums: &[String],
    in_clause_limit: usize,
) -> Result<ChecksumLookup, DbErr> {
    let mut lookup = ChecksumLookup::default();

    for range in batch_ranges(checksums.len(), in_clause_limit) {
        let found: Vec<String> = rpm::Entity::find()
            .select_only()
            .column(rpm::Column::Checksum)
            .filter(rpm::Column::Checksum.is_in(checksums[range].iter().cloned()))
            .into_tuple()
            .all(db)
            .await?;

        lookup.batches += 1;
        lookup.found.extend(found);
    }

    tracing::debug!(
        candidates = checksums.len(),
        found = lookup.found.len(),
        batches = lookup.batches,
        "Resolved existing package checksums"
    );

    Ok(lookup)
}

/// Candidates whose checksum is not yet stored, in input order.
///
/// Repeated checksums inside `candidates` keep only their first occurrence.
pub fn filter_new_packages<'a>(
    candidates: &'a [PackageInput],
    existing: &HashSet<String>,
) -> Vec<&'a PackageInput> {
    let mut seen = HashSet::with_capacity(candidates.len());
    candidates
        .iter()
        .filter(|package| !existing.contains(&package.checksum))
        .filter(|package| seen.insert(package.checksum.as_str()))
        .collect()
}
