//! # External Collaborators
//!
//! Seams to the services the catalog delegates to: the content index that
//! answers package and errata queries for snapshot versions, the roadmap
//! service that supplies module lifecycle dates, and the entitlement service
//! that exposes template content to subscribed hosts. Each is an injected
//! trait object so the DAO layer can run without any of them.

use async_trait::async_trait;
use thiserror::Error;

use crate::api::Page;

/// Errors reported by an external collaborator.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("no {0} configured")]
    NotConfigured(&'static str),
    #[error("{service} request failed: {message}")]
    Request {
        service: &'static str,
        message: String,
    },
}

/// A distinct package name matched in one or more repository versions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageHit {
    pub name: String,
    pub summary: String,
}

/// A package row inside a repository version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexedPackage {
    pub name: String,
    pub arch: String,
    pub version: String,
    pub release: String,
    pub epoch: String,
    pub summary: String,
}

/// An erratum as stored by the content index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrataRecord {
    pub id: String,
    pub errata_id: String,
    pub title: String,
    pub summary: String,
    pub description: String,
    /// `YYYY-MM-DD HH:MM:SS`
    pub issued_date: String,
    pub updated_date: Option<String>,
    pub errata_type: String,
    pub severity: String,
    pub reboot_suggested: bool,
    pub cves: Option<Vec<String>>,
}

/// Errata filters forwarded to the content index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrataFilters {
    pub search: String,
    pub types: Vec<String>,
    pub severities: Vec<String>,
}

/// Package and errata queries over repository version hrefs.
#[async_trait]
pub trait ContentIndex: Send + Sync {
    /// Distinct package names starting with `search`, ordered by name.
    async fn search_packages(
        &self,
        version_hrefs: &[String],
        search: &str,
        limit: u64,
    ) -> Result<Vec<PackageHit>, ClientError>;

    /// One page of packages plus the total count.
    async fn list_packages(
        &self,
        version_hrefs: &[String],
        search: &str,
        page: &Page,
    ) -> Result<(Vec<IndexedPackage>, u64), ClientError>;

    /// One page of errata plus the total count.
    async fn list_errata(
        &self,
        version_hrefs: &[String],
        filters: &ErrataFilters,
        page: &Page,
    ) -> Result<(Vec<ErrataRecord>, u64), ClientError>;
}

/// Lifecycle entry for an application stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppstreamEntity {
    pub name: String,
    pub stream: String,
    /// Implementation kind; only `dnf_module` entries describe modules
    pub kind: String,
    pub start_date: String,
    pub end_date: String,
}

/// Source of application stream lifecycle data.
#[async_trait]
pub trait RoadmapClient: Send + Sync {
    async fn appstreams(&self) -> Result<Vec<AppstreamEntity>, ClientError>;
}

/// Entitlement environments backing templates.
#[async_trait]
pub trait EntitlementClient: Send + Sync {
    async fn promote_content(
        &self,
        environment_id: &str,
        content_ids: &[String],
    ) -> Result<(), ClientError>;

    async fn demote_content(
        &self,
        environment_id: &str,
        content_ids: &[String],
    ) -> Result<(), ClientError>;
}

/// Entitlement content id for a repository configuration.
pub fn content_id(repository_configuration_uuid: uuid::Uuid) -> String {
    repository_configuration_uuid.simple().to_string()
}
