//! # API Types
//!
//! Request and response bodies shared by the handlers and the DAO layer,
//! including the offset pagination envelope returned by every collection.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

pub mod errata;
pub mod repositories;
pub mod rpms;
pub mod snapshots;
pub mod templates;

/// Page size used when a request does not supply one (or supplies 0)
pub const DEFAULT_PAGE_LIMIT: u64 = 100;

/// Offset pagination query parameters
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct PaginationQuery {
    /// Number of results to return (default: 100)
    pub limit: Option<u64>,
    /// Offset into the total results
    pub offset: Option<u64>,
    /// Sort order, e.g. `name:desc`
    pub sort_by: Option<String>,
}

impl PaginationQuery {
    pub fn page(&self) -> Page {
        Page {
            limit: match self.limit {
                None | Some(0) => DEFAULT_PAGE_LIMIT,
                Some(limit) => limit,
            },
            offset: self.offset.unwrap_or(0),
            sort_by: self.sort_by.clone().filter(|s| !s.trim().is_empty()),
        }
    }
}

/// Resolved pagination window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub limit: u64,
    pub offset: u64,
    pub sort_by: Option<String>,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
            sort_by: None,
        }
    }
}

impl Page {
    pub fn new(limit: u64, offset: u64) -> Self {
        Self {
            limit: if limit == 0 { DEFAULT_PAGE_LIMIT } else { limit },
            offset,
            sort_by: None,
        }
    }

    pub fn with_sort_by(mut self, sort_by: impl Into<String>) -> Self {
        self.sort_by = Some(sort_by.into());
        self
    }
}

/// Metadata about a collection request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ResponseMetadata {
    /// Limit of results used for the request
    pub limit: u64,
    /// Offset into results used for the request
    pub offset: u64,
    /// Total count of results
    pub count: u64,
}

/// Links to other pages of a collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Links {
    /// Path to first page of results
    pub first: String,
    /// Path to previous page of results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
    /// Path to next page of results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    /// Path to last page of results
    pub last: String,
}

impl Links {
    /// Builds the page links for `path` given the resolved page and total count.
    pub fn for_page(path: &str, page: &Page, total: u64) -> Self {
        let limit = page.limit.max(1);
        let link = |offset: u64| format!("{path}?limit={limit}&offset={offset}");

        let last_offset = if total == 0 {
            0
        } else {
            ((total - 1) / limit) * limit
        };

        Self {
            first: link(0),
            prev: (page.offset > 0).then(|| link(page.offset.saturating_sub(limit))),
            next: (page.offset + limit < total).then(|| link(page.offset + limit)),
            last: link(last_offset),
        }
    }
}

/// Paginated collection envelope
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CollectionResponse<T> {
    /// Items on the current page
    pub data: Vec<T>,
    pub meta: ResponseMetadata,
    pub links: Links,
}

impl<T> CollectionResponse<T> {
    pub fn new(data: Vec<T>, path: &str, page: &Page, total: u64) -> Self {
        Self {
            data,
            meta: ResponseMetadata {
                limit: page.limit,
                offset: page.offset,
                count: total,
            },
            links: Links::for_page(path, page, total),
        }
    }
}

/// Splits a comma separated query value into trimmed, non-empty parts.
pub fn split_comma_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|raw| {
            raw.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}
