//! # Content Sources Library
//!
//! Catalog of RPM repositories for a multi-tenant content service: package
//! ingestion with checksum deduplication, organization-scoped visibility,
//! content templates and the background orphan collector.

pub mod api;
pub mod auth;
pub mod clients;
pub mod config;
pub mod dao;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod seeds;
pub mod server;
pub mod telemetry;
pub use migration;
