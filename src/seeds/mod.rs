//! Database seeding functionality
//!
//! Bootstraps the catalog with the popular repositories every organization
//! may read, so introspection has something to pick up on a fresh database.

pub mod popular_repositories;

pub use popular_repositories::seed_popular_repositories;
