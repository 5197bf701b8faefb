pub mod auth;
pub mod config;
pub mod database;
pub mod email;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod query;
pub mod services;

// Note: avoid glob re-exports to prevent ambiguous symbol re-exports
// Consumers should reference items through their module paths, e.g.:
// `crate::models::User` or `crate::query::Query`.
