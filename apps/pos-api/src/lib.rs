//! # Aurum POS API
//!
//! HTTP surface for the POS frontend: checkout, sale listings, register
//! closing, and accounts receivable.
//!
//! Structured like:
//! - `routes/`: HTTP routes + handlers (one file per domain area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `error.rs`: consistent error responses
//! - `config.rs`: environment configuration

pub mod config;
pub mod dto;
pub mod error;
pub mod routes;

use axum::Router;

use aurum_db::Database;

/// Builds the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(db: Database) -> Router {
    routes::router(db)
}
