//! # aurum-db: Database Layer for Aurum POS
//!
//! This crate provides database access for the Aurum POS system.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Aurum POS Data Flow                              │
//! │                                                                         │
//! │  HTTP route (POST /ventas)                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     aurum-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌────────────────┐   ┌──────────────┐   │   │
//! │  │   │   Database    │   │  Repositories  │   │   Services   │   │   │
//! │  │   │   (pool.rs)   │   │ (one/entity)   │   │ (one tx per  │   │   │
//! │  │   │               │   │                │   │   use case)  │   │   │
//! │  │   │ SqlitePool    │◄──│ SaleRepo       │◄──│ Checkout     │   │   │
//! │  │   │ Migrations    │   │ ReceivableRepo │   │ Closing      │   │   │
//! │  │   └───────────────┘   └────────────────┘   └──────────────┘   │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │                    SQLite Database (WAL mode)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (sale, receivable, etc.)
//! - [`service`] - Transactional use cases (checkout, register closing)
//!
//! ## Transaction Policy
//!
//! Repositories expose their write methods against a `&mut SqliteConnection`
//! so a service can compose several of them inside ONE transaction. Either
//! every ledger write of a use case lands, or none do: a failed checkout can
//! never leave stock decremented without a recorded sale.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::client::ClientRepository;
pub use repository::inventory::InventoryRepository;
pub use repository::product::ProductRepository;
pub use repository::receivable::ReceivableRepository;
pub use repository::sale::SaleRepository;

// Service re-exports
pub use service::adjustment::AdjustmentService;
pub use service::checkout::{CheckoutOutcome, CheckoutService};
pub use service::closing::{ClosingOutcome, ClosingService};
