//! # Error Types
//!
//! Domain-specific error types for aurum-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  aurum-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  aurum-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  HTTP API errors (in pos-api)                                          │
//! │  └── ApiError         - What the POS frontend sees (4xx/5xx + JSON)    │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Frontend     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product name, balance, etc.)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations. They are surfaced to the
/// caller as the originating HTTP 4xx with a human-readable message; none
/// are silently swallowed.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found (unknown id or soft-deleted).
    #[error("Producto no encontrado: {0}")]
    ProductNotFound(String),

    /// Client cannot be found; credit sales require a valid client.
    #[error("Cliente no encontrado: {0}")]
    ClientNotFound(String),

    /// Sale not found in either partition.
    #[error("Venta no encontrada: {0}")]
    SaleNotFound(String),

    /// Receivable account not found.
    #[error("Cuenta por cobrar no encontrada: {0}")]
    AccountNotFound(String),

    /// Insufficient stock to complete a sale line.
    ///
    /// ## When This Occurs
    /// - A line requests more units than the product currently has
    /// - Raised before any write, so a rejected sale leaves no trace
    #[error("Stock insuficiente para {name}: disponible {available}, solicitado {requested}")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    /// Cash tendered does not cover the amount due.
    #[error("Efectivo insuficiente: requerido {required_cents}, recibido {received_cents}")]
    InsufficientCash {
        required_cents: i64,
        received_cents: i64,
    },

    /// Mixed tender parts do not sum to the sale total.
    #[error("Pago mixto invalido: las partes suman {parts_cents}, el total es {total_cents}")]
    InvalidTender { parts_cents: i64, total_cents: i64 },

    /// Payment exceeds the account's outstanding balance.
    #[error("Abono excede el saldo pendiente: saldo {outstanding_cents}, abono {requested_cents}")]
    ExcessPayment {
        outstanding_cents: i64,
        requested_cents: i64,
    },

    /// Register close attempted with an empty day partition.
    #[error("No hay ventas del dia para cerrar")]
    NothingToClose,

    /// Validation error (wraps ValidationError).
    #[error("Validacion: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when request input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} es requerido")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} debe tener maximo {max} caracteres")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} debe estar entre {min} y {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} debe ser positivo")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid date).
    #[error("{field} tiene formato invalido: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} debe ser uno de: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
