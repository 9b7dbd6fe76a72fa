//! # Transactional Services
//!
//! Each service implements one use case as ONE database transaction over
//! several repositories. Either every ledger write lands or none do.
//!
//! - [`checkout`] - turns a checkout request into sale + items + stock
//!   decrements + inventory movements + (for credit) a receivable update
//! - [`closing`] - migrates the day partition into history and snapshots
//!   the day's totals
//! - [`adjustment`] - manual stock corrections with their audit movement

pub mod adjustment;
pub mod checkout;
pub mod closing;
