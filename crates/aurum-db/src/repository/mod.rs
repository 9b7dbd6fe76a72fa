//! # Repository Implementations
//!
//! One repository per entity family. Read paths bind to the pool; write
//! paths take a `&mut SqliteConnection` so the services in [`crate::service`]
//! can compose several repositories inside one transaction.

pub mod client;
pub mod inventory;
pub mod product;
pub mod receivable;
pub mod sale;
