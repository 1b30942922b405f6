//! `warung-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives shared by the catalog and
//! sales crates (no infrastructure concerns beyond the opaque storage error).

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult, StorageError};
pub use id::{CategoryId, ProductId, TransactionDetailId, TransactionId};
