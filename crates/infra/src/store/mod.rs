//! Store implementations for the catalog and sales ports.
//!
//! - [`PostgresStore`]: production backend (sqlx).
//! - [`InMemoryStore`]: single-process backend for tests and local runs.

pub mod in_memory;
pub mod postgres;

pub use in_memory::{Clock, InMemoryStore, InMemoryWork};
pub use postgres::{PgUnitOfWork, PostgresStore};
