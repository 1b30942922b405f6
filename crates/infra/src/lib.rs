//! Infrastructure layer: configuration, database bootstrap, and the stores
//! implementing the catalog and sales ports.

pub mod config;
pub mod db;
pub mod store;

#[cfg(test)]
mod integration_tests;
