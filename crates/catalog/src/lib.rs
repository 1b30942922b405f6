//! Catalog domain module: categories and products.
//!
//! This crate contains the catalog entities, input validation, and the
//! repository port the stores implement. No IO lives here.

pub mod category;
pub mod error;
pub mod product;
pub mod repository;
pub mod service;

pub use category::{Category, CategoryInput};
pub use error::CatalogError;
pub use product::{Product, ProductDetail, ProductFilter, ProductInput};
pub use repository::CatalogRepository;
pub use service::CatalogService;
