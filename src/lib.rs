//! Offline product catalog.
//!
//! Products live in a SQLite table ([`state`]); their images are JPEG
//! files in one directory per product ([`media`]). [`Catalog`] ties the
//! two together for the add-product flow.

pub mod app;
pub mod config;
pub mod error;
pub mod logging;
pub mod media;
pub mod state;

pub use app::{AttachOutcome, Catalog};
pub use config::CatalogConfig;
pub use error::{CatalogError, CatalogResult, ImageIoError, ValidationError};
pub use state::data::{CatalogEvent, NewProduct, Product, SearchQuery, SortKey, SortOrder};
