/// Error types shared by the catalog and the image layer
///
/// - `ValidationError`: bad user input, nothing is written
/// - `CatalogError`: anything that aborts a catalog operation
/// - `ImageIoError`: image read/write failures, logged and swallowed by the
///   image layer's public operations
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Rejected product input
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Please enter a product name.")]
    EmptyName,

    #[error("Please enter a price.")]
    MissingPrice,

    #[error("Price must be a valid number (got {0:?}).")]
    InvalidPrice(String),

    #[error("Price cannot be negative (got {0}).")]
    NegativePrice(f64),
}

/// Errors surfaced by catalog operations
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Database error: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error("Stored product id {0:?} is not a valid UUID")]
    CorruptRecord(String),

    #[error("Stored product {id} has an out-of-range timestamp ({millis} ms)")]
    CorruptTimestamp { id: Uuid, millis: i64 },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to prepare {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Image read/write failures
#[derive(Debug, Error)]
pub enum ImageIoError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Image codec error: {0}")]
    Codec(#[from] image::ImageError),
}

/// Problems loading the JSON config file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type CatalogResult<T> = Result<T, CatalogError>;
