use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Name of the directory holding per-product image folders
pub const IMAGES_DIR_NAME: &str = "ProductImages";

const APP_DIR_NAME: &str = "product-catalog";
const CONFIG_FILE_NAME: &str = "config.json";
const DEFAULT_DATABASE_FILE: &str = "catalog.db";
const DEFAULT_IMAGE_COUNT: usize = 10;
const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Catalog configuration.
///
/// Every field has a default, so a config file only needs the keys it
/// wants to override:
///
/// ```json
/// { "data_dir": "/tmp/catalog", "jpeg_quality": 90 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Root for the database and the image tree
    pub data_dir: PathBuf,
    /// Database file name inside `data_dir`
    pub database_file: String,
    /// Directory holding the bundled `product_default_<n>` images.
    /// Defaults to `<data_dir>/assets` when unset.
    pub asset_dir: Option<PathBuf>,
    /// Number of placeholder images in the pool (excluding the sentinel)
    pub default_image_count: usize,
    /// JPEG encoder quality, 1..=100
    pub jpeg_quality: u8,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            database_file: DEFAULT_DATABASE_FILE.to_string(),
            asset_dir: None,
            default_image_count: DEFAULT_IMAGE_COUNT,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl CatalogConfig {
    /// Config rooted at `data_dir`, everything else default
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Parse a JSON config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `<default data dir>/config.json` if it exists, defaults otherwise
    pub fn discover() -> Result<Self, ConfigError> {
        let path = default_data_dir().join(CONFIG_FILE_NAME);
        if path.is_file() {
            tracing::info!(path = %path.display(), "loading catalog config");
            Self::load(&path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }

    pub fn images_root(&self) -> PathBuf {
        self.data_dir.join(IMAGES_DIR_NAME)
    }

    pub fn asset_dir(&self) -> PathBuf {
        self.asset_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("assets"))
    }

    /// Quality handed to the JPEG encoder, clamped to a valid range
    pub fn effective_jpeg_quality(&self) -> u8 {
        self.jpeg_quality.clamp(1, 100)
    }
}

/// Where the catalog lives when nothing else is configured:
/// - Linux: ~/.local/share/product-catalog
/// - macOS: ~/Library/Application Support/product-catalog
/// - Windows: %APPDATA%\product-catalog
fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}
