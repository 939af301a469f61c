use image::{DynamicImage, Rgb, RgbImage};
use rand::Rng;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::images::ImageStore;
use crate::config::CatalogConfig;

/// Index of the reserved fallback asset, `product_default_0`
pub const SENTINEL_INDEX: usize = 0;

const ASSET_PREFIX: &str = "product_default_";
const ASSET_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Size and color of the image used when even the sentinel asset is missing
const GENERATED_SIZE: u32 = 256;
const GENERATED_GREY: [u8; 3] = [200, 200, 200];

/// Which tier of the selection chain produced a placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderSource {
    /// `(hint mod N) + 1`
    Hinted,
    /// Uniform pick from `1..=N`
    Random,
    /// The `product_default_0` asset
    Sentinel,
    /// Built in memory because no asset could be loaded
    Generated,
}

/// A selected placeholder image
#[derive(Debug, Clone)]
pub struct Placeholder {
    /// Asset number, `SENTINEL_INDEX` for the sentinel and generated tiers
    pub index: usize,
    pub source: PlaceholderSource,
    pub image: DynamicImage,
}

impl Placeholder {
    pub fn asset_name(&self) -> String {
        asset_name(self.index)
    }
}

/// A default image written for a product
#[derive(Debug, Clone)]
pub struct SavedPlaceholder {
    pub path: PathBuf,
    pub index: usize,
    pub source: PlaceholderSource,
}

/// The bundled pool of stock images: `product_default_1` through
/// `product_default_N`, plus the sentinel `product_default_0`.
#[derive(Debug, Clone)]
pub struct DefaultImagePool {
    asset_dir: PathBuf,
    count: usize,
}

pub fn asset_name(index: usize) -> String {
    format!("{ASSET_PREFIX}{index}")
}

impl DefaultImagePool {
    pub fn new(asset_dir: impl Into<PathBuf>, count: usize) -> Self {
        DefaultImagePool {
            asset_dir: asset_dir.into(),
            count,
        }
    }

    pub fn from_config(config: &CatalogConfig) -> Self {
        Self::new(config.asset_dir(), config.default_image_count)
    }

    pub fn asset_dir(&self) -> &Path {
        &self.asset_dir
    }

    /// Number of images in the pool, not counting the sentinel
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Asset number a hint maps to (1-based, matching the asset names)
    pub fn hinted_index(&self, hint: usize) -> Option<usize> {
        (self.count > 0).then(|| hint % self.count + 1)
    }

    /// Pick a placeholder: by hint if one is given, at random otherwise
    pub fn select(&self, hint: Option<usize>) -> Placeholder {
        self.select_with_rng(hint, &mut rand::thread_rng())
    }

    /// Hinted asset, then a random asset, then the sentinel.
    /// Never fails: with no usable assets at all a plain grey image is built.
    pub fn select_with_rng<R: Rng + ?Sized>(
        &self,
        hint: Option<usize>,
        rng: &mut R,
    ) -> Placeholder {
        if let Some(index) = hint.and_then(|hint| self.hinted_index(hint)) {
            if let Some(image) = self.load_asset(index) {
                return Placeholder {
                    index,
                    source: PlaceholderSource::Hinted,
                    image,
                };
            }
            tracing::debug!(
                asset = %asset_name(index),
                "hinted default image missing, picking at random"
            );
        }

        if self.count > 0 {
            let index = rng.gen_range(1..=self.count);
            if let Some(image) = self.load_asset(index) {
                return Placeholder {
                    index,
                    source: PlaceholderSource::Random,
                    image,
                };
            }
            tracing::debug!(
                asset = %asset_name(index),
                "random default image missing, using fallback"
            );
        }

        if let Some(image) = self.load_asset(SENTINEL_INDEX) {
            return Placeholder {
                index: SENTINEL_INDEX,
                source: PlaceholderSource::Sentinel,
                image,
            };
        }

        tracing::warn!(
            dir = %self.asset_dir.display(),
            "no default image assets found, generating one"
        );
        Placeholder {
            index: SENTINEL_INDEX,
            source: PlaceholderSource::Generated,
            image: DynamicImage::ImageRgb8(RgbImage::from_pixel(
                GENERATED_SIZE,
                GENERATED_SIZE,
                Rgb(GENERATED_GREY),
            )),
        }
    }

    /// Select a placeholder and store it as the product's first image
    pub fn save_default_image(
        &self,
        images: &ImageStore,
        product_id: Uuid,
        hint: Option<usize>,
    ) -> Option<SavedPlaceholder> {
        let placeholder = self.select(hint);
        let path = images.save_dynamic_image(&placeholder.image, product_id, 1)?;

        tracing::info!(
            product_id = %product_id,
            asset = %placeholder.asset_name(),
            "saved default image for product"
        );
        Some(SavedPlaceholder {
            path,
            index: placeholder.index,
            source: placeholder.source,
        })
    }

    fn load_asset(&self, index: usize) -> Option<DynamicImage> {
        let name = asset_name(index);
        for ext in ASSET_EXTENSIONS {
            let path = self.asset_dir.join(format!("{name}.{ext}"));
            if !path.is_file() {
                continue;
            }
            match image::open(&path) {
                Ok(image) => return Some(image),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "unreadable default image");
                }
            }
        }
        None
    }
}
