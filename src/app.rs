use std::fs;
use uuid::Uuid;

use crate::config::CatalogConfig;
use crate::error::{CatalogError, CatalogResult};
use crate::media::defaults::DefaultImagePool;
use crate::media::images::{ImageStore, LoadedImage};
use crate::state::data::{NewProduct, Product, SearchQuery, SortOrder};
use crate::state::library::Library;
use crate::state::store::{ProductStore, SqliteStore};

/// Result of [`Catalog::attach_photo`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    Attached,
    /// No product has that id; nothing was written
    UnknownProduct,
    /// The photo could not be decoded or written
    ImageNotSaved,
}

/// The product catalog: records plus their images.
///
/// Image failures never fail a catalog call. A product whose image could
/// not be written is still created, just without `has_image`.
pub struct Catalog<S: ProductStore = SqliteStore> {
    library: Library<S>,
    images: ImageStore,
    defaults: DefaultImagePool,
}

impl Catalog<SqliteStore> {
    /// Open (or create) the catalog under `config.data_dir`
    pub fn open(config: &CatalogConfig) -> CatalogResult<Self> {
        fs::create_dir_all(&config.data_dir).map_err(|source| CatalogError::Io {
            path: config.data_dir.clone(),
            source,
        })?;

        let store = SqliteStore::open(&config.database_path())?;
        Ok(Self::with_store(store, config))
    }

    /// Catalog with an in-memory database; images still go to `config.data_dir`
    pub fn open_in_memory(config: &CatalogConfig) -> CatalogResult<Self> {
        Ok(Self::with_store(SqliteStore::open_in_memory()?, config))
    }
}

impl<S: ProductStore> Catalog<S> {
    pub fn with_store(store: S, config: &CatalogConfig) -> Self {
        Catalog {
            library: Library::new(store),
            images: ImageStore::from_config(config),
            defaults: DefaultImagePool::from_config(config),
        }
    }

    pub fn library(&self) -> &Library<S> {
        &self.library
    }

    /// Mutable access, e.g. to register observers
    pub fn library_mut(&mut self) -> &mut Library<S> {
        &mut self.library
    }

    pub fn images(&self) -> &ImageStore {
        &self.images
    }

    pub fn defaults(&self) -> &DefaultImagePool {
        &self.defaults
    }

    /// Create a product and give it an image: the supplied photo, or a
    /// placeholder from the pool (picked by `default_hint`, else at random).
    pub fn add_product(
        &mut self,
        input: NewProduct,
        photo: Option<&[u8]>,
        default_hint: Option<usize>,
    ) -> CatalogResult<Product> {
        let mut product = self.library.create(input)?;

        let saved = match photo {
            Some(bytes) => self.images.save_image(bytes, product.id, 1).is_some(),
            None => self
                .defaults
                .save_default_image(&self.images, product.id, default_hint)
                .is_some(),
        };

        if saved {
            // The record is already committed; a failed flag update must not fail the call
            match self.library.mark_has_image(product.id) {
                Ok(found) => product.has_image = found,
                Err(e) => {
                    tracing::warn!(
                        product_id = %product.id,
                        error = %e,
                        "image saved but has_image flag not updated"
                    );
                }
            }
        } else {
            tracing::warn!(product_id = %product.id, "product saved without an image");
        }

        Ok(product)
    }

    /// Store another photo after the product's existing ones
    pub fn attach_photo(
        &mut self,
        product_id: Uuid,
        photo: &[u8],
    ) -> CatalogResult<AttachOutcome> {
        if self.library.get(product_id)?.is_none() {
            return Ok(AttachOutcome::UnknownProduct);
        }
        let sequence = self.images.next_sequence(product_id);
        if self.images.save_image(photo, product_id, sequence).is_none() {
            return Ok(AttachOutcome::ImageNotSaved);
        }
        self.library.mark_has_image(product_id)?;
        Ok(AttachOutcome::Attached)
    }

    pub fn products(&self, order: SortOrder) -> CatalogResult<Vec<Product>> {
        self.library.list(order)
    }

    pub fn search(&self, query: &SearchQuery, order: SortOrder) -> CatalogResult<Vec<Product>> {
        self.library.filter(query, order)
    }

    pub fn product(&self, id: Uuid) -> CatalogResult<Option<Product>> {
        self.library.get(id)
    }

    /// Decoded images for a product. A set `has_image` flag over an empty
    /// or missing directory yields an empty list; the flag is left alone.
    pub fn product_images(&self, product_id: Uuid) -> Vec<LoadedImage> {
        self.images.load_images(product_id)
    }

    pub async fn product_images_async(&self, product_id: Uuid) -> Vec<LoadedImage> {
        self.images.load_images_async(product_id).await
    }

    /// Re-align every `has_image` flag with the files on disk
    pub fn reconcile_image_flags(&mut self) -> CatalogResult<usize> {
        let images = &self.images;
        self.library.reconcile_image_flags(|id| images.has_images(id))
    }
}

impl<S: ProductStore + std::fmt::Debug> std::fmt::Debug for Catalog<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("library", &self.library)
            .field("images", &self.images)
            .field("defaults", &self.defaults)
            .finish()
    }
}
