use chrono::{SubsecRound, Utc};
use uuid::Uuid;

use super::data::{CatalogEvent, NewProduct, Product, SearchQuery, SortOrder};
use super::store::ProductStore;
use crate::error::CatalogResult;

/// Handle returned by [`Library::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Observer = Box<dyn FnMut(&CatalogEvent)>;

/// The Library manages the product catalog.
/// It validates input, commits records through its store, answers
/// listing and search queries, and notifies observers of changes.
pub struct Library<S: ProductStore> {
    store: S,
    observers: Vec<(ObserverId, Observer)>,
    next_observer: u64,
}

impl<S: ProductStore> Library<S> {
    pub fn new(store: S) -> Self {
        Library {
            store,
            observers: Vec::new(),
            next_observer: 0,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Persist a new product with a fresh id.
    /// Nothing is written unless the commit succeeds.
    pub fn create(&mut self, input: NewProduct) -> CatalogResult<Product> {
        let product = Product {
            id: Uuid::new_v4(),
            name: Some(input.name().to_string()),
            description: Some(input.description().to_string()),
            price: input.price(),
            provider: Some(input.provider().to_string()),
            has_image: false,
            // Millisecond precision, what the store keeps
            created_at: Utc::now().trunc_subsecs(3),
        };

        if let Err(err) = self.store.insert(&product) {
            tracing::warn!(product_id = %product.id, error = %err, "failed to save product");
            return Err(err);
        }

        tracing::info!(
            product_id = %product.id,
            name = product.display_name(),
            price = product.price,
            "product created"
        );
        self.notify(&CatalogEvent::ProductCreated(product.clone()));

        Ok(product)
    }

    /// Validate typed fields and create the product in one step
    pub fn create_from_fields(
        &mut self,
        name: &str,
        description: &str,
        price: f64,
        provider: &str,
    ) -> CatalogResult<Product> {
        let input = NewProduct::new(name, description, price, provider)?;
        self.create(input)
    }

    /// All products in the requested order
    pub fn list(&self, order: SortOrder) -> CatalogResult<Vec<Product>> {
        self.store.fetch_all(order)
    }

    /// Products whose name or description contains the query text.
    /// A linear scan over [`Library::list`]; an empty query returns everything.
    pub fn filter(&self, query: &SearchQuery, order: SortOrder) -> CatalogResult<Vec<Product>> {
        let products = self.list(order)?;
        if query.is_empty() {
            return Ok(products);
        }

        Ok(products
            .into_iter()
            .filter(|product| query.matches(product))
            .collect())
    }

    pub fn get(&self, id: Uuid) -> CatalogResult<Option<Product>> {
        self.store.fetch(id)
    }

    pub fn count(&self) -> CatalogResult<usize> {
        self.store.count()
    }

    /// Record that an image was written for this product.
    /// Call only after the write succeeded. Returns false for unknown ids.
    pub fn mark_has_image(&mut self, id: Uuid) -> CatalogResult<bool> {
        let found = self.store.set_has_image(id, true)?;
        if found {
            self.notify(&CatalogEvent::ImageAttached { product_id: id });
        } else {
            tracing::debug!(product_id = %id, "mark_has_image on unknown product");
        }
        Ok(found)
    }

    /// Re-align every `has_image` flag with the given on-disk check.
    /// Never runs implicitly; reads treat the flag as advisory.
    /// Returns how many records changed.
    pub fn reconcile_image_flags<F>(&mut self, mut has_images_on_disk: F) -> CatalogResult<usize>
    where
        F: FnMut(Uuid) -> bool,
    {
        let mut changed = 0;
        for product in self.store.fetch_all(SortOrder::default())? {
            let on_disk = has_images_on_disk(product.id);
            if on_disk != product.has_image {
                self.store.set_has_image(product.id, on_disk)?;
                changed += 1;
            }
        }

        if changed > 0 {
            tracing::info!(changed, "🔄 reconciled image flags with disk");
        }

        Ok(changed)
    }

    /// Register a callback for catalog changes
    pub fn subscribe(&mut self, observer: impl FnMut(&CatalogEvent) + 'static) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Returns false if the id was not registered
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(observer_id, _)| *observer_id != id);
        self.observers.len() != before
    }

    fn notify(&mut self, event: &CatalogEvent) {
        for (_, observer) in self.observers.iter_mut() {
            observer(event);
        }
    }
}

impl<S: ProductStore + std::fmt::Debug> std::fmt::Debug for Library<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("store", &self.store)
            .field("observers", &self.observers.len())
            .finish()
    }
}
