/// Shared data structures for the catalog
///
/// These structs represent the data model that flows between
/// the database layer and its callers.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// A single catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Generated at creation, never reassigned
    pub id: Uuid,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: f64,
    pub provider: Option<String>,
    /// Set once an image write succeeded. Advisory only, never re-checked on read.
    pub has_image: bool,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Display name, the way the list view shows unnamed records
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown")
    }
}

/// Validated input for a new product
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    name: String,
    description: String,
    price: f64,
    provider: String,
}

impl NewProduct {
    /// Validate already-typed input
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        price: f64,
        provider: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if price.is_nan() || price.is_infinite() {
            return Err(ValidationError::InvalidPrice(price.to_string()));
        }
        if price < 0.0 {
            return Err(ValidationError::NegativePrice(price));
        }

        Ok(Self {
            name,
            description: description.into(),
            price,
            provider: provider.into(),
        })
    }

    /// Validate form input where the price is still text.
    /// Checks run in the order the add-product form reports them.
    pub fn parse(
        name: &str,
        description: &str,
        price: &str,
        provider: &str,
    ) -> Result<Self, ValidationError> {
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }

        let price = price.trim();
        if price.is_empty() {
            return Err(ValidationError::MissingPrice);
        }
        let value: f64 = price
            .parse()
            .map_err(|_| ValidationError::InvalidPrice(price.to_string()))?;

        Self::new(name, description, value, provider)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }
}

/// Column a product listing is ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortKey {
    #[default]
    Name,
    Id,
    CreatedAt,
}

/// Sort key plus direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    pub key: SortKey,
    pub ascending: bool,
}

impl SortOrder {
    pub fn new(key: SortKey, ascending: bool) -> Self {
        Self { key, ascending }
    }

    pub fn ascending(key: SortKey) -> Self {
        Self::new(key, true)
    }

    pub fn descending(key: SortKey) -> Self {
        Self::new(key, false)
    }
}

impl Default for SortOrder {
    fn default() -> Self {
        Self::ascending(SortKey::Name)
    }
}

/// Substring search over name and description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    pub case_insensitive: bool,
}

impl SearchQuery {
    /// Case-insensitive search, what the list view's search bar does
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            case_insensitive: true,
        }
    }

    pub fn case_sensitive(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            case_insensitive: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// True if the product's name or description contains the query text
    pub fn matches(&self, product: &Product) -> bool {
        if self.is_empty() {
            return true;
        }

        let needle = if self.case_insensitive {
            self.text.to_lowercase()
        } else {
            self.text.clone()
        };

        [product.name.as_deref(), product.description.as_deref()]
            .into_iter()
            .flatten()
            .any(|field| {
                if self.case_insensitive {
                    field.to_lowercase().contains(&needle)
                } else {
                    field.contains(&needle)
                }
            })
    }
}

/// Change notifications delivered to catalog observers
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogEvent {
    ProductCreated(Product),
    ImageAttached { product_id: Uuid },
}
