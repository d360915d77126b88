use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storeadmin_core::error::{ensure_max_len, ensure_text};
use storeadmin_core::{Currency, DomainError, DomainResult, Entity, Money, ProductId};

pub const NAME_MAX: usize = 255;
pub const SKU_MAX: usize = 50;
pub const CATEGORY_MAX: usize = 100;
pub const IMAGE_URL_MAX: usize = 255;
pub const DIMENSIONS_MAX: usize = 50;

/// Catalog product as held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub inventory_count: u32,
    /// Stock keeping unit; unique across the catalog.
    pub sku: String,
    pub category: Option<String>,
    pub image_url: Option<String>,
    /// Weight in grams.
    pub weight: Option<u32>,
    /// Free-form, e.g. "10x20x30 cm".
    pub dimensions: Option<String>,
    /// Whether the product can currently be purchased.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> ProductId {
        self.id
    }
}

impl Product {
    /// Unit price charged when an order line does not carry its own.
    pub fn unit_price(&self) -> u64 {
        self.price.amount
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub inventory_count: u32,
    pub sku: String,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub weight: Option<u32>,
    pub dimensions: Option<String>,
    pub is_active: bool,
}

impl NewProduct {
    /// Minimal valid input; optional fields empty, active, priced in USD.
    pub fn new(name: impl Into<String>, sku: impl Into<String>, price: u64) -> Self {
        Self {
            name: name.into(),
            description: None,
            price: Money::new(price, Currency::default()),
            inventory_count: 0,
            sku: sku.into(),
            category: None,
            image_url: None,
            weight: None,
            dimensions: None,
            is_active: true,
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        ensure_text("name", &self.name, NAME_MAX)?;
        ensure_text("sku", &self.sku, SKU_MAX)?;
        validate_optional_fields(
            self.category.as_deref(),
            self.image_url.as_deref(),
            self.dimensions.as_deref(),
        )
    }

    /// Materialize the stored record once the store has assigned an id.
    pub fn into_product(self, id: ProductId, now: DateTime<Utc>) -> Product {
        Product {
            id,
            name: self.name,
            description: self.description,
            price: self.price,
            inventory_count: self.inventory_count,
            sku: self.sku,
            category: self.category,
            image_url: self.image_url,
            weight: self.weight,
            dimensions: self.dimensions,
            is_active: self.is_active,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update. `None` leaves a field untouched; for nullable fields
/// `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub price: Option<u64>,
    pub price_currency: Option<Currency>,
    pub inventory_count: Option<u32>,
    pub sku: Option<String>,
    pub category: Option<Option<String>>,
    pub image_url: Option<Option<String>>,
    pub weight: Option<Option<u32>>,
    pub dimensions: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl ProductChanges {
    pub fn validate(&self) -> DomainResult<()> {
        if let Some(name) = &self.name {
            ensure_text("name", name, NAME_MAX)?;
        }
        if let Some(sku) = &self.sku {
            ensure_text("sku", sku, SKU_MAX)?;
        }
        validate_optional_fields(
            self.category.as_ref().and_then(|c| c.as_deref()),
            self.image_url.as_ref().and_then(|u| u.as_deref()),
            self.dimensions.as_ref().and_then(|d| d.as_deref()),
        )
    }

    /// The SKU this update would move the product to, if it changes it.
    pub fn new_sku<'a>(&'a self, current: &Product) -> Option<&'a str> {
        self.sku.as_deref().filter(|sku| *sku != current.sku)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the changes in place, bumping `updated_at`.
    pub fn apply_to(self, product: &mut Product, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            product.name = name;
        }
        if let Some(description) = self.description {
            product.description = description;
        }
        if let Some(amount) = self.price {
            product.price.amount = amount;
        }
        if let Some(currency) = self.price_currency {
            product.price.currency = currency;
        }
        if let Some(count) = self.inventory_count {
            product.inventory_count = count;
        }
        if let Some(sku) = self.sku {
            product.sku = sku;
        }
        if let Some(category) = self.category {
            product.category = category;
        }
        if let Some(image_url) = self.image_url {
            product.image_url = image_url;
        }
        if let Some(weight) = self.weight {
            product.weight = weight;
        }
        if let Some(dimensions) = self.dimensions {
            product.dimensions = dimensions;
        }
        if let Some(active) = self.is_active {
            product.is_active = active;
        }
        product.updated_at = now;
    }
}

fn validate_optional_fields(
    category: Option<&str>,
    image_url: Option<&str>,
    dimensions: Option<&str>,
) -> DomainResult<()> {
    if let Some(category) = category {
        ensure_max_len("category", category, CATEGORY_MAX)?;
    }
    if let Some(url) = image_url {
        ensure_max_len("image_url", url, IMAGE_URL_MAX)?;
    }
    if let Some(dimensions) = dimensions {
        ensure_max_len("dimensions", dimensions, DIMENSIONS_MAX)?;
    }
    Ok(())
}

/// New inventory count after applying `delta`, clamped to `0..=u32::MAX`.
///
/// Selling more than is in stock empties the stock rather than failing.
pub fn adjust_inventory(current: u32, delta: i64) -> u32 {
    let next = i64::from(current).saturating_add(delta);
    next.clamp(0, i64::from(u32::MAX)) as u32
}

/// Reject a SKU that another product already owns.
pub fn ensure_sku_available(sku: &str, owner: Option<ProductId>, candidate: ProductId) -> DomainResult<()> {
    match owner {
        Some(existing) if existing != candidate => Err(DomainError::conflict(format!(
            "product with SKU {sku} already exists"
        ))),
        _ => Ok(()),
    }
}
