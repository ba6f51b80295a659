//! Catalog types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use oakhouse_core::ProductId;

/// Default and maximum page sizes for product listings.
pub const DEFAULT_PER_PAGE: u32 = 12;
pub const MAX_PER_PAGE: u32 = 100;

/// A product in the catalog.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub category: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub stock: i32,
    /// Cloudinary `secure_url`s, first one is the cover image.
    pub images: Vec<String>,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[must_use]
    pub fn cover_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

/// Filters for `GET /api/products`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    /// Case-insensitive match on name and description.
    pub search: Option<String>,
    pub featured: Option<bool>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ProductQuery {
    /// 1-based page number.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    #[must_use]
    pub fn per_page(&self) -> u32 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page() - 1) * i64::from(self.per_page())
    }

    /// Search text trimmed, `None` when blank.
    #[must_use]
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    #[must_use]
    pub fn category_filter(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Stable key for the listing cache.
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!(
            "c={}|s={}|f={:?}|p={}|n={}",
            self.category_filter().unwrap_or_default(),
            self.search_term().unwrap_or_default().to_lowercase(),
            self.featured,
            self.page(),
            self.per_page()
        )
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>, page: u32, per_page: u32, total: i64) -> Self {
        let per = i64::from(per_page.max(1));
        Self {
            items,
            page,
            per_page,
            total,
            total_pages: (total + per - 1) / per,
        }
    }
}

/// Admin create/update payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub name: String,
    /// Derived from the name when omitted.
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub price: Decimal,
    pub stock: i32,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub is_featured: bool,
}

impl ProductInput {
    /// Trim fields, fill in the slug and check the values.
    ///
    /// # Errors
    ///
    /// Returns a message suitable for a `400` response.
    pub fn normalized(mut self) -> Result<Self, String> {
        self.name = self.name.trim().to_string();
        self.category = self.category.trim().to_string();
        self.description = self.description.trim().to_string();

        if self.name.is_empty() {
            return Err("Product name is required".to_string());
        }
        if self.category.is_empty() {
            return Err("Category is required".to_string());
        }
        if self.price <= Decimal::ZERO {
            return Err("Price must be greater than zero".to_string());
        }
        if self.price.scale() > 2 {
            return Err("Price can have at most two decimal places".to_string());
        }
        if self.stock < 0 {
            return Err("Stock cannot be negative".to_string());
        }

        let slug = slugify(self.slug.as_deref().unwrap_or(&self.name));
        if slug.is_empty() {
            return Err("Slug must contain letters or digits".to_string());
        }
        self.slug = Some(slug);

        self.images.retain(|url| !url.trim().is_empty());
        Ok(self)
    }

    /// The slug after [`ProductInput::normalized`].
    #[must_use]
    pub fn slug(&self) -> &str {
        self.slug.as_deref().unwrap_or_default()
    }
}

/// Lowercase, dash-separated, alphanumerics only.
#[must_use]
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for c in input.trim().chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input() -> ProductInput {
        ProductInput {
            name: "  Oak Dining Table ".to_string(),
            slug: None,
            description: String::new(),
            category: "tables".to_string(),
            price: Decimal::new(125_000, 2),
            stock: 3,
            images: vec![" ".to_string(), "https://res.cloudinary.com/x.jpg".to_string()],
            is_featured: false,
        }
    }

    #[test]
    fn test_price_serializes_as_number() {
        let now = Utc::now();
        let product = Product {
            id: ProductId::new(4),
            name: "Oak Dining Table".to_string(),
            slug: "oak-dining-table".to_string(),
            description: String::new(),
            category: "tables".to_string(),
            price: Decimal::new(125_050, 2),
            stock: 3,
            images: Vec::new(),
            is_featured: true,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["price"], serde_json::json!(1250.5));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Oak Dining Table"), "oak-dining-table");
        assert_eq!(slugify("  --Chair #2 (walnut)-- "), "chair-2-walnut");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_normalized_derives_slug_and_drops_blank_images() {
        let product = input().normalized().unwrap();
        assert_eq!(product.name, "Oak Dining Table");
        assert_eq!(product.slug(), "oak-dining-table");
        assert_eq!(product.images.len(), 1);
    }

    #[test]
    fn test_normalized_rejects_bad_values() {
        let mut bad = input();
        bad.price = Decimal::ZERO;
        assert!(bad.normalized().is_err());

        let mut bad = input();
        bad.price = Decimal::new(10_005, 3);
        assert!(bad.normalized().is_err());

        let mut bad = input();
        bad.stock = -1;
        assert!(bad.normalized().is_err());

        let mut bad = input();
        bad.name = "   ".to_string();
        assert!(bad.normalized().is_err());
    }

    #[test]
    fn test_query_paging_is_clamped() {
        let query = ProductQuery {
            page: Some(0),
            per_page: Some(1_000),
            ..ProductQuery::default()
        };
        assert_eq!(query.page(), 1);
        assert_eq!(query.per_page(), MAX_PER_PAGE);
        assert_eq!(query.offset(), 0);

        let query = ProductQuery {
            page: Some(3),
            ..ProductQuery::default()
        };
        assert_eq!(query.offset(), 24);
    }

    #[test]
    fn test_page_counts_total_pages() {
        let page: Page<u8> = Page::new(vec![], 1, 12, 25);
        assert_eq!(page.total_pages, 3);
        let empty: Page<u8> = Page::new(vec![], 1, 12, 0);
        assert_eq!(empty.total_pages, 0);
    }
}
