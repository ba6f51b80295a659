//! Product catalog reads and admin writes.
//!
//! Listings, product pages and categories are cached using `moka` (5-minute
//! TTL). Any admin write drops the whole cache.

use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use thiserror::Error;
use tracing::debug;

use oakhouse_core::ProductId;

use crate::db::products::CategoryCount;
use crate::db::{ProductRepository, RepositoryError};
use crate::models::{Page, Product, ProductInput, ProductQuery};

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Product doesn't exist.
    #[error("product not found")]
    NotFound,

    /// Product input failed validation.
    #[error("invalid product: {0}")]
    Invalid(String),

    /// Slug already used by another product.
    #[error("a product with this slug already exists")]
    SlugTaken,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Cached value types.
#[derive(Debug, Clone)]
enum CacheValue {
    Product(Box<Product>),
    Products(Page<Product>),
    Categories(Vec<CategoryCount>),
}

/// Shared read cache for the catalog. Cheap to clone.
#[derive(Clone)]
pub struct ProductCache {
    cache: Cache<String, CacheValue>,
}

impl Default for ProductCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ProductCache {
    #[must_use]
    pub fn new() -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();
        Self { cache }
    }

    /// Invalidate all cached data.
    pub async fn invalidate_all(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}

/// Catalog service for one request.
pub struct CatalogService<'a> {
    products: ProductRepository<'a>,
    cache: &'a ProductCache,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, cache: &'a ProductCache) -> Self {
        Self {
            products: ProductRepository::new(pool),
            cache,
        }
    }

    /// One page of products. Searches bypass the cache.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the database operation fails.
    pub async fn list(&self, query: &ProductQuery) -> Result<Page<Product>, CatalogError> {
        let cacheable = query.search_term().is_none();
        let cache_key = format!("products:{}", query.cache_key());

        if cacheable
            && let Some(CacheValue::Products(page)) = self.cache.cache.get(&cache_key).await
        {
            debug!("Cache hit for products");
            return Ok(page);
        }

        let (items, total) = self.products.list(query).await?;
        let page = Page::new(items, query.page(), query.per_page(), total);

        if cacheable {
            self.cache
                .cache
                .insert(cache_key, CacheValue::Products(page.clone()))
                .await;
        }

        Ok(page)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if no product has this slug.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Product, CatalogError> {
        let cache_key = format!("product:{slug}");

        if let Some(CacheValue::Product(product)) = self.cache.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let product = self
            .products
            .get_by_slug(slug)
            .await?
            .ok_or(CatalogError::NotFound)?;

        self.cache
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the database operation fails.
    pub async fn categories(&self) -> Result<Vec<CategoryCount>, CatalogError> {
        let cache_key = "categories".to_string();

        if let Some(CacheValue::Categories(categories)) = self.cache.cache.get(&cache_key).await {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories = self.products.categories().await?;
        self.cache
            .cache
            .insert(cache_key, CacheValue::Categories(categories.clone()))
            .await;

        Ok(categories)
    }

    // =========================================================================
    // Admin writes (uncached)
    // =========================================================================

    /// All products for the admin table, including out-of-stock ones.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the database operation fails.
    pub async fn admin_list(&self, query: &ProductQuery) -> Result<Page<Product>, CatalogError> {
        let (items, total) = self.products.list(query).await?;
        Ok(Page::new(items, query.page(), query.per_page(), total))
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` if the input fails validation.
    /// Returns `CatalogError::SlugTaken` if the slug is in use.
    pub async fn create(&self, input: ProductInput) -> Result<Product, CatalogError> {
        let input = input.normalized().map_err(CatalogError::Invalid)?;
        let product = self.products.create(&input).await.map_err(map_write)?;

        self.cache.invalidate_all().await;
        tracing::info!(product_id = %product.id, slug = %product.slug, "Product created");
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product doesn't exist.
    /// Returns `CatalogError::Invalid` if the input fails validation.
    /// Returns `CatalogError::SlugTaken` if the new slug is in use.
    pub async fn update(&self, id: ProductId, input: ProductInput) -> Result<Product, CatalogError> {
        let input = input.normalized().map_err(CatalogError::Invalid)?;
        let product = self.products.update(id, &input).await.map_err(map_write)?;

        self.cache.invalidate_all().await;
        tracing::info!(product_id = %product.id, "Product updated");
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product doesn't exist.
    pub async fn delete(&self, id: ProductId) -> Result<(), CatalogError> {
        if !self.products.delete(id).await? {
            return Err(CatalogError::NotFound);
        }

        self.cache.invalidate_all().await;
        tracing::info!(product_id = %id, "Product deleted");
        Ok(())
    }
}

fn map_write(err: RepositoryError) -> CatalogError {
    match err {
        RepositoryError::NotFound => CatalogError::NotFound,
        RepositoryError::Conflict(_) => CatalogError::SlugTaken,
        other => CatalogError::Repository(other),
    }
}
