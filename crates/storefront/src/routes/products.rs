//! Public catalog handlers.

use axum::{Json, extract::State};
use tracing::instrument;

use crate::db::products::CategoryCount;
use crate::error::Result;
use crate::models::{Page, Product, ProductQuery};
use crate::routes::extract::{ApiPath, ApiQuery};
use crate::services::catalog::CatalogService;
use crate::state::AppState;

/// GET /api/products
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> Result<Json<Page<Product>>> {
    let catalog = CatalogService::new(state.pool(), state.products());
    Ok(Json(catalog.list(&query).await?))
}

/// GET /api/products/{slug}
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> Result<Json<Product>> {
    let catalog = CatalogService::new(state.pool(), state.products());
    Ok(Json(catalog.get_by_slug(&slug).await?))
}

/// GET /api/categories
///
/// Categories with at least one product, with product counts.
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<CategoryCount>>> {
    let catalog = CatalogService::new(state.pool(), state.products());
    Ok(Json(catalog.categories().await?))
}
