//! Admin panel handlers.
//!
//! Every handler takes [`RequireAdmin`], which re-reads the account from the
//! database on each request.

use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use oakhouse_core::{OrderId, ProductId};

use crate::db::UserRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{AdminOrder, Order, Page, Product, ProductInput, ProductQuery, User};
use crate::routes::extract::{ApiJson, ApiPath, ApiQuery};
use crate::routes::orders::order_service;
use crate::services::catalog::CatalogService;
use crate::state::AppState;

/// Largest accepted image upload.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const DEFAULT_PER_PAGE: u32 = 20;
const MAX_PER_PAGE: u32 = 100;

/// Paging and filters for the admin tables.
#[derive(Debug, Default, Deserialize)]
pub struct AdminListQuery {
    pub paid: Option<bool>,
    pub delivered: Option<bool>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl AdminListQuery {
    fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    fn per_page(&self) -> u32 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }

    fn limit_offset(&self) -> (i64, i64) {
        let per_page = i64::from(self.per_page());
        (per_page, i64::from(self.page() - 1) * per_page)
    }
}

/// Response of `POST /api/admin/uploads`.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

// =============================================================================
// Products
// =============================================================================

/// GET /api/admin/products
pub async fn products(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> Result<Json<Page<Product>>> {
    let catalog = CatalogService::new(state.pool(), state.products());
    Ok(Json(catalog.admin_list(&query).await?))
}

/// POST /api/admin/products
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn create_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(input): ApiJson<ProductInput>,
) -> Result<(StatusCode, Json<Product>)> {
    let catalog = CatalogService::new(state.pool(), state.products());
    let product = catalog.create(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /api/admin/products/{id}
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn update_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(input): ApiJson<ProductInput>,
) -> Result<Json<Product>> {
    let catalog = CatalogService::new(state.pool(), state.products());
    Ok(Json(catalog.update(id, input).await?))
}

/// DELETE /api/admin/products/{id}
///
/// Past orders keep their line snapshots.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<StatusCode> {
    let catalog = CatalogService::new(state.pool(), state.products());
    catalog.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/admin/uploads
///
/// Multipart form with a single image in the `file` field.
#[instrument(skip(state, admin, multipart), fields(admin_id = %admin.id))]
pub async fn upload(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !content_type.starts_with("image/") {
            return Err(AppError::BadRequest("Only image uploads are allowed".to_string()));
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        if bytes.is_empty() {
            return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
        }

        let url = state
            .cloudinary()
            .upload_image(&file_name, &content_type, bytes.to_vec())
            .await?;
        tracing::info!(url = %url, "Image uploaded");

        return Ok((StatusCode::CREATED, Json(UploadResponse { url })));
    }

    Err(AppError::BadRequest("Missing file field".to_string()))
}

// =============================================================================
// Orders
// =============================================================================

/// GET /api/admin/orders
pub async fn orders(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiQuery(query): ApiQuery<AdminListQuery>,
) -> Result<Json<Page<AdminOrder>>> {
    let (limit, offset) = query.limit_offset();
    let service = order_service(&state);
    let (items, total) = service
        .list_all(query.paid, query.delivered, limit, offset)
        .await?;
    Ok(Json(Page::new(items, query.page(), query.per_page(), total)))
}

/// POST /api/admin/orders/{id}/deliver
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn deliver(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Json<Order>> {
    let service = order_service(&state);
    Ok(Json(service.mark_delivered(id).await?))
}

// =============================================================================
// Users
// =============================================================================

/// GET /api/admin/users
pub async fn users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiQuery(query): ApiQuery<AdminListQuery>,
) -> Result<Json<Page<User>>> {
    let (limit, offset) = query.limit_offset();
    let (items, total) = UserRepository::new(state.pool()).list(limit, offset).await?;
    Ok(Json(Page::new(items, query.page(), query.per_page(), total)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_list_query_defaults() {
        let query = AdminListQuery::default();
        assert_eq!(query.limit_offset(), (20, 0));
    }

    #[test]
    fn test_admin_list_query_clamps() {
        let query = AdminListQuery {
            page: Some(3),
            per_page: Some(500),
            ..AdminListQuery::default()
        };
        assert_eq!(query.per_page(), MAX_PER_PAGE);
        assert_eq!(query.limit_offset(), (100, 200));

        let query = AdminListQuery {
            page: Some(0),
            per_page: Some(0),
            ..AdminListQuery::default()
        };
        assert_eq!(query.limit_offset(), (1, 0));
    }
}
