//! 商品目录处理器
//!
//! 浏览与详情公开访问（详情走 Redis 缓存），增删改和库存调整仅限所属药房。
//! 任何修改后删除详情缓存。

use std::time::Duration;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use commerce::CommerceError;
use commerce::models::{Product, ProductStatus};
use commerce::order::StockLevel;
use commerce::repository::ProductRepository;
use tracing::{info, warn};
use validator::Validate;
use vetshop_shared::cache::CacheKey;

use crate::dto::{
    AdjustStockRequest, ApiResponse, CreateProductRequest, PageResponse, PaginationParams,
    ProductQueryFilter, UpdateProductRequest,
};
use crate::error::Result;
use crate::middleware::CurrentPharmacy;
use crate::state::AppState;

const PRODUCT_COLUMNS: &str = "id, pharmacy_id, name, description, category, species, \
                               price_cents, stock, reserved, image_url, requires_prescription, \
                               status, created_at, updated_at";

async fn fetch_product(state: &AppState, id: i64) -> Result<Product> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(CommerceError::ProductNotFound(id))?;

    Ok(product)
}

/// 校验商品归属
fn ensure_owner(product: &Product, pharmacy_id: i64) -> Result<()> {
    if product.pharmacy_id != pharmacy_id {
        return Err(CommerceError::Forbidden(format!("商品 {} 不属于当前药房", product.id)).into());
    }
    Ok(())
}

async fn invalidate(state: &AppState, product_id: i64) {
    if let Err(e) = state.cache.delete(&CacheKey::product_detail(product_id)).await {
        warn!(error = %e, product_id, "Product cache invalidation failed");
    }
}

/// 关键字转换为 ILIKE 模式
fn search_pattern(q: Option<&str>) -> Option<String> {
    q.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")))
}

/// 商品列表（仅在售）
///
/// GET /api/v1/products?q=&category=&species=&pharmacyId=&page=&pageSize=
pub async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductQueryFilter>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PageResponse<Product>>>> {
    let pattern = search_pattern(filter.q.as_deref());
    let conditions = r#"
        WHERE status = 'ACTIVE'
          AND ($1::text IS NULL OR name ILIKE $1 OR description ILIKE $1)
          AND ($2::varchar IS NULL OR category = $2)
          AND ($3::text IS NULL OR species ILIKE $3)
          AND ($4::bigint IS NULL OR pharmacy_id = $4)
    "#;

    let (total,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM products {conditions}"))
        .bind(&pattern)
        .bind(filter.category)
        .bind(&filter.species)
        .bind(filter.pharmacy_id)
        .fetch_one(&state.pool)
        .await?;

    let items = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products {conditions} \
         ORDER BY created_at DESC, id DESC LIMIT $5 OFFSET $6"
    ))
    .bind(&pattern)
    .bind(filter.category)
    .bind(&filter.species)
    .bind(filter.pharmacy_id)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(ApiResponse::success(PageResponse::new(
        items,
        total,
        pagination.page.max(1),
        pagination.limit(),
    ))))
}

/// 商品详情
///
/// GET /api/v1/products/{id}
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Product>>> {
    let key = CacheKey::product_detail(id);

    match state.cache.get::<Product>(&key).await {
        Ok(Some(cached)) => return Ok(Json(ApiResponse::success(cached))),
        Ok(None) => {}
        Err(e) => warn!(error = %e, product_id = id, "Product cache read failed"),
    }

    let product = fetch_product(&state, id).await?;

    let ttl = Duration::from_secs(state.shop.product_cache_ttl_secs);
    if let Err(e) = state.cache.set(&key, &product, ttl).await {
        warn!(error = %e, product_id = id, "Product cache write failed");
    }

    Ok(Json(ApiResponse::success(product)))
}

/// 当前药房的全部商品（含已下架）
///
/// GET /api/v1/pharmacy/products
pub async fn list_own_products(
    State(state): State<AppState>,
    CurrentPharmacy(pharmacy_id): CurrentPharmacy,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PageResponse<Product>>>> {
    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products WHERE pharmacy_id = $1")
        .bind(pharmacy_id)
        .fetch_one(&state.pool)
        .await?;

    let items = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE pharmacy_id = $1 \
         ORDER BY id DESC LIMIT $2 OFFSET $3"
    ))
    .bind(pharmacy_id)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(ApiResponse::success(PageResponse::new(
        items,
        total,
        pagination.page.max(1),
        pagination.limit(),
    ))))
}

/// 上架商品
///
/// POST /api/v1/products
pub async fn create_product(
    State(state): State<AppState>,
    CurrentPharmacy(pharmacy_id): CurrentPharmacy,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Product>>)> {
    req.validate()?;

    let product = sqlx::query_as::<_, Product>(&format!(
        r#"
        INSERT INTO products (pharmacy_id, name, description, category, species, price_cents,
                              stock, image_url, requires_prescription)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {PRODUCT_COLUMNS}
        "#
    ))
    .bind(pharmacy_id)
    .bind(req.name.trim())
    .bind(&req.description)
    .bind(req.category)
    .bind(&req.species)
    .bind(req.price_cents)
    .bind(req.stock)
    .bind(&req.image_url)
    .bind(req.requires_prescription)
    .fetch_one(&state.pool)
    .await?;

    info!(product_id = product.id, pharmacy_id, "Product created");
    Ok((StatusCode::CREATED, Json(ApiResponse::success(product))))
}

/// 修改商品
///
/// PUT /api/v1/products/{id}
pub async fn update_product(
    State(state): State<AppState>,
    CurrentPharmacy(pharmacy_id): CurrentPharmacy,
    Path(id): Path<i64>,
    Json(req): Json<UpdateProductRequest>,
) -> Result<Json<ApiResponse<Product>>> {
    req.validate()?;

    let existing = fetch_product(&state, id).await?;
    ensure_owner(&existing, pharmacy_id)?;

    // 已下单的价格是快照，改价不影响进行中的订单
    let product = sqlx::query_as::<_, Product>(&format!(
        r#"
        UPDATE products
        SET name = COALESCE($2, name),
            description = COALESCE($3, description),
            category = COALESCE($4, category),
            species = COALESCE($5, species),
            price_cents = COALESCE($6, price_cents),
            image_url = COALESCE($7, image_url),
            requires_prescription = COALESCE($8, requires_prescription),
            status = COALESCE($9, status),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {PRODUCT_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(req.name.as_deref().map(str::trim))
    .bind(&req.description)
    .bind(req.category)
    .bind(&req.species)
    .bind(req.price_cents)
    .bind(&req.image_url)
    .bind(req.requires_prescription)
    .bind(req.status)
    .fetch_one(&state.pool)
    .await?;

    invalidate(&state, id).await;
    info!(product_id = id, pharmacy_id, "Product updated");
    Ok(Json(ApiResponse::success(product)))
}

/// 下架商品（软删除）
///
/// DELETE /api/v1/products/{id}
pub async fn delete_product(
    State(state): State<AppState>,
    CurrentPharmacy(pharmacy_id): CurrentPharmacy,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>> {
    let existing = fetch_product(&state, id).await?;
    ensure_owner(&existing, pharmacy_id)?;

    sqlx::query("UPDATE products SET status = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(ProductStatus::Inactive)
        .execute(&state.pool)
        .await?;

    invalidate(&state, id).await;
    info!(product_id = id, pharmacy_id, "Product deactivated");
    Ok(Json(ApiResponse::<()>::success_empty()))
}

/// 设置库存总量
///
/// PUT /api/v1/products/{id}/stock
///
/// 与下单共用行锁，新库存不能低于已预占数量
pub async fn adjust_stock(
    State(state): State<AppState>,
    CurrentPharmacy(pharmacy_id): CurrentPharmacy,
    Path(id): Path<i64>,
    Json(req): Json<AdjustStockRequest>,
) -> Result<Json<ApiResponse<Product>>> {
    req.validate()?;

    let mut tx = state.pool.begin().await?;

    let mut locked = ProductRepository::lock_products_in_tx(&mut tx, &[id]).await?;
    let mut product = locked.pop().ok_or(CommerceError::ProductNotFound(id))?;
    ensure_owner(&product, pharmacy_id)?;

    let mut level = StockLevel::from(&product);
    let previous = level.stock;
    level.adjust(req.stock)?;
    ProductRepository::save_stock_levels_in_tx(&mut tx, &[level]).await?;

    tx.commit().await?;

    product.stock = level.stock;
    invalidate(&state, id).await;
    info!(
        product_id = id,
        pharmacy_id,
        previous,
        stock = level.stock,
        reserved = level.reserved,
        "Stock adjusted"
    );

    Ok(Json(ApiResponse::success(product)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use commerce::models::ProductCategory;

    fn product(pharmacy_id: i64) -> Product {
        Product {
            id: 5,
            pharmacy_id,
            name: "Joint supplement".to_string(),
            description: None,
            category: ProductCategory::Supplement,
            species: Some("dog".to_string()),
            price_cents: 3_200,
            stock: 10,
            reserved: 4,
            image_url: None,
            requires_prescription: false,
            status: ProductStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_ensure_owner() {
        assert!(ensure_owner(&product(1), 1).is_ok());
        let err = ensure_owner(&product(1), 2).unwrap_err();
        assert_eq!(err.error_code(), "FORBIDDEN");
    }

    #[test]
    fn test_search_pattern_escapes_wildcards() {
        assert_eq!(search_pattern(Some("  flea ")), Some("%flea%".to_string()));
        assert_eq!(search_pattern(Some("100%")), Some("%100\\%%".to_string()));
        assert_eq!(search_pattern(Some("   ")), None);
        assert_eq!(search_pattern(None), None);
    }
}
