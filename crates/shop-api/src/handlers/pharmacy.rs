//! 药房处理器
//!
//! 药房列表与详情公开访问，详情缓存在 Redis；资料修改仅限药房本人

use std::time::Duration;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::{info, warn};
use validator::Validate;
use vetshop_shared::cache::CacheKey;

use crate::dto::{ApiResponse, PageResponse, PaginationParams, PharmacyDto, UpdatePharmacyRequest};
use crate::error::{ApiError, Result};
use crate::middleware::CurrentPharmacy;
use crate::state::AppState;

const PHARMACY_COLUMNS: &str = "id, email, name, license_number, phone, description, \
                                address_line, city, logo_url, status, created_at";

pub(crate) async fn fetch_pharmacy(state: &AppState, pharmacy_id: i64) -> Result<PharmacyDto> {
    sqlx::query_as::<_, PharmacyDto>(&format!(
        "SELECT {PHARMACY_COLUMNS} FROM pharmacies WHERE id = $1"
    ))
    .bind(pharmacy_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("药房 {}", pharmacy_id)))
}

/// 药房列表（仅正常营业）
///
/// GET /api/v1/pharmacies
pub async fn list_pharmacies(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PageResponse<PharmacyDto>>>> {
    let (total,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM pharmacies WHERE status = 'ACTIVE'")
            .fetch_one(&state.pool)
            .await?;

    let items = sqlx::query_as::<_, PharmacyDto>(&format!(
        "SELECT {PHARMACY_COLUMNS} FROM pharmacies WHERE status = 'ACTIVE' \
         ORDER BY name ASC, id ASC LIMIT $1 OFFSET $2"
    ))
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

/// 药房详情
///
/// GET /api/v1/pharmacies/{id}
pub async fn get_pharmacy(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<PharmacyDto>>> {
    let key = CacheKey::pharmacy_detail(id);

    // 缓存不可用时直接回源
    match state.cache.get::<PharmacyDto>(&key).await {
        Ok(Some(cached)) => return Ok(Json(ApiResponse::success(cached))),
        Ok(None) => {}
        Err(e) => warn!(error = %e, pharmacy_id = id, "Pharmacy cache read failed"),
    }

    let pharmacy = fetch_pharmacy(&state, id).await?;

    let ttl = Duration::from_secs(state.shop.product_cache_ttl_secs);
    if let Err(e) = state.cache.set(&key, &pharmacy, ttl).await {
        warn!(error = %e, pharmacy_id = id, "Pharmacy cache write failed");
    }

    Ok(Json(ApiResponse::success(pharmacy)))
}

/// 修改药房资料
///
/// PUT /api/v1/pharmacies/me
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentPharmacy(pharmacy_id): CurrentPharmacy,
    Json(req): Json<UpdatePharmacyRequest>,
) -> Result<Json<ApiResponse<PharmacyDto>>> {
    req.validate()?;

    let pharmacy = sqlx::query_as::<_, PharmacyDto>(&format!(
        r#"
        UPDATE pharmacies
        SET name = COALESCE($2, name),
            phone = COALESCE($3, phone),
            description = COALESCE($4, description),
            address_line = COALESCE($5, address_line),
            city = COALESCE($6, city),
            logo_url = COALESCE($7, logo_url),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {PHARMACY_COLUMNS}
        "#
    ))
    .bind(pharmacy_id)
    .bind(req.name.as_deref().map(str::trim))
    .bind(&req.phone)
    .bind(&req.description)
    .bind(&req.address_line)
    .bind(&req.city)
    .bind(&req.logo_url)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("药房 {}", pharmacy_id)))?;

    if let Err(e) = state.cache.delete(&CacheKey::pharmacy_detail(pharmacy_id)).await {
        warn!(error = %e, pharmacy_id, "Pharmacy cache invalidation failed");
    }

    info!(pharmacy_id, "Pharmacy profile updated");
    Ok(Json(ApiResponse::success(pharmacy)))
}
