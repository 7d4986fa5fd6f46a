//! 收藏处理器

use axum::{
    Json,
    extract::{Path, State},
};
use commerce::CommerceError;

use crate::dto::{ApiResponse, FavoriteDto};
use crate::error::{ApiError, Result};
use crate::middleware::CurrentCustomer;
use crate::state::AppState;

/// GET /api/v1/favorites
pub async fn list_favorites(
    State(state): State<AppState>,
    CurrentCustomer(customer_id): CurrentCustomer,
) -> Result<Json<ApiResponse<Vec<FavoriteDto>>>> {
    let favorites = sqlx::query_as::<_, FavoriteDto>(
        r#"
        SELECT f.product_id, p.pharmacy_id, p.name, p.category, p.price_cents,
               p.image_url, p.status, f.created_at
        FROM favorites f
        JOIN products p ON p.id = f.product_id
        WHERE f.customer_id = $1
        ORDER BY f.created_at DESC
        "#,
    )
    .bind(customer_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(ApiResponse::success(favorites)))
}

/// 收藏商品（重复收藏幂等）
///
/// POST /api/v1/favorites/{product_id}
pub async fn add_favorite(
    State(state): State<AppState>,
    CurrentCustomer(customer_id): CurrentCustomer,
    Path(product_id): Path<i64>,
) -> Result<Json<ApiResponse<()>>> {
    sqlx::query(
        r#"
        INSERT INTO favorites (customer_id, product_id)
        VALUES ($1, $2)
        ON CONFLICT (customer_id, product_id) DO NOTHING
        "#,
    )
    .bind(customer_id)
    .bind(product_id)
    .execute(&state.pool)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            ApiError::from(CommerceError::ProductNotFound(product_id))
        }
        _ => ApiError::Database(e),
    })?;

    Ok(Json(ApiResponse::<()>::success_empty()))
}

/// DELETE /api/v1/favorites/{product_id}
pub async fn remove_favorite(
    State(state): State<AppState>,
    CurrentCustomer(customer_id): CurrentCustomer,
    Path(product_id): Path<i64>,
) -> Result<Json<ApiResponse<()>>> {
    sqlx::query("DELETE FROM favorites WHERE customer_id = $1 AND product_id = $2")
        .bind(customer_id)
        .bind(product_id)
        .execute(&state.pool)
        .await?;

    Ok(Json(ApiResponse::<()>::success_empty()))
}
