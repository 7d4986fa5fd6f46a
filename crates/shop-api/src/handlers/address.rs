//! 收货地址处理器
//!
//! 每个顾客最多一个默认地址（数据库部分唯一索引兜底）。
//! 第一个地址自动成为默认，删除默认地址后最近创建的地址接替。
//! 涉及默认地址的写操作先锁定顾客行，同一顾客的并发请求串行执行。

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use commerce::CommerceError;
use commerce::models::Address;
use sqlx::PgConnection;
use tracing::info;
use validator::Validate;

use crate::dto::{AddressRequest, ApiResponse};
use crate::error::{ApiError, Result};
use crate::handlers::auth::map_unique_violation;
use crate::middleware::CurrentCustomer;
use crate::state::AppState;

const ADDRESS_COLUMNS: &str = "id, customer_id, label, recipient, phone, line1, line2, city, \
                               postal_code, is_default, created_at, updated_at";

/// 默认地址部分唯一索引
const DEFAULT_ADDRESS_INDEX: &str = "uq_addresses_default";

/// 锁定顾客行，串行化同一顾客的默认地址变更
async fn lock_customer_in_tx(tx: &mut PgConnection, customer_id: i64) -> Result<()> {
    sqlx::query("SELECT id FROM customers WHERE id = $1 FOR UPDATE")
        .bind(customer_id)
        .fetch_optional(tx)
        .await?;
    Ok(())
}

fn default_conflict(err: sqlx::Error) -> ApiError {
    map_unique_violation(err, |constraint| match constraint {
        Some(DEFAULT_ADDRESS_INDEX) => ApiError::Conflict("默认地址已被并发修改，请重试".to_string()),
        _ => ApiError::Conflict("地址数据冲突".to_string()),
    })
}

async fn clear_default_in_tx(tx: &mut PgConnection, customer_id: i64) -> Result<()> {
    sqlx::query(
        "UPDATE addresses SET is_default = FALSE, updated_at = NOW() \
         WHERE customer_id = $1 AND is_default",
    )
    .bind(customer_id)
    .execute(tx)
    .await?;
    Ok(())
}

async fn has_default_in_tx(tx: &mut PgConnection, customer_id: i64) -> Result<bool> {
    let (exists,): (bool,) = sqlx::query_as(
        "SELECT EXISTS(SELECT 1 FROM addresses WHERE customer_id = $1 AND is_default)",
    )
    .bind(customer_id)
    .fetch_one(tx)
    .await?;
    Ok(exists)
}

/// GET /api/v1/addresses
pub async fn list_addresses(
    State(state): State<AppState>,
    CurrentCustomer(customer_id): CurrentCustomer,
) -> Result<Json<ApiResponse<Vec<Address>>>> {
    let addresses = sqlx::query_as::<_, Address>(&format!(
        "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE customer_id = $1 \
         ORDER BY is_default DESC, created_at DESC"
    ))
    .bind(customer_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(ApiResponse::success(addresses)))
}

/// POST /api/v1/addresses
pub async fn create_address(
    State(state): State<AppState>,
    CurrentCustomer(customer_id): CurrentCustomer,
    Json(req): Json<AddressRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Address>>)> {
    req.validate()?;

    let mut tx = state.pool.begin().await?;
    lock_customer_in_tx(&mut tx, customer_id).await?;

    let make_default = req.is_default || !has_default_in_tx(&mut tx, customer_id).await?;
    if make_default {
        clear_default_in_tx(&mut tx, customer_id).await?;
    }

    let address = sqlx::query_as::<_, Address>(&format!(
        r#"
        INSERT INTO addresses (customer_id, label, recipient, phone, line1, line2, city,
                               postal_code, is_default)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {ADDRESS_COLUMNS}
        "#
    ))
    .bind(customer_id)
    .bind(&req.label)
    .bind(req.recipient.trim())
    .bind(req.phone.trim())
    .bind(req.line1.trim())
    .bind(&req.line2)
    .bind(req.city.trim())
    .bind(&req.postal_code)
    .bind(make_default)
    .fetch_one(&mut *tx)
    .await
    .map_err(default_conflict)?;

    tx.commit().await?;

    info!(customer_id, address_id = address.id, is_default = make_default, "Address created");
    Ok((StatusCode::CREATED, Json(ApiResponse::success(address))))
}

/// PUT /api/v1/addresses/{id}
pub async fn update_address(
    State(state): State<AppState>,
    CurrentCustomer(customer_id): CurrentCustomer,
    Path(id): Path<i64>,
    Json(req): Json<AddressRequest>,
) -> Result<Json<ApiResponse<Address>>> {
    req.validate()?;

    let mut tx = state.pool.begin().await?;

    if req.is_default {
        lock_customer_in_tx(&mut tx, customer_id).await?;
        clear_default_in_tx(&mut tx, customer_id).await?;
    }

    // is_default=false 不会取消已有的默认地址
    let address = sqlx::query_as::<_, Address>(&format!(
        r#"
        UPDATE addresses
        SET label = $3, recipient = $4, phone = $5, line1 = $6, line2 = $7, city = $8,
            postal_code = $9, is_default = is_default OR $10, updated_at = NOW()
        WHERE id = $1 AND customer_id = $2
        RETURNING {ADDRESS_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(customer_id)
    .bind(&req.label)
    .bind(req.recipient.trim())
    .bind(req.phone.trim())
    .bind(req.line1.trim())
    .bind(&req.line2)
    .bind(req.city.trim())
    .bind(&req.postal_code)
    .bind(req.is_default)
    .fetch_optional(&mut *tx)
    .await
    .map_err(default_conflict)?
    .ok_or(CommerceError::AddressNotFound(id))?;

    tx.commit().await?;

    info!(customer_id, address_id = id, "Address updated");
    Ok(Json(ApiResponse::success(address)))
}

/// DELETE /api/v1/addresses/{id}
pub async fn delete_address(
    State(state): State<AppState>,
    CurrentCustomer(customer_id): CurrentCustomer,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>> {
    let mut tx = state.pool.begin().await?;
    lock_customer_in_tx(&mut tx, customer_id).await?;

    let deleted: Option<(bool,)> = sqlx::query_as(
        "DELETE FROM addresses WHERE id = $1 AND customer_id = $2 RETURNING is_default",
    )
    .bind(id)
    .bind(customer_id)
    .fetch_optional(&mut *tx)
    .await?;

    let (was_default,) = deleted.ok_or(CommerceError::AddressNotFound(id))?;

    if was_default {
        sqlx::query(
            r#"
            UPDATE addresses SET is_default = TRUE, updated_at = NOW()
            WHERE id = (
                SELECT id FROM addresses WHERE customer_id = $1
                ORDER BY created_at DESC, id DESC LIMIT 1
            )
            "#,
        )
        .bind(customer_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    info!(customer_id, address_id = id, was_default, "Address deleted");
    Ok(Json(ApiResponse::<()>::success_empty()))
}

/// POST /api/v1/addresses/{id}/default
pub async fn set_default_address(
    State(state): State<AppState>,
    CurrentCustomer(customer_id): CurrentCustomer,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Address>>> {
    let mut tx = state.pool.begin().await?;
    lock_customer_in_tx(&mut tx, customer_id).await?;
    clear_default_in_tx(&mut tx, customer_id).await?;

    let address = sqlx::query_as::<_, Address>(&format!(
        "UPDATE addresses SET is_default = TRUE, updated_at = NOW() \
         WHERE id = $1 AND customer_id = $2 RETURNING {ADDRESS_COLUMNS}"
    ))
    .bind(id)
    .bind(customer_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(default_conflict)?
    .ok_or(CommerceError::AddressNotFound(id))?;

    tx.commit().await?;

    info!(customer_id, address_id = id, "Default address changed");
    Ok(Json(ApiResponse::success(address)))
}
