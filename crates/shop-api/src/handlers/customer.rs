//! 顾客资料处理器

use axum::{Json, extract::State};
use tracing::info;
use validator::Validate;

use crate::dto::{ApiResponse, CustomerDto, UpdateCustomerRequest};
use crate::error::{ApiError, Result};
use crate::middleware::CurrentCustomer;
use crate::state::AppState;

pub(crate) async fn fetch_customer(state: &AppState, customer_id: i64) -> Result<CustomerDto> {
    sqlx::query_as::<_, CustomerDto>(
        r#"
        SELECT id, email, full_name, phone, status, created_at
        FROM customers
        WHERE id = $1
        "#,
    )
    .bind(customer_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("顾客 {}", customer_id)))
}

/// GET /api/v1/customers/me
pub async fn get_profile(
    State(state): State<AppState>,
    CurrentCustomer(customer_id): CurrentCustomer,
) -> Result<Json<ApiResponse<CustomerDto>>> {
    let customer = fetch_customer(&state, customer_id).await?;
    Ok(Json(ApiResponse::success(customer)))
}

/// PUT /api/v1/customers/me
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentCustomer(customer_id): CurrentCustomer,
    Json(req): Json<UpdateCustomerRequest>,
) -> Result<Json<ApiResponse<CustomerDto>>> {
    req.validate()?;

    let customer = sqlx::query_as::<_, CustomerDto>(
        r#"
        UPDATE customers
        SET full_name = COALESCE($2, full_name),
            phone = COALESCE($3, phone),
            updated_at = NOW()
        WHERE id = $1
        RETURNING id, email, full_name, phone, status, created_at
        "#,
    )
    .bind(customer_id)
    .bind(req.full_name.as_deref().map(str::trim))
    .bind(&req.phone)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("顾客 {}", customer_id)))?;

    info!(customer_id, "Customer profile updated");
    Ok(Json(ApiResponse::success(customer)))
}
