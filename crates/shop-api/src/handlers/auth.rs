//! 认证相关的 HTTP 处理器
//!
//! 顾客和药房分别注册、登录，登录后共用 /auth/me 与 /auth/refresh

use axum::{Json, extract::State, http::StatusCode};
use commerce::models::{AccountStatus, ActorRole};
use sqlx::FromRow;
use tracing::{info, warn};
use validator::Validate;

use crate::auth::{hash_password, verify_password};
use crate::dto::{
    ApiResponse, AuthResponse, CurrentAccount, CustomerDto, LoginRequest, PharmacyDto,
    RefreshResponse, RegisterCustomerRequest, RegisterPharmacyRequest,
};
use crate::error::{ApiError, Result};
use crate::middleware::CurrentActor;
use crate::state::AppState;

/// 登录校验所需的账户字段
#[derive(Debug, FromRow)]
struct CredentialRow {
    id: i64,
    name: String,
    password_hash: String,
    status: AccountStatus,
}

/// 唯一约束冲突转换为业务错误，其余保持数据库错误
pub(crate) fn map_unique_violation(err: sqlx::Error, conflict: impl FnOnce(Option<&str>) -> ApiError) -> ApiError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => conflict(db.constraint()),
        _ => ApiError::Database(err),
    }
}

fn check_credentials(row: Option<CredentialRow>, password: &str) -> Result<CredentialRow> {
    let row = row.ok_or(ApiError::InvalidCredentials)?;

    if !verify_password(password, &row.password_hash)? {
        return Err(ApiError::InvalidCredentials);
    }
    if row.status == AccountStatus::Disabled {
        return Err(ApiError::AccountDisabled);
    }

    Ok(row)
}

fn issue(state: &AppState, id: i64, role: ActorRole, name: String) -> Result<AuthResponse> {
    let (token, expires_at) = state.jwt_manager.generate_token(id, role, &name)?;
    Ok(AuthResponse {
        token,
        expires_at,
        role,
        account_id: id,
        name,
    })
}

/// 顾客注册
///
/// POST /api/v1/auth/customers/register
pub async fn register_customer(
    State(state): State<AppState>,
    Json(req): Json<RegisterCustomerRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthResponse>>)> {
    req.validate()?;

    let email = req.email.trim().to_lowercase();
    let password_hash = hash_password(&req.password)?;

    let mut tx = state.pool.begin().await?;

    let customer = sqlx::query_as::<_, CustomerDto>(
        r#"
        INSERT INTO customers (email, password_hash, full_name, phone)
        VALUES ($1, $2, $3, $4)
        RETURNING id, email, full_name, phone, status, created_at
        "#,
    )
    .bind(&email)
    .bind(&password_hash)
    .bind(req.full_name.trim())
    .bind(&req.phone)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| map_unique_violation(e, |_| ApiError::EmailTaken))?;

    sqlx::query("INSERT INTO loyalty_accounts (customer_id) VALUES ($1)")
        .bind(customer.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    info!(customer_id = customer.id, "Customer registered");

    let auth = issue(&state, customer.id, ActorRole::Customer, customer.full_name)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(auth))))
}

/// 顾客登录
///
/// POST /api/v1/auth/customers/login
pub async fn login_customer(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>> {
    req.validate()?;

    let row = sqlx::query_as::<_, CredentialRow>(
        r#"
        SELECT id, full_name AS name, password_hash, status
        FROM customers
        WHERE email = $1
        "#,
    )
    .bind(req.email.trim().to_lowercase())
    .fetch_optional(&state.pool)
    .await?;

    let row = check_credentials(row, &req.password).inspect_err(|e| {
        warn!(email = %req.email, reason = e.error_code(), "Customer login rejected");
    })?;

    info!(customer_id = row.id, "Customer logged in");
    let auth = issue(&state, row.id, ActorRole::Customer, row.name)?;
    Ok(Json(ApiResponse::success(auth)))
}

/// 药房注册
///
/// POST /api/v1/auth/pharmacies/register
pub async fn register_pharmacy(
    State(state): State<AppState>,
    Json(req): Json<RegisterPharmacyRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthResponse>>)> {
    req.validate()?;

    let email = req.email.trim().to_lowercase();
    let password_hash = hash_password(&req.password)?;

    let pharmacy = sqlx::query_as::<_, PharmacyDto>(
        r#"
        INSERT INTO pharmacies (email, password_hash, name, license_number, phone,
                                description, address_line, city)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, email, name, license_number, phone, description, address_line,
                  city, logo_url, status, created_at
        "#,
    )
    .bind(&email)
    .bind(&password_hash)
    .bind(req.name.trim())
    .bind(req.license_number.trim())
    .bind(&req.phone)
    .bind(&req.description)
    .bind(&req.address_line)
    .bind(&req.city)
    .fetch_one(&state.pool)
    .await
    .map_err(|e| {
        map_unique_violation(e, |constraint| match constraint {
            Some(c) if c.contains("license") => ApiError::Conflict("执照编号已被注册".to_string()),
            _ => ApiError::EmailTaken,
        })
    })?;

    info!(pharmacy_id = pharmacy.id, "Pharmacy registered");

    let auth = issue(&state, pharmacy.id, ActorRole::Pharmacy, pharmacy.name)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(auth))))
}

/// 药房登录
///
/// POST /api/v1/auth/pharmacies/login
pub async fn login_pharmacy(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>> {
    req.validate()?;

    let row = sqlx::query_as::<_, CredentialRow>(
        r#"
        SELECT id, name, password_hash, status
        FROM pharmacies
        WHERE email = $1
        "#,
    )
    .bind(req.email.trim().to_lowercase())
    .fetch_optional(&state.pool)
    .await?;

    let row = check_credentials(row, &req.password).inspect_err(|e| {
        warn!(email = %req.email, reason = e.error_code(), "Pharmacy login rejected");
    })?;

    info!(pharmacy_id = row.id, "Pharmacy logged in");
    let auth = issue(&state, row.id, ActorRole::Pharmacy, row.name)?;
    Ok(Json(ApiResponse::success(auth)))
}

/// 获取当前登录账户
///
/// GET /api/v1/auth/me
pub async fn me(
    State(state): State<AppState>,
    current: CurrentActor,
) -> Result<Json<ApiResponse<CurrentAccount>>> {
    let account = match current.actor.role {
        ActorRole::Customer => CurrentAccount::Customer {
            customer: super::customer::fetch_customer(&state, current.actor.id).await?,
        },
        ActorRole::Pharmacy => CurrentAccount::Pharmacy {
            pharmacy: super::pharmacy::fetch_pharmacy(&state, current.actor.id).await?,
        },
    };

    Ok(Json(ApiResponse::success(account)))
}

/// 刷新 Token
///
/// POST /api/v1/auth/refresh
pub async fn refresh_token(
    State(state): State<AppState>,
    current: CurrentActor,
) -> Result<Json<ApiResponse<RefreshResponse>>> {
    let (token, expires_at) = state.jwt_manager.refresh_token(&current.claims)?;
    Ok(Json(ApiResponse::success(RefreshResponse { token, expires_at })))
}
