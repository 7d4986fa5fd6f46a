//! JWT 认证中间件
//!
//! 验证请求中的 Bearer Token 并将 Claims 注入请求扩展，
//! 处理器通过 `CurrentCustomer` / `CurrentPharmacy` / `CurrentActor` 提取身份。

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{Method, Request, StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use commerce::models::{Actor, ActorRole};
use serde_json::json;

use crate::auth::Claims;
use crate::error::ApiError;
use crate::state::AppState;

/// 任意方法均公开的路由
const PUBLIC_PATHS: &[&str] = &[
    "/api/v1/auth/customers/register",
    "/api/v1/auth/customers/login",
    "/api/v1/auth/pharmacies/register",
    "/api/v1/auth/pharmacies/login",
    "/health",
    "/ready",
];

/// 仅 GET 公开的路由前缀
const PUBLIC_READ_PREFIXES: &[&str] = &[
    "/api/v1/products",
    "/api/v1/pharmacies",
    "/api/v1/loyalty/tiers",
];

/// 判断请求是否无需认证
pub fn is_public(method: &Method, path: &str) -> bool {
    if PUBLIC_PATHS.contains(&path) {
        return true;
    }

    // /api/v1/pharmacies/me 只有 PUT，不会被 GET 放行误伤
    *method == Method::GET
        && PUBLIC_READ_PREFIXES
            .iter()
            .any(|p| path == *p || path.starts_with(&format!("{p}/")))
}

/// 认证中间件
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if is_public(request.method(), request.uri().path()) {
        return next.run(request).await;
    }

    let token = match request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
    {
        Some(token) => token.to_string(),
        None => return unauthorized_response("缺少认证 Token"),
    };

    match state.jwt_manager.verify_token(&token) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => unauthorized_response(&e.to_string()),
    }
}

fn unauthorized_response(message: &str) -> Response {
    let body = json!({
        "success": false,
        "code": "UNAUTHORIZED",
        "message": message,
        "data": null
    });

    (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
}

fn claims_from(parts: &Parts) -> Result<&Claims, ApiError> {
    parts
        .extensions
        .get::<Claims>()
        .ok_or_else(|| ApiError::Unauthorized("未登录".to_string()))
}

/// 当前登录的顾客或药房
#[derive(Debug, Clone)]
pub struct CurrentActor {
    pub actor: Actor,
    pub claims: Claims,
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentActor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = claims_from(parts)?.clone();
        let actor = claims.actor()?;
        Ok(Self { actor, claims })
    }
}

/// 当前登录的顾客 ID
#[derive(Debug, Clone, Copy)]
pub struct CurrentCustomer(pub i64);

impl<S: Send + Sync> FromRequestParts<S> for CurrentCustomer {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor = claims_from(parts)?.actor()?;
        match actor.role {
            ActorRole::Customer => Ok(Self(actor.id)),
            ActorRole::Pharmacy => Err(ApiError::Forbidden("仅限顾客账户".to_string())),
        }
    }
}

/// 当前登录的药房 ID
#[derive(Debug, Clone, Copy)]
pub struct CurrentPharmacy(pub i64);

impl<S: Send + Sync> FromRequestParts<S> for CurrentPharmacy {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor = claims_from(parts)?.actor()?;
        match actor.role {
            ActorRole::Pharmacy => Ok(Self(actor.id)),
            ActorRole::Customer => Err(ApiError::Forbidden("仅限药房账户".to_string())),
        }
    }
}
