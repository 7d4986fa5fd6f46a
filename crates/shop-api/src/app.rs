//! 应用装配
//!
//! 路由、中间件栈和健康检查，main 与集成测试共用

use axum::{
    Json, Router,
    extract::{Request, State},
    http::{HeaderName, HeaderValue},
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use vetshop_shared::database::Database;
use vetshop_shared::observability::middleware as obs_middleware;

use crate::{middleware::auth_middleware, routes, state::AppState};

const SERVICE_NAME: &str = "vetshop-api";

/// 根据逗号分隔的来源列表构建 CORS 层，"*" 表示全部放行
pub fn cors_layer(allowed_origins: &str) -> CorsLayer {
    if allowed_origins.trim() == "*" {
        info!("CORS allowed_origins: * (all origins)");
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    info!("CORS allowed_origins: {}", allowed_origins);
    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// 构建完整的应用路由
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        // 认证失败的响应同样带安全头；CORS 在认证之外，预检请求不需要 Token
        .layer(middleware::from_fn(security_headers))
        .layer(cors)
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(state)
}

/// 为所有响应注入 HTTP 安全头
async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        HeaderName::from_static("x-frame-options"),
        HeaderValue::from_static("DENY"),
    );
    headers.insert(
        HeaderName::from_static("strict-transport-security"),
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );
    headers.insert(
        HeaderName::from_static("x-xss-protection"),
        HeaderValue::from_static("0"),
    );
    response
}

/// 存活探针
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": SERVICE_NAME
    }))
}

/// 就绪探针：检查数据库和 Redis
async fn readiness_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let db_ok = Database::from_pool(state.pool.clone())
        .health_check()
        .await
        .is_ok();
    let cache_ok = state.cache.health_check().await.is_ok();
    let all_ok = db_ok && cache_ok;

    Json(serde_json::json!({
        "status": if all_ok { "ok" } else { "degraded" },
        "service": SERVICE_NAME,
        "checks": {
            "database": if db_ok { "ok" } else { "fail" },
            "redis": if cache_ok { "ok" } else { "fail" }
        }
    }))
}
