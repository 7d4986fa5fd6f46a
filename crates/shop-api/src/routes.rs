//! 路由配置模块
//!
//! 所有业务接口挂在 /api/v1 下，认证规则见 `middleware::auth`

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::{handlers, state::AppState};

/// 注册、登录与 Token 管理
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/customers/register", post(handlers::auth::register_customer))
        .route("/auth/customers/login", post(handlers::auth::login_customer))
        .route("/auth/pharmacies/register", post(handlers::auth::register_pharmacy))
        .route("/auth/pharmacies/login", post(handlers::auth::login_pharmacy))
        .route("/auth/me", get(handlers::auth::me))
        .route("/auth/refresh", post(handlers::auth::refresh_token))
}

fn account_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/customers/me",
            get(handlers::customer::get_profile).put(handlers::customer::update_profile),
        )
        .route("/pharmacies", get(handlers::pharmacy::list_pharmacies))
        .route("/pharmacies/me", put(handlers::pharmacy::update_profile))
        .route("/pharmacies/{id}", get(handlers::pharmacy::get_pharmacy))
}

/// 商品目录
fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/products",
            get(handlers::product::list_products).post(handlers::product::create_product),
        )
        .route(
            "/products/{id}",
            get(handlers::product::get_product)
                .put(handlers::product::update_product)
                .delete(handlers::product::delete_product),
        )
        .route("/products/{id}/stock", put(handlers::product::adjust_stock))
        .route("/pharmacy/products", get(handlers::product::list_own_products))
}

/// 购物车、地址与收藏
fn shopping_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/cart",
            get(handlers::cart::get_cart).delete(handlers::cart::clear_cart),
        )
        .route("/cart/items", post(handlers::cart::add_item))
        .route(
            "/cart/items/{product_id}",
            put(handlers::cart::update_item).delete(handlers::cart::remove_item),
        )
        .route("/cart/checkout", post(handlers::cart::checkout))
        .route(
            "/addresses",
            get(handlers::address::list_addresses).post(handlers::address::create_address),
        )
        .route(
            "/addresses/{id}",
            put(handlers::address::update_address).delete(handlers::address::delete_address),
        )
        .route(
            "/addresses/{id}/default",
            post(handlers::address::set_default_address),
        )
        .route("/favorites", get(handlers::favorite::list_favorites))
        .route(
            "/favorites/{product_id}",
            post(handlers::favorite::add_favorite).delete(handlers::favorite::remove_favorite),
        )
}

/// 订单（顾客与药房）
fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/orders/quote", post(handlers::order::quote_order))
        .route(
            "/orders",
            get(handlers::order::list_orders).post(handlers::order::create_order),
        )
        .route("/orders/{id}", get(handlers::order::get_order))
        .route("/orders/{id}/cancel", post(handlers::order::cancel_order))
        .route("/pharmacy/orders", get(handlers::pharmacy_order::list_orders))
        .route(
            "/pharmacy/orders/{id}/status",
            post(handlers::pharmacy_order::update_status),
        )
}

fn loyalty_routes() -> Router<AppState> {
    Router::new()
        .route("/loyalty", get(handlers::loyalty::get_summary))
        .route("/loyalty/tiers", get(handlers::loyalty::get_tiers))
        .route("/loyalty/ledger", get(handlers::loyalty::get_ledger))
        .route("/loyalty/redeem", post(handlers::loyalty::redeem))
}

/// 构建所有 API 路由
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(auth_routes())
        .merge(account_routes())
        .merge(catalog_routes())
        .merge(shopping_routes())
        .merge(order_routes())
        .merge(loyalty_routes())
}
