//! 购物车处理器
//!
//! 结算时把购物车行交给订单服务下单，成功后移除已下单的行

use std::time::Duration;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use commerce::CommerceError;
use commerce::models::{OrderDetail, ProductStatus};
use commerce::order::LineRequest;
use commerce::service::CreateOrderRequest;
use tracing::{info, warn};
use validator::Validate;
use vetshop_shared::cache::CacheKey;

use crate::dto::{
    AddCartItemRequest, ApiResponse, CartDto, CartLineDto, CheckoutRequest, UpdateCartItemRequest,
};
use crate::error::{ApiError, Result};
use crate::middleware::CurrentCustomer;
use crate::state::AppState;

/// 结算锁的有效期，覆盖一次下单事务
const CHECKOUT_LOCK_TTL: Duration = Duration::from_secs(30);

async fn load_cart(state: &AppState, customer_id: i64) -> Result<Vec<CartLineDto>> {
    let lines = sqlx::query_as::<_, CartLineDto>(
        r#"
        SELECT c.product_id, p.pharmacy_id, p.name, p.image_url, p.price_cents,
               c.quantity, (p.stock - p.reserved) AS available, p.status, c.added_at
        FROM cart_items c
        JOIN products p ON p.id = c.product_id
        WHERE c.customer_id = $1
        ORDER BY c.added_at ASC, c.product_id ASC
        "#,
    )
    .bind(customer_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(lines)
}

fn quantity_error(max: i32) -> ApiError {
    ApiError::Validation(format!("单个商品数量不能超过 {}", max))
}

fn check_quantity(state: &AppState, quantity: i32) -> Result<()> {
    if quantity > state.shop.max_item_quantity {
        return Err(quantity_error(state.shop.max_item_quantity));
    }
    Ok(())
}

/// 选出要结算的购物车行
fn checkout_lines(cart: &[CartLineDto], pharmacy_id: Option<i64>) -> Result<Vec<LineRequest>> {
    let lines: Vec<LineRequest> = cart
        .iter()
        .filter(|l| pharmacy_id.is_none_or(|id| l.pharmacy_id == id))
        .map(|l| LineRequest {
            product_id: l.product_id,
            quantity: l.quantity,
        })
        .collect();

    if lines.is_empty() {
        return Err(ApiError::Validation("购物车中没有可结算的商品".to_string()));
    }
    Ok(lines)
}

/// GET /api/v1/cart
pub async fn get_cart(
    State(state): State<AppState>,
    CurrentCustomer(customer_id): CurrentCustomer,
) -> Result<Json<ApiResponse<CartDto>>> {
    let lines = load_cart(&state, customer_id).await?;
    Ok(Json(ApiResponse::success(CartDto::new(lines))))
}

/// 加入购物车（已存在则累加数量）
///
/// POST /api/v1/cart/items
pub async fn add_item(
    State(state): State<AppState>,
    CurrentCustomer(customer_id): CurrentCustomer,
    Json(req): Json<AddCartItemRequest>,
) -> Result<Json<ApiResponse<CartDto>>> {
    req.validate()?;
    check_quantity(&state, req.quantity)?;

    let status: Option<(ProductStatus,)> =
        sqlx::query_as("SELECT status FROM products WHERE id = $1")
            .bind(req.product_id)
            .fetch_optional(&state.pool)
            .await?;
    match status {
        None => return Err(CommerceError::ProductNotFound(req.product_id).into()),
        Some((ProductStatus::Inactive,)) => {
            return Err(CommerceError::ProductInactive(req.product_id).into());
        }
        Some((ProductStatus::Active,)) => {}
    }

    let updated: Option<(i32,)> = sqlx::query_as(
        r#"
        INSERT INTO cart_items (customer_id, product_id, quantity)
        VALUES ($1, $2, $3)
        ON CONFLICT (customer_id, product_id)
        DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
        WHERE cart_items.quantity + EXCLUDED.quantity <= $4
        RETURNING quantity
        "#,
    )
    .bind(customer_id)
    .bind(req.product_id)
    .bind(req.quantity)
    .bind(state.shop.max_item_quantity)
    .fetch_optional(&state.pool)
    .await?;

    if updated.is_none() {
        return Err(quantity_error(state.shop.max_item_quantity));
    }

    let lines = load_cart(&state, customer_id).await?;
    Ok(Json(ApiResponse::success(CartDto::new(lines))))
}

/// PUT /api/v1/cart/items/{product_id}
pub async fn update_item(
    State(state): State<AppState>,
    CurrentCustomer(customer_id): CurrentCustomer,
    Path(product_id): Path<i64>,
    Json(req): Json<UpdateCartItemRequest>,
) -> Result<Json<ApiResponse<CartDto>>> {
    req.validate()?;
    check_quantity(&state, req.quantity)?;

    let result = sqlx::query(
        "UPDATE cart_items SET quantity = $3 WHERE customer_id = $1 AND product_id = $2",
    )
    .bind(customer_id)
    .bind(product_id)
    .bind(req.quantity)
    .execute(&state.pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound(format!("购物车商品 {}", product_id)));
    }

    let lines = load_cart(&state, customer_id).await?;
    Ok(Json(ApiResponse::success(CartDto::new(lines))))
}

/// DELETE /api/v1/cart/items/{product_id}
pub async fn remove_item(
    State(state): State<AppState>,
    CurrentCustomer(customer_id): CurrentCustomer,
    Path(product_id): Path<i64>,
) -> Result<Json<ApiResponse<CartDto>>> {
    sqlx::query("DELETE FROM cart_items WHERE customer_id = $1 AND product_id = $2")
        .bind(customer_id)
        .bind(product_id)
        .execute(&state.pool)
        .await?;

    let lines = load_cart(&state, customer_id).await?;
    Ok(Json(ApiResponse::success(CartDto::new(lines))))
}

/// DELETE /api/v1/cart
pub async fn clear_cart(
    State(state): State<AppState>,
    CurrentCustomer(customer_id): CurrentCustomer,
) -> Result<Json<ApiResponse<()>>> {
    sqlx::query("DELETE FROM cart_items WHERE customer_id = $1")
        .bind(customer_id)
        .execute(&state.pool)
        .await?;

    Ok(Json(ApiResponse::<()>::success_empty()))
}

/// 购物车结算
///
/// POST /api/v1/cart/checkout
///
/// 同一顾客同时只允许一个结算请求；Redis 不可用时仅依赖幂等键
pub async fn checkout(
    State(state): State<AppState>,
    CurrentCustomer(customer_id): CurrentCustomer,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderDetail>>)> {
    req.validate()?;

    let lock_key = CacheKey::checkout_lock(customer_id);
    let locked = match state.cache.set_nx(&lock_key, &customer_id, CHECKOUT_LOCK_TTL).await {
        Ok(true) => true,
        Ok(false) => return Err(ApiError::DuplicateSubmission),
        Err(e) => {
            warn!(error = %e, customer_id, "Checkout lock unavailable");
            false
        }
    };

    let result = place_cart_order(&state, customer_id, req).await;

    if locked {
        if let Err(e) = state.cache.delete(&lock_key).await {
            warn!(error = %e, customer_id, "Checkout lock release failed");
        }
    }

    let detail = result?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(detail))))
}

async fn place_cart_order(
    state: &AppState,
    customer_id: i64,
    req: CheckoutRequest,
) -> Result<OrderDetail> {
    let cart = load_cart(state, customer_id).await?;
    let items = checkout_lines(&cart, req.pharmacy_id)?;
    let product_ids: Vec<i64> = items.iter().map(|l| l.product_id).collect();

    let detail = state
        .orders
        .create_order(
            customer_id,
            CreateOrderRequest {
                items,
                address_id: req.address_id,
                use_discount: req.use_discount,
                note: req.note,
                idempotency_key: req.idempotency_key,
            },
        )
        .await?;

    // 订单已提交，清理购物车失败不影响下单结果
    if let Err(e) = sqlx::query(
        "DELETE FROM cart_items WHERE customer_id = $1 AND product_id = ANY($2)",
    )
    .bind(customer_id)
    .bind(&product_ids)
    .execute(&state.pool)
    .await
    {
        warn!(error = %e, customer_id, order_no = %detail.order.order_no, "Cart cleanup failed");
    }

    info!(
        customer_id,
        order_no = %detail.order.order_no,
        lines = detail.items.len(),
        "Cart checked out"
    );

    Ok(detail)
}
