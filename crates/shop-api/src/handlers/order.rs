//! 顾客订单处理器

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use commerce::models::{Order, OrderDetail};
use commerce::order::Quote;
use commerce::service::CreateOrderRequest;
use validator::Validate;

use crate::dto::{
    ApiResponse, CancelOrderRequest, OrderQueryFilter, PageResponse, PaginationParams,
    PlaceOrderRequest,
};
use crate::error::Result;
use crate::middleware::{CurrentActor, CurrentCustomer};
use crate::state::AppState;

/// 订单报价（不预占库存）
///
/// POST /api/v1/orders/quote
pub async fn quote_order(
    State(state): State<AppState>,
    CurrentCustomer(customer_id): CurrentCustomer,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<Json<ApiResponse<Quote>>> {
    req.validate()?;

    let quote = state
        .orders
        .quote(customer_id, &CreateOrderRequest::from(req))
        .await?;
    Ok(Json(ApiResponse::success(quote)))
}

/// 下单
///
/// POST /api/v1/orders
pub async fn create_order(
    State(state): State<AppState>,
    CurrentCustomer(customer_id): CurrentCustomer,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderDetail>>)> {
    req.validate()?;

    let detail = state
        .orders
        .create_order(customer_id, CreateOrderRequest::from(req))
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(detail))))
}

/// GET /api/v1/orders?status=&page=&pageSize=
pub async fn list_orders(
    State(state): State<AppState>,
    CurrentCustomer(customer_id): CurrentCustomer,
    Query(filter): Query<OrderQueryFilter>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PageResponse<Order>>>> {
    let page = state
        .orders
        .list_customer_orders(customer_id, filter.status, pagination.page, pagination.page_size)
        .await?;

    Ok(Json(ApiResponse::success(PageResponse::new(
        page.items,
        page.total,
        page.page,
        page.page_size,
    ))))
}

/// 订单详情（所属顾客或所属药房）
///
/// GET /api/v1/orders/{id}
pub async fn get_order(
    State(state): State<AppState>,
    current: CurrentActor,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<OrderDetail>>> {
    let detail = state.orders.get_order(id, current.actor).await?;
    Ok(Json(ApiResponse::success(detail)))
}

/// 顾客取消订单（仅待确认状态），请求体可为 `{}`
///
/// POST /api/v1/orders/{id}/cancel
pub async fn cancel_order(
    State(state): State<AppState>,
    CurrentCustomer(customer_id): CurrentCustomer,
    Path(id): Path<i64>,
    Json(req): Json<CancelOrderRequest>,
) -> Result<Json<ApiResponse<OrderDetail>>> {
    req.validate()?;

    let detail = state
        .orders
        .cancel_by_customer(id, customer_id, req.reason)
        .await?;
    Ok(Json(ApiResponse::success_with_message(detail, "订单已取消")))
}
