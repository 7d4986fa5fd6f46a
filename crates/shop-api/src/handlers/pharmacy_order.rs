//! 药房订单处理器

use axum::{
    Json,
    extract::{Path, Query, State},
};
use commerce::models::{Actor, Order, OrderDetail};
use validator::Validate;

use crate::dto::{
    ApiResponse, OrderQueryFilter, PageResponse, PaginationParams, UpdateOrderStatusRequest,
};
use crate::error::Result;
use crate::middleware::CurrentPharmacy;
use crate::state::AppState;

/// GET /api/v1/pharmacy/orders?status=&page=&pageSize=
pub async fn list_orders(
    State(state): State<AppState>,
    CurrentPharmacy(pharmacy_id): CurrentPharmacy,
    Query(filter): Query<OrderQueryFilter>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PageResponse<Order>>>> {
    let page = state
        .orders
        .list_pharmacy_orders(pharmacy_id, filter.status, pagination.page, pagination.page_size)
        .await?;

    Ok(Json(ApiResponse::success(PageResponse::new(
        page.items,
        page.total,
        page.page,
        page.page_size,
    ))))
}

/// 推进订单状态
///
/// POST /api/v1/pharmacy/orders/{id}/status
///
/// DELIVERED 扣减库存并发放积分，CANCELLED 释放预占
pub async fn update_status(
    State(state): State<AppState>,
    CurrentPharmacy(pharmacy_id): CurrentPharmacy,
    Path(id): Path<i64>,
    Json(req): Json<UpdateOrderStatusRequest>,
) -> Result<Json<ApiResponse<OrderDetail>>> {
    req.validate()?;

    let detail = state
        .orders
        .transition(id, Actor::pharmacy(pharmacy_id), req.status, req.reason)
        .await?;
    Ok(Json(ApiResponse::success(detail)))
}
