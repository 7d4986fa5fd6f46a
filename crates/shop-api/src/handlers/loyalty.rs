//! 积分处理器

use axum::{
    Json,
    extract::{Query, State},
};
use commerce::models::LoyaltyLedgerEntry;
use commerce::service::{LoyaltySummary, TierTable};
use validator::Validate;

use crate::dto::{ApiResponse, LedgerQuery, RedeemRequest};
use crate::error::Result;
use crate::middleware::CurrentCustomer;
use crate::state::AppState;

const DEFAULT_LEDGER_LIMIT: i64 = 50;

/// 等级档位与兑换规则（公开）
///
/// GET /api/v1/loyalty/tiers
pub async fn get_tiers(State(state): State<AppState>) -> Json<ApiResponse<TierTable>> {
    Json(ApiResponse::success(state.loyalty.tiers()))
}

/// GET /api/v1/loyalty
pub async fn get_summary(
    State(state): State<AppState>,
    CurrentCustomer(customer_id): CurrentCustomer,
) -> Result<Json<ApiResponse<LoyaltySummary>>> {
    let summary = state.loyalty.summary(customer_id).await?;
    Ok(Json(ApiResponse::success(summary)))
}

/// GET /api/v1/loyalty/ledger?limit=
pub async fn get_ledger(
    State(state): State<AppState>,
    CurrentCustomer(customer_id): CurrentCustomer,
    Query(query): Query<LedgerQuery>,
) -> Result<Json<ApiResponse<Vec<LoyaltyLedgerEntry>>>> {
    let entries = state
        .loyalty
        .ledger(customer_id, query.limit.unwrap_or(DEFAULT_LEDGER_LIMIT))
        .await?;
    Ok(Json(ApiResponse::success(entries)))
}

/// 积分兑换折扣余额
///
/// POST /api/v1/loyalty/redeem
pub async fn redeem(
    State(state): State<AppState>,
    CurrentCustomer(customer_id): CurrentCustomer,
    Json(req): Json<RedeemRequest>,
) -> Result<Json<ApiResponse<LoyaltySummary>>> {
    req.validate()?;

    let summary = state.loyalty.redeem(customer_id, req.rewards).await?;
    Ok(Json(ApiResponse::success_with_message(summary, "兑换成功")))
}
