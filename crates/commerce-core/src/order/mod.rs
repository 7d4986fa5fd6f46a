//! 订单流程
//!
//! - `pricing`: 订单行规范化、商品校验与计价
//! - `stock`: 库存预占、扣减和释放
//! - `transition`: 状态机与流转副作用计划

pub mod pricing;
pub mod stock;
pub mod transition;

pub use pricing::{LineRequest, PricedLine, Quote, normalize_items, price, validate_products};
pub use stock::{
    MovementKind, StockLevel, StockMovement, apply_movements, reserve_lines,
};
pub use transition::{TransitionPlan, authorize, can_transition, plan_transition};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::models::ShippingAddress;

/// 待持久化的新订单
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub order_no: String,
    pub customer_id: i64,
    pub shipping_address: ShippingAddress,
    pub note: Option<String>,
    pub idempotency_key: Option<String>,
    pub quote: Quote,
}

/// 生成订单号
///
/// 格式：VO + 时间戳(14位) + 随机数(6位)
pub fn generate_order_no() -> String {
    let timestamp = Utc::now().format("%Y%m%d%H%M%S");
    let random = uuid::Uuid::new_v4().as_u128() % 1_000_000;
    format!("VO{}{:06}", timestamp, random)
}
