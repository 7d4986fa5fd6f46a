//! 订单模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use super::enums::{ActorRole, LoyaltyTier, OrderStatus};

/// 收货地址
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: i64,
    pub customer_id: i64,
    pub label: Option<String>,
    pub recipient: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 下单时的地址快照
///
/// 订单保存快照而非地址 ID，后续修改或删除地址不影响历史订单
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub recipient: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: Option<String>,
}

impl From<&Address> for ShippingAddress {
    fn from(address: &Address) -> Self {
        Self {
            recipient: address.recipient.clone(),
            phone: address.phone.clone(),
            line1: address.line1.clone(),
            line2: address.line2.clone(),
            city: address.city.clone(),
            postal_code: address.postal_code.clone(),
        }
    }
}

/// 订单
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub order_no: String,
    pub customer_id: i64,
    pub pharmacy_id: i64,
    pub shipping_address: Json<ShippingAddress>,
    pub status: OrderStatus,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub shipping_cents: i64,
    pub total_cents: i64,
    /// 可计积分金额 = 小计 - 折扣抵扣（运费不计积分）
    pub eligible_cents: i64,
    pub loyalty_tier: LoyaltyTier,
    /// 下单时预估积分，送达时按规则重新计算后入账
    pub points_preview: i64,
    pub points_awarded: i64,
    pub discount_accrued_cents: i64,
    pub note: Option<String>,
    pub cancel_reason: Option<String>,
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

/// 订单行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub unit_price_cents: i64,
    pub quantity: i32,
    pub line_total_cents: i64,
}

/// 订单详情（订单 + 订单行）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// 操作者
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub role: ActorRole,
    pub id: i64,
}

impl Actor {
    pub fn customer(id: i64) -> Self {
        Self {
            role: ActorRole::Customer,
            id,
        }
    }

    pub fn pharmacy(id: i64) -> Self {
        Self {
            role: ActorRole::Pharmacy,
            id,
        }
    }

    /// 是否有权查看订单
    pub fn can_view(&self, order: &Order) -> bool {
        match self.role {
            ActorRole::Customer => order.customer_id == self.id,
            ActorRole::Pharmacy => order.pharmacy_id == self.id,
        }
    }
}
