//! 服务层数据传输对象

use serde::{Deserialize, Serialize};

use crate::loyalty::{RewardProgress, TierRule};
use crate::models::{LoyaltyAccount, LoyaltyTier, Order};
use crate::order::LineRequest;

/// 下单 / 报价请求
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub items: Vec<LineRequest>,
    /// 不传时使用默认地址
    #[serde(default)]
    pub address_id: Option<i64>,
    /// 是否使用折扣余额抵扣
    #[serde(default)]
    pub use_discount: bool,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

/// 分页订单列表
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPage {
    pub items: Vec<Order>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

/// 积分账户概览
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltySummary {
    pub customer_id: i64,
    pub points_balance: i64,
    pub discount_balance_cents: i64,
    pub lifetime_points: i64,
    pub lifetime_spend_cents: i64,
    /// 累计消费对应的档位（仅展示用，订单积分按单笔金额计算）
    pub lifetime_tier: LoyaltyTier,
    pub reward_value_cents: i64,
    pub progress: RewardProgress,
}

impl LoyaltySummary {
    pub fn new(
        account: &LoyaltyAccount,
        lifetime_tier: LoyaltyTier,
        reward_value_cents: i64,
        progress: RewardProgress,
    ) -> Self {
        Self {
            customer_id: account.customer_id,
            points_balance: account.points_balance,
            discount_balance_cents: account.discount_balance_cents,
            lifetime_points: account.lifetime_points,
            lifetime_spend_cents: account.lifetime_spend_cents,
            lifetime_tier,
            reward_value_cents,
            progress,
        }
    }
}

/// 积分规则展示
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierTable {
    pub tiers: Vec<TierRule>,
    pub points_unit_cents: i64,
    pub redemption_threshold_points: i64,
    pub reward_value_cents: i64,
}
