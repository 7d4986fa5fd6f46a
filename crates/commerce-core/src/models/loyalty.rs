//! 积分账户与账本模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::LedgerChangeType;
use crate::error::{CommerceError, Result};

/// 积分账户
///
/// 顾客首次产生积分变动时创建，不存在时视为全零账户
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyAccount {
    pub customer_id: i64,
    pub points_balance: i64,
    /// 可在下单时抵扣的折扣余额（分）
    pub discount_balance_cents: i64,
    pub lifetime_points: i64,
    pub lifetime_spend_cents: i64,
    pub updated_at: DateTime<Utc>,
}

impl LoyaltyAccount {
    /// 空账户
    pub fn empty(customer_id: i64) -> Self {
        Self {
            customer_id,
            points_balance: 0,
            discount_balance_cents: 0,
            lifetime_points: 0,
            lifetime_spend_cents: 0,
            updated_at: Utc::now(),
        }
    }

    /// 应用一次变动，返回变动后的账户
    ///
    /// 任一余额变为负数时返回 None，调用方据此判定余额不足
    pub fn apply(&self, change: &LoyaltyChange) -> Option<Self> {
        let points_balance = self.points_balance + change.points_delta;
        let discount_balance_cents = self.discount_balance_cents + change.discount_delta_cents;
        if points_balance < 0 || discount_balance_cents < 0 {
            return None;
        }

        let earned = if change.change_type == LedgerChangeType::OrderReward {
            change.points_delta.max(0)
        } else {
            0
        };

        Some(Self {
            customer_id: self.customer_id,
            points_balance,
            discount_balance_cents,
            lifetime_points: self.lifetime_points + earned,
            lifetime_spend_cents: self.lifetime_spend_cents + change.spend_cents,
            updated_at: Utc::now(),
        })
    }

    /// 应用变动，余额不足时返回对应的业务错误
    pub fn try_apply(&self, change: &LoyaltyChange) -> Result<Self> {
        if let Some(updated) = self.apply(change) {
            return Ok(updated);
        }

        if self.points_balance + change.points_delta < 0 {
            Err(CommerceError::InsufficientPoints {
                required: -change.points_delta,
                available: self.points_balance,
            })
        } else {
            Err(CommerceError::Validation(format!(
                "折扣余额不足: 需要 {}, 可用 {}",
                -change.discount_delta_cents, self.discount_balance_cents
            )))
        }
    }
}

/// 一次积分账户变动（尚未入账）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyChange {
    pub customer_id: i64,
    pub change_type: LedgerChangeType,
    pub points_delta: i64,
    pub discount_delta_cents: i64,
    /// 计入累计消费的金额（仅订单奖励时非零）
    pub spend_cents: i64,
    pub ref_id: Option<String>,
    pub remark: Option<String>,
}

impl LoyaltyChange {
    /// 是否为空变动（无需入账）
    pub fn is_noop(&self) -> bool {
        self.points_delta == 0 && self.discount_delta_cents == 0 && self.spend_cents == 0
    }
}

/// 积分账本流水
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyLedgerEntry {
    pub id: i64,
    pub customer_id: i64,
    pub change_type: LedgerChangeType,
    pub points_delta: i64,
    pub discount_delta_cents: i64,
    pub points_balance_after: i64,
    pub discount_balance_after: i64,
    pub ref_id: Option<String>,
    pub remark: Option<String>,
    pub created_at: DateTime<Utc>,
}
