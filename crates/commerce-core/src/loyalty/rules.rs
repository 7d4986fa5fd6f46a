//! 积分等级规则
//!
//! 按订单可计积分金额所在档位计算积分和折扣累积，
//! 并负责积分兑换门槛的判定。

use serde::{Deserialize, Serialize};
use vetshop_shared::config::LoyaltyConfig;

use crate::error::{CommerceError, Result};
use crate::models::LoyaltyTier;

/// 单个等级档位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierRule {
    pub tier: LoyaltyTier,
    /// 档位下限（含）
    pub min_spend_cents: i64,
    /// 每个积分单位获得的积分
    pub points_per_unit: i64,
    /// 折扣累积百分比（0-100）
    pub discount_percent: i64,
}

/// 一笔金额的积分评估结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyAward {
    pub tier: LoyaltyTier,
    pub eligible_cents: i64,
    pub points: i64,
    pub discount_percent: i64,
    /// 累积到折扣余额的金额（分）
    pub discount_cents: i64,
}

/// 兑换计划
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionPlan {
    pub rewards: i64,
    pub points_debit: i64,
    pub discount_credit_cents: i64,
}

/// 距下一次兑换的进度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardProgress {
    pub redeemable_rewards: i64,
    /// 当前周期内已攒积分
    pub points_into_current: i64,
    pub points_to_next_reward: i64,
    pub threshold_points: i64,
}

/// 积分规则表
///
/// 所有构建路径（含反序列化）都经过 [`LoyaltyRules::new`] 校验，保证档位非空且有序
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawLoyaltyRules")]
pub struct LoyaltyRules {
    /// 按下限升序排列，首档下限为 0
    tiers: Vec<TierRule>,
    points_unit_cents: i64,
    redemption_threshold_points: i64,
    reward_value_cents: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLoyaltyRules {
    tiers: Vec<TierRule>,
    points_unit_cents: i64,
    redemption_threshold_points: i64,
    reward_value_cents: i64,
}

impl TryFrom<RawLoyaltyRules> for LoyaltyRules {
    type Error = CommerceError;

    fn try_from(raw: RawLoyaltyRules) -> Result<Self> {
        Self::new(
            raw.tiers,
            raw.points_unit_cents,
            raw.redemption_threshold_points,
            raw.reward_value_cents,
        )
    }
}

impl Default for LoyaltyRules {
    fn default() -> Self {
        Self {
            tiers: vec![
                TierRule {
                    tier: LoyaltyTier::Bronze,
                    min_spend_cents: 0,
                    points_per_unit: 1,
                    discount_percent: 0,
                },
                TierRule {
                    tier: LoyaltyTier::Silver,
                    min_spend_cents: 10_000,
                    points_per_unit: 2,
                    discount_percent: 2,
                },
                TierRule {
                    tier: LoyaltyTier::Gold,
                    min_spend_cents: 30_000,
                    points_per_unit: 3,
                    discount_percent: 5,
                },
                TierRule {
                    tier: LoyaltyTier::Platinum,
                    min_spend_cents: 60_000,
                    points_per_unit: 5,
                    discount_percent: 8,
                },
            ],
            points_unit_cents: 1_000,
            redemption_threshold_points: 500,
            reward_value_cents: 2_500,
        }
    }
}

impl LoyaltyRules {
    /// 从配置构建规则表并校验
    pub fn from_config(config: &LoyaltyConfig) -> Result<Self> {
        let tiers = config
            .tiers
            .iter()
            .map(|t| {
                let tier = t
                    .tier
                    .parse::<LoyaltyTier>()
                    .map_err(CommerceError::InvalidLoyaltyConfig)?;
                Ok(TierRule {
                    tier,
                    min_spend_cents: t.min_spend_cents,
                    points_per_unit: t.points_per_unit,
                    discount_percent: t.discount_percent,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(
            tiers,
            config.points_unit_cents,
            config.redemption_threshold_points,
            config.reward_value_cents,
        )
    }

    pub fn new(
        tiers: Vec<TierRule>,
        points_unit_cents: i64,
        redemption_threshold_points: i64,
        reward_value_cents: i64,
    ) -> Result<Self> {
        let invalid = |msg: String| Err(CommerceError::InvalidLoyaltyConfig(msg));

        let Some(first) = tiers.first() else {
            return invalid("至少需要一个等级档位".to_string());
        };
        if first.min_spend_cents != 0 {
            return invalid(format!("首个档位下限必须为 0，实际为 {}", first.min_spend_cents));
        }
        for pair in tiers.windows(2) {
            if pair[1].min_spend_cents <= pair[0].min_spend_cents {
                return invalid(format!(
                    "档位下限必须严格递增: {} ({}) -> {} ({})",
                    pair[0].tier.as_str(),
                    pair[0].min_spend_cents,
                    pair[1].tier.as_str(),
                    pair[1].min_spend_cents
                ));
            }
            if pair[1].tier <= pair[0].tier {
                return invalid(format!("等级顺序错误: {}", pair[1].tier.as_str()));
            }
        }
        for rule in &tiers {
            if !(0..=100).contains(&rule.discount_percent) {
                return invalid(format!(
                    "{} 折扣百分比超出范围: {}",
                    rule.tier.as_str(),
                    rule.discount_percent
                ));
            }
            if rule.points_per_unit < 0 {
                return invalid(format!("{} 积分倍率不能为负", rule.tier.as_str()));
            }
        }
        if points_unit_cents <= 0 {
            return invalid("积分单位金额必须大于 0".to_string());
        }
        if redemption_threshold_points <= 0 {
            return invalid("兑换门槛必须大于 0".to_string());
        }
        if reward_value_cents < 0 {
            return invalid("奖励金额不能为负".to_string());
        }

        Ok(Self {
            tiers,
            points_unit_cents,
            redemption_threshold_points,
            reward_value_cents,
        })
    }

    pub fn tiers(&self) -> &[TierRule] {
        &self.tiers
    }

    pub fn points_unit_cents(&self) -> i64 {
        self.points_unit_cents
    }

    pub fn redemption_threshold_points(&self) -> i64 {
        self.redemption_threshold_points
    }

    pub fn reward_value_cents(&self) -> i64 {
        self.reward_value_cents
    }

    /// 查找金额所在档位
    ///
    /// 取下限不超过金额的最高档位，边界金额归入更高档位，负数按 0 处理
    pub fn tier_for(&self, eligible_cents: i64) -> &TierRule {
        let amount = eligible_cents.max(0);
        let idx = self
            .tiers
            .partition_point(|t| t.min_spend_cents <= amount)
            .saturating_sub(1);
        &self.tiers[idx]
    }

    /// 评估一笔金额可获得的积分和折扣累积
    ///
    /// 积分溢出时取 `i64::MAX`；折扣按整百与余数拆开计算，结果不超过金额本身
    pub fn evaluate(&self, eligible_cents: i64) -> LoyaltyAward {
        let amount = eligible_cents.max(0);
        let rule = self.tier_for(amount);
        let points = (amount / self.points_unit_cents).saturating_mul(rule.points_per_unit);
        let discount_cents =
            (amount / 100) * rule.discount_percent + (amount % 100) * rule.discount_percent / 100;

        LoyaltyAward {
            tier: rule.tier,
            eligible_cents: amount,
            points,
            discount_percent: rule.discount_percent,
            discount_cents,
        }
    }

    /// 当前积分可兑换的奖励次数
    pub fn redeemable_rewards(&self, points_balance: i64) -> i64 {
        points_balance.max(0) / self.redemption_threshold_points
    }

    /// 生成兑换计划
    pub fn plan_redemption(&self, points_balance: i64, rewards: i64) -> Result<RedemptionPlan> {
        if rewards < 1 {
            return Err(CommerceError::Validation(
                "兑换次数必须至少为 1".to_string(),
            ));
        }

        let required = rewards
            .checked_mul(self.redemption_threshold_points)
            .ok_or_else(|| CommerceError::Validation("兑换次数过大".to_string()))?;
        if points_balance < required {
            return Err(CommerceError::InsufficientPoints {
                required,
                available: points_balance,
            });
        }

        let discount_credit_cents = rewards
            .checked_mul(self.reward_value_cents)
            .ok_or_else(|| CommerceError::Validation("兑换次数过大".to_string()))?;

        Ok(RedemptionPlan {
            rewards,
            points_debit: required,
            discount_credit_cents,
        })
    }

    /// 计算兑换进度
    pub fn progress(&self, points_balance: i64) -> RewardProgress {
        let balance = points_balance.max(0);
        let into_current = balance % self.redemption_threshold_points;

        RewardProgress {
            redeemable_rewards: self.redeemable_rewards(balance),
            points_into_current: into_current,
            points_to_next_reward: self.redemption_threshold_points - into_current,
            threshold_points: self.redemption_threshold_points,
        }
    }
}
