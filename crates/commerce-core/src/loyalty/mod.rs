//! 积分计划
//!
//! 等级档位、积分计算与兑换规则

mod rules;

pub use rules::{LoyaltyAward, LoyaltyRules, RedemptionPlan, RewardProgress, TierRule};
