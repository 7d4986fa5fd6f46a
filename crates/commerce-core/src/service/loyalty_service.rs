//! 积分服务
//!
//! 查询积分账户与账本，处理积分兑换

use std::sync::Arc;

use tracing::{info, instrument, warn};
use vetshop_shared::observability::metrics;

use crate::error::Result;
use crate::loyalty::LoyaltyRules;
use crate::models::{LedgerChangeType, LoyaltyAccount, LoyaltyChange, LoyaltyLedgerEntry};
use crate::repository::LoyaltyRepositoryTrait;
use crate::service::dto::{LoyaltySummary, TierTable};

/// 账本查询最大条数
const MAX_LEDGER_LIMIT: i64 = 200;

pub struct LoyaltyService<LR>
where
    LR: LoyaltyRepositoryTrait,
{
    loyalty_repo: Arc<LR>,
    rules: Arc<LoyaltyRules>,
}

impl<LR> LoyaltyService<LR>
where
    LR: LoyaltyRepositoryTrait,
{
    pub fn new(loyalty_repo: Arc<LR>, rules: Arc<LoyaltyRules>) -> Self {
        Self {
            loyalty_repo,
            rules,
        }
    }

    fn summarize(&self, account: &LoyaltyAccount) -> LoyaltySummary {
        LoyaltySummary::new(
            account,
            self.rules.tier_for(account.lifetime_spend_cents).tier,
            self.rules.reward_value_cents(),
            self.rules.progress(account.points_balance),
        )
    }

    /// 积分账户概览，账户不存在时返回全零
    #[instrument(skip(self))]
    pub async fn summary(&self, customer_id: i64) -> Result<LoyaltySummary> {
        let account = self
            .loyalty_repo
            .get_account(customer_id)
            .await?
            .unwrap_or_else(|| LoyaltyAccount::empty(customer_id));

        Ok(self.summarize(&account))
    }

    /// 兑换奖励
    ///
    /// 每次奖励消耗固定积分，折算为折扣余额
    #[instrument(skip(self))]
    pub async fn redeem(&self, customer_id: i64, rewards: i64) -> Result<LoyaltySummary> {
        let balance = self
            .loyalty_repo
            .get_account(customer_id)
            .await?
            .map(|a| a.points_balance)
            .unwrap_or(0);

        // 预检查，最终以事务内的余额校验为准
        let plan = match self.rules.plan_redemption(balance, rewards) {
            Ok(plan) => plan,
            Err(e) => {
                metrics::record_redemption("rejected");
                return Err(e);
            }
        };

        let change = LoyaltyChange {
            customer_id,
            change_type: LedgerChangeType::Redemption,
            points_delta: -plan.points_debit,
            discount_delta_cents: plan.discount_credit_cents,
            spend_cents: 0,
            ref_id: None,
            remark: Some(format!("兑换 {} 次奖励", plan.rewards)),
        };

        let account = match self.loyalty_repo.apply_change(&change).await {
            Ok(account) => account,
            Err(e) => {
                metrics::record_redemption("failed");
                warn!(error = %e, "积分兑换失败");
                return Err(e);
            }
        };

        metrics::record_redemption("success");
        info!(
            rewards = plan.rewards,
            points_debit = plan.points_debit,
            discount_credit_cents = plan.discount_credit_cents,
            points_balance = account.points_balance,
            "积分兑换成功"
        );

        Ok(self.summarize(&account))
    }

    pub async fn ledger(&self, customer_id: i64, limit: i64) -> Result<Vec<LoyaltyLedgerEntry>> {
        self.loyalty_repo
            .list_ledger(customer_id, limit.clamp(1, MAX_LEDGER_LIMIT))
            .await
    }

    pub fn tiers(&self) -> TierTable {
        TierTable {
            tiers: self.rules.tiers().to_vec(),
            points_unit_cents: self.rules.points_unit_cents(),
            redemption_threshold_points: self.rules.redemption_threshold_points(),
            reward_value_cents: self.rules.reward_value_cents(),
        }
    }
}
