//! 积分仓储
//!
//! 积分账户与账本流水。账户余额的每次变动都伴随一条账本记录。

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};

use super::traits::LoyaltyRepositoryTrait;
use crate::error::Result;
use crate::models::{LoyaltyAccount, LoyaltyChange, LoyaltyLedgerEntry};

pub struct LoyaltyRepository {
    pool: PgPool,
}

impl LoyaltyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 在事务中应用账户变动
    ///
    /// 账户不存在时先创建，随后加行锁读取、校验余额、写回并记账
    pub async fn apply_change_in_tx(
        tx: &mut PgConnection,
        change: &LoyaltyChange,
    ) -> Result<LoyaltyAccount> {
        sqlx::query(
            r#"
            INSERT INTO loyalty_accounts (customer_id)
            VALUES ($1)
            ON CONFLICT (customer_id) DO NOTHING
            "#,
        )
        .bind(change.customer_id)
        .execute(&mut *tx)
        .await?;

        let account = sqlx::query_as::<_, LoyaltyAccount>(
            r#"
            SELECT customer_id, points_balance, discount_balance_cents, lifetime_points,
                   lifetime_spend_cents, updated_at
            FROM loyalty_accounts
            WHERE customer_id = $1
            FOR UPDATE
            "#,
        )
        .bind(change.customer_id)
        .fetch_one(&mut *tx)
        .await?;

        let updated = account.try_apply(change)?;

        sqlx::query(
            r#"
            UPDATE loyalty_accounts
            SET points_balance = $2, discount_balance_cents = $3, lifetime_points = $4,
                lifetime_spend_cents = $5, updated_at = NOW()
            WHERE customer_id = $1
            "#,
        )
        .bind(updated.customer_id)
        .bind(updated.points_balance)
        .bind(updated.discount_balance_cents)
        .bind(updated.lifetime_points)
        .bind(updated.lifetime_spend_cents)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO loyalty_ledger (customer_id, change_type, points_delta,
                                        discount_delta_cents, points_balance_after,
                                        discount_balance_after, ref_id, remark)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(change.customer_id)
        .bind(change.change_type)
        .bind(change.points_delta)
        .bind(change.discount_delta_cents)
        .bind(updated.points_balance)
        .bind(updated.discount_balance_cents)
        .bind(&change.ref_id)
        .bind(&change.remark)
        .execute(&mut *tx)
        .await?;

        Ok(updated)
    }
}

#[async_trait]
impl LoyaltyRepositoryTrait for LoyaltyRepository {
    async fn get_account(&self, customer_id: i64) -> Result<Option<LoyaltyAccount>> {
        let account = sqlx::query_as::<_, LoyaltyAccount>(
            r#"
            SELECT customer_id, points_balance, discount_balance_cents, lifetime_points,
                   lifetime_spend_cents, updated_at
            FROM loyalty_accounts
            WHERE customer_id = $1
            "#,
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn apply_change(&self, change: &LoyaltyChange) -> Result<LoyaltyAccount> {
        let mut tx = self.pool.begin().await?;
        let account = Self::apply_change_in_tx(&mut tx, change).await?;
        tx.commit().await?;
        Ok(account)
    }

    async fn list_ledger(&self, customer_id: i64, limit: i64) -> Result<Vec<LoyaltyLedgerEntry>> {
        let entries = sqlx::query_as::<_, LoyaltyLedgerEntry>(
            r#"
            SELECT id, customer_id, change_type, points_delta, discount_delta_cents,
                   points_balance_after, discount_balance_after, ref_id, remark, created_at
            FROM loyalty_ledger
            WHERE customer_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(customer_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
