//! 订单仓储
//!
//! 下单与状态流转在单个事务内完成：商品行按 ID 升序加锁后变更库存，
//! 积分账户变动与账本记录同事务提交。

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use tracing::debug;

use super::loyalty_repo::LoyaltyRepository;
use super::product_repo::ProductRepository;
use super::traits::OrderRepositoryTrait;
use crate::error::{CommerceError, Result};
use crate::models::{
    Actor, LedgerChangeType, LoyaltyChange, Order, OrderDetail, OrderItem, OrderStatus,
};
use crate::order::{NewOrder, PricedLine, StockLevel, TransitionPlan, apply_movements, reserve_lines};

/// 订单幂等键唯一约束名
const IDEMPOTENCY_CONSTRAINT: &str = "uq_orders_customer_idempotency";

/// 同一顾客的幂等键并发写入时，落败方转为幂等冲突
fn map_order_insert_error(err: sqlx::Error, idempotency_key: Option<&str>) -> CommerceError {
    match (&err, idempotency_key) {
        (sqlx::Error::Database(db), Some(key))
            if db.is_unique_violation() && db.constraint() == Some(IDEMPOTENCY_CONSTRAINT) =>
        {
            CommerceError::DuplicateIdempotencyKey(key.to_string())
        }
        _ => CommerceError::Database(err),
    }
}

pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_item_in_tx(
        tx: &mut PgConnection,
        order_id: i64,
        line: &PricedLine,
    ) -> Result<OrderItem> {
        let item = sqlx::query_as::<_, OrderItem>(
            r#"
            INSERT INTO order_items (order_id, product_id, product_name, unit_price_cents,
                                     quantity, line_total_cents)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, order_id, product_id, product_name, unit_price_cents,
                      quantity, line_total_cents
            "#,
        )
        .bind(order_id)
        .bind(line.product_id)
        .bind(&line.product_name)
        .bind(line.unit_price_cents)
        .bind(line.quantity)
        .bind(line.line_total_cents)
        .fetch_one(tx)
        .await?;

        Ok(item)
    }

    async fn insert_status_log_in_tx(
        tx: &mut PgConnection,
        plan: &TransitionPlan,
        actor: Actor,
        reason: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO order_status_logs (order_id, from_status, to_status, actor_role,
                                           actor_id, reason)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(plan.order_id)
        .bind(plan.from)
        .bind(plan.to)
        .bind(actor.role)
        .bind(actor.id)
        .bind(reason)
        .execute(tx)
        .await?;

        Ok(())
    }

    /// 查询订单列表（分页，可按状态过滤）
    ///
    /// `owner_column` 只接受内部常量
    async fn list_by_owner(
        &self,
        owner_column: &'static str,
        owner_id: i64,
        status: Option<OrderStatus>,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<Order>, i64)> {
        let offset = (page.max(1) - 1) * page_size;

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM orders WHERE {} = $1 AND ($2::varchar IS NULL OR status = $2)",
            owner_column
        ))
        .bind(owner_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        let orders = sqlx::query_as::<_, Order>(&format!(
            r#"
            SELECT id, order_no, customer_id, pharmacy_id, shipping_address, status,
                   subtotal_cents, discount_cents, shipping_cents, total_cents, eligible_cents,
                   loyalty_tier, points_preview, points_awarded, discount_accrued_cents,
                   note, cancel_reason, idempotency_key, created_at, updated_at,
                   delivered_at, cancelled_at
            FROM orders
            WHERE {} = $1 AND ($2::varchar IS NULL OR status = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#,
            owner_column
        ))
        .bind(owner_id)
        .bind(status)
        .bind(page_size)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((orders, total))
    }
}

#[async_trait]
impl OrderRepositoryTrait for OrderRepository {
    async fn get_order(&self, id: i64) -> Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, order_no, customer_id, pharmacy_id, shipping_address, status,
                   subtotal_cents, discount_cents, shipping_cents, total_cents, eligible_cents,
                   loyalty_tier, points_preview, points_awarded, discount_accrued_cents,
                   note, cancel_reason, idempotency_key, created_at, updated_at,
                   delivered_at, cancelled_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    async fn get_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT id, order_id, product_id, product_name, unit_price_cents,
                   quantity, line_total_cents
            FROM order_items
            WHERE order_id = $1
            ORDER BY id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    async fn find_by_idempotency_key(
        &self,
        customer_id: i64,
        key: &str,
    ) -> Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, order_no, customer_id, pharmacy_id, shipping_address, status,
                   subtotal_cents, discount_cents, shipping_cents, total_cents, eligible_cents,
                   loyalty_tier, points_preview, points_awarded, discount_accrued_cents,
                   note, cancel_reason, idempotency_key, created_at, updated_at,
                   delivered_at, cancelled_at
            FROM orders
            WHERE customer_id = $1 AND idempotency_key = $2
            "#,
        )
        .bind(customer_id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    async fn create_order(&self, new_order: &NewOrder) -> Result<OrderDetail> {
        let quote = &new_order.quote;
        let mut tx = self.pool.begin().await?;

        // 1. 锁定商品并预占库存
        let ids: Vec<i64> = quote.lines.iter().map(|l| l.product_id).collect();
        let products: HashMap<i64, _> = ProductRepository::lock_products_in_tx(&mut tx, &ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let levels = reserve_lines(&products, &quote.lines)?;
        ProductRepository::save_stock_levels_in_tx(&mut tx, &levels).await?;

        // 2. 扣减折扣余额
        if quote.discount_cents > 0 {
            LoyaltyRepository::apply_change_in_tx(
                &mut tx,
                &LoyaltyChange {
                    customer_id: new_order.customer_id,
                    change_type: LedgerChangeType::DiscountUsed,
                    points_delta: 0,
                    discount_delta_cents: -quote.discount_cents,
                    spend_cents: 0,
                    ref_id: Some(new_order.order_no.clone()),
                    remark: Some("下单抵扣".to_string()),
                },
            )
            .await?;
        }

        // 3. 写入订单与订单行
        let order = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (order_no, customer_id, pharmacy_id, shipping_address, status,
                                subtotal_cents, discount_cents, shipping_cents, total_cents,
                                eligible_cents, loyalty_tier, points_preview, note,
                                idempotency_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING id, order_no, customer_id, pharmacy_id, shipping_address, status,
                      subtotal_cents, discount_cents, shipping_cents, total_cents, eligible_cents,
                      loyalty_tier, points_preview, points_awarded, discount_accrued_cents,
                      note, cancel_reason, idempotency_key, created_at, updated_at,
                      delivered_at, cancelled_at
            "#,
        )
        .bind(&new_order.order_no)
        .bind(new_order.customer_id)
        .bind(quote.pharmacy_id)
        .bind(Json(&new_order.shipping_address))
        .bind(OrderStatus::Pending)
        .bind(quote.subtotal_cents)
        .bind(quote.discount_cents)
        .bind(quote.shipping_cents)
        .bind(quote.total_cents)
        .bind(quote.eligible_cents)
        .bind(quote.loyalty.tier)
        .bind(quote.loyalty.points)
        .bind(&new_order.note)
        .bind(&new_order.idempotency_key)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_order_insert_error(e, new_order.idempotency_key.as_deref()))?;

        let mut items = Vec::with_capacity(quote.lines.len());
        for line in &quote.lines {
            items.push(Self::insert_item_in_tx(&mut tx, order.id, line).await?);
        }

        tx.commit().await?;
        debug!(order_no = %order.order_no, lines = items.len(), "订单已写入");

        Ok(OrderDetail { order, items })
    }

    async fn apply_transition(
        &self,
        plan: &TransitionPlan,
        actor: Actor,
        reason: Option<String>,
    ) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        let points_awarded = plan.award.map(|a| a.points);
        let discount_accrued = plan.award.map(|a| a.discount_cents);

        // 1. 乐观更新状态，状态已被其他请求改变时不生效
        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders
            SET status = $3,
                updated_at = NOW(),
                delivered_at = CASE WHEN $3 = 'DELIVERED' THEN NOW() ELSE delivered_at END,
                cancelled_at = CASE WHEN $3 = 'CANCELLED' THEN NOW() ELSE cancelled_at END,
                cancel_reason = CASE WHEN $3 = 'CANCELLED' THEN $4 ELSE cancel_reason END,
                points_awarded = COALESCE($5, points_awarded),
                discount_accrued_cents = COALESCE($6, discount_accrued_cents)
            WHERE id = $1 AND status = $2
            RETURNING id, order_no, customer_id, pharmacy_id, shipping_address, status,
                      subtotal_cents, discount_cents, shipping_cents, total_cents, eligible_cents,
                      loyalty_tier, points_preview, points_awarded, discount_accrued_cents,
                      note, cancel_reason, idempotency_key, created_at, updated_at,
                      delivered_at, cancelled_at
            "#,
        )
        .bind(plan.order_id)
        .bind(plan.from)
        .bind(plan.to)
        .bind(&reason)
        .bind(points_awarded)
        .bind(discount_accrued)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(CommerceError::ConcurrencyConflict)?;

        // 2. 库存变动
        if !plan.movements.is_empty() {
            let ids: Vec<i64> = plan.movements.iter().map(|m| m.product_id).collect();
            let mut levels: HashMap<i64, StockLevel> =
                ProductRepository::lock_products_in_tx(&mut tx, &ids)
                    .await?
                    .iter()
                    .map(|p| (p.id, StockLevel::from(p)))
                    .collect();
            apply_movements(&mut levels, &plan.movements)?;

            let mut changed: Vec<StockLevel> = levels.into_values().collect();
            changed.sort_by_key(|l| l.product_id);
            ProductRepository::save_stock_levels_in_tx(&mut tx, &changed).await?;
        }

        // 3. 积分入账或折扣退回
        if let Some(change) = plan.loyalty_change.as_ref().filter(|c| !c.is_noop()) {
            LoyaltyRepository::apply_change_in_tx(&mut tx, change).await?;
        }

        // 4. 状态日志
        Self::insert_status_log_in_tx(&mut tx, plan, actor, reason.as_deref()).await?;

        tx.commit().await?;
        Ok(order)
    }

    async fn list_by_customer(
        &self,
        customer_id: i64,
        status: Option<OrderStatus>,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<Order>, i64)> {
        self.list_by_owner("customer_id", customer_id, status, page, page_size)
            .await
    }

    async fn list_by_pharmacy(
        &self,
        pharmacy_id: i64,
        status: Option<OrderStatus>,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<Order>, i64)> {
        self.list_by_owner("pharmacy_id", pharmacy_id, status, page, page_size)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};

    /// 指定约束名的唯一约束冲突
    #[derive(Debug)]
    struct UniqueViolation(&'static str);

    impl std::fmt::Display for UniqueViolation {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "duplicate key value violates unique constraint \"{}\"", self.0)
        }
    }

    impl std::error::Error for UniqueViolation {}

    impl DatabaseError for UniqueViolation {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn constraint(&self) -> Option<&str> {
            Some(self.0)
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
    }

    fn unique_violation(constraint: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(UniqueViolation(constraint)))
    }

    #[test]
    fn test_idempotency_violation_maps_to_duplicate_key() {
        let err = map_order_insert_error(unique_violation(IDEMPOTENCY_CONSTRAINT), Some("req-1"));
        assert!(matches!(err, CommerceError::DuplicateIdempotencyKey(ref k) if k == "req-1"));
    }

    #[test]
    fn test_other_insert_errors_stay_database_errors() {
        // 订单号冲突等其他唯一约束
        let err = map_order_insert_error(unique_violation("orders_order_no_key"), Some("req-1"));
        assert!(matches!(err, CommerceError::Database(_)));

        // 无幂等键时不转换
        let err = map_order_insert_error(unique_violation(IDEMPOTENCY_CONSTRAINT), None);
        assert!(matches!(err, CommerceError::Database(_)));

        let err = map_order_insert_error(sqlx::Error::PoolTimedOut, Some("req-1"));
        assert!(matches!(err, CommerceError::Database(_)));
    }
}
