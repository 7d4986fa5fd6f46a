//! 订单服务
//!
//! 编排下单与状态流转：
//!
//! ## 下单流程
//!
//! 1. 幂等检查 -> 2. 收货地址 -> 3. 规范化订单行 -> 4. 商品校验与计价
//!    -> 5. 事务写入（预占库存、扣减折扣、写订单）
//!
//! ## 状态流转
//!
//! 权限校验 -> 生成流转计划 -> 事务执行（乐观并发）

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, instrument, warn};
use vetshop_shared::config::ShopConfig;
use vetshop_shared::observability::metrics;

use crate::error::{CommerceError, Result};
use crate::loyalty::LoyaltyRules;
use crate::models::{Actor, OrderDetail, OrderStatus, Product, ShippingAddress};
use crate::order::{
    NewOrder, Quote, authorize, generate_order_no, normalize_items, plan_transition, price,
};
use crate::repository::{
    AddressRepositoryTrait, LoyaltyRepositoryTrait, OrderRepositoryTrait, ProductRepositoryTrait,
};
use crate::service::dto::{CreateOrderRequest, OrderPage};

/// 每页最大条数
const MAX_PAGE_SIZE: i64 = 100;

/// 订单服务
pub struct OrderService<OR, PR, AR, LR>
where
    OR: OrderRepositoryTrait,
    PR: ProductRepositoryTrait,
    AR: AddressRepositoryTrait,
    LR: LoyaltyRepositoryTrait,
{
    order_repo: Arc<OR>,
    product_repo: Arc<PR>,
    address_repo: Arc<AR>,
    loyalty_repo: Arc<LR>,
    rules: Arc<LoyaltyRules>,
    shop: ShopConfig,
}

impl<OR, PR, AR, LR> OrderService<OR, PR, AR, LR>
where
    OR: OrderRepositoryTrait,
    PR: ProductRepositoryTrait,
    AR: AddressRepositoryTrait,
    LR: LoyaltyRepositoryTrait,
{
    pub fn new(
        order_repo: Arc<OR>,
        product_repo: Arc<PR>,
        address_repo: Arc<AR>,
        loyalty_repo: Arc<LR>,
        rules: Arc<LoyaltyRules>,
        shop: ShopConfig,
    ) -> Self {
        Self {
            order_repo,
            product_repo,
            address_repo,
            loyalty_repo,
            rules,
            shop,
        }
    }

    pub fn rules(&self) -> &LoyaltyRules {
        &self.rules
    }

    /// 订单报价（不写入）
    #[instrument(skip_all, fields(customer_id = customer_id, lines = request.items.len()))]
    pub async fn quote(&self, customer_id: i64, request: &CreateOrderRequest) -> Result<Quote> {
        let lines = normalize_items(&request.items, &self.shop)?;

        let ids: Vec<i64> = lines.iter().map(|l| l.product_id).collect();
        let products: HashMap<i64, Product> = self
            .product_repo
            .get_products_by_ids(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let discount_balance = if request.use_discount {
            self.loyalty_repo
                .get_account(customer_id)
                .await?
                .map(|a| a.discount_balance_cents)
                .unwrap_or(0)
        } else {
            0
        };

        price(
            &lines,
            &products,
            discount_balance,
            request.use_discount,
            &self.rules,
            &self.shop,
        )
    }

    /// 创建订单
    ///
    /// 新订单状态为 Pending，库存已预占。带幂等键的重复请求直接返回已有订单。
    #[instrument(skip_all, fields(customer_id = customer_id))]
    pub async fn create_order(
        &self,
        customer_id: i64,
        request: CreateOrderRequest,
    ) -> Result<OrderDetail> {
        // 1. 幂等检查
        if let Some(key) = request.idempotency_key.as_deref() {
            if let Some(detail) = self.find_idempotent(customer_id, key).await? {
                return Ok(detail);
            }
        }

        // 2. 收货地址
        let shipping_address = self.resolve_address(customer_id, request.address_id).await?;

        // 3-4. 校验与计价
        let quote = self.quote(customer_id, &request).await?;

        // 5. 事务写入
        let new_order = NewOrder {
            order_no: generate_order_no(),
            customer_id,
            shipping_address,
            note: request.note,
            idempotency_key: request.idempotency_key,
            quote,
        };

        match self.order_repo.create_order(&new_order).await {
            Ok(detail) => {
                metrics::record_order_created("success");
                info!(
                    order_no = %detail.order.order_no,
                    pharmacy_id = detail.order.pharmacy_id,
                    total_cents = detail.order.total_cents,
                    points_preview = detail.order.points_preview,
                    "订单创建成功"
                );
                Ok(detail)
            }
            // 并发请求携带相同幂等键，另一请求已先提交
            Err(CommerceError::DuplicateIdempotencyKey(key)) => {
                match self.find_idempotent(customer_id, &key).await? {
                    Some(detail) => Ok(detail),
                    None => Err(CommerceError::DuplicateIdempotencyKey(key)),
                }
            }
            Err(e) => {
                if let CommerceError::InsufficientStock { product_id, .. } = &e {
                    metrics::record_stock_reservation_failure(*product_id);
                }
                metrics::record_order_created("failed");
                warn!(order_no = %new_order.order_no, error = %e, "订单创建失败");
                Err(e)
            }
        }
    }

    async fn find_idempotent(&self, customer_id: i64, key: &str) -> Result<Option<OrderDetail>> {
        let Some(order) = self
            .order_repo
            .find_by_idempotency_key(customer_id, key)
            .await?
        else {
            return Ok(None);
        };

        info!(order_no = %order.order_no, idempotency_key = %key, "幂等请求，返回已存在的订单");
        let items = self.order_repo.get_order_items(order.id).await?;
        Ok(Some(OrderDetail { order, items }))
    }

    async fn resolve_address(
        &self,
        customer_id: i64,
        address_id: Option<i64>,
    ) -> Result<ShippingAddress> {
        let address = match address_id {
            Some(id) => self
                .address_repo
                .get_address(customer_id, id)
                .await?
                .ok_or(CommerceError::AddressNotFound(id))?,
            None => self
                .address_repo
                .get_default_address(customer_id)
                .await?
                .ok_or_else(|| CommerceError::Validation("请先设置收货地址".to_string()))?,
        };

        Ok(ShippingAddress::from(&address))
    }

    /// 订单状态流转
    #[instrument(skip_all, fields(order_id = order_id, actor = ?actor, to = %to))]
    pub async fn transition(
        &self,
        order_id: i64,
        actor: Actor,
        to: OrderStatus,
        reason: Option<String>,
    ) -> Result<OrderDetail> {
        let order = self
            .order_repo
            .get_order(order_id)
            .await?
            .ok_or(CommerceError::OrderNotFound(order_id))?;

        authorize(&actor, &order, to)?;

        let items = self.order_repo.get_order_items(order.id).await?;
        let plan = plan_transition(&order, &items, to, &self.rules)?;

        let updated = self
            .order_repo
            .apply_transition(&plan, actor, reason)
            .await?;

        metrics::record_order_transition(plan.from.as_str(), plan.to.as_str());
        if let Some(award) = plan.award {
            metrics::record_points_awarded(award.tier.as_str(), award.points);
        }
        info!(
            order_no = %updated.order_no,
            from = %plan.from,
            to = %plan.to,
            points_awarded = updated.points_awarded,
            "订单状态已更新"
        );

        Ok(OrderDetail {
            order: updated,
            items,
        })
    }

    /// 顾客取消订单（仅限待确认状态）
    pub async fn cancel_by_customer(
        &self,
        order_id: i64,
        customer_id: i64,
        reason: Option<String>,
    ) -> Result<OrderDetail> {
        self.transition(
            order_id,
            Actor::customer(customer_id),
            OrderStatus::Cancelled,
            reason,
        )
        .await
    }

    /// 查询订单详情
    ///
    /// 非订单所属的顾客或药房返回不存在
    pub async fn get_order(&self, order_id: i64, actor: Actor) -> Result<OrderDetail> {
        let order = self
            .order_repo
            .get_order(order_id)
            .await?
            .filter(|o| actor.can_view(o))
            .ok_or(CommerceError::OrderNotFound(order_id))?;

        let items = self.order_repo.get_order_items(order.id).await?;
        Ok(OrderDetail { order, items })
    }

    pub async fn list_customer_orders(
        &self,
        customer_id: i64,
        status: Option<OrderStatus>,
        page: i64,
        page_size: i64,
    ) -> Result<OrderPage> {
        let (page, page_size) = normalize_page(page, page_size);
        let (items, total) = self
            .order_repo
            .list_by_customer(customer_id, status, page, page_size)
            .await?;

        Ok(OrderPage {
            items,
            total,
            page,
            page_size,
        })
    }

    pub async fn list_pharmacy_orders(
        &self,
        pharmacy_id: i64,
        status: Option<OrderStatus>,
        page: i64,
        page_size: i64,
    ) -> Result<OrderPage> {
        let (page, page_size) = normalize_page(page, page_size);
        let (items, total) = self
            .order_repo
            .list_by_pharmacy(pharmacy_id, status, page, page_size)
            .await?;

        Ok(OrderPage {
            items,
            total,
            page,
            page_size,
        })
    }
}

fn normalize_page(page: i64, page_size: i64) -> (i64, i64) {
    (page.max(1), page_size.clamp(1, MAX_PAGE_SIZE))
}
