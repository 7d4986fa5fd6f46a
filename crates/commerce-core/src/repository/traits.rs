//! 仓储 Trait 定义
//!
//! 服务层依赖抽象而非具体实现，支持 mock 测试和内存实现

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    Actor, Address, LoyaltyAccount, LoyaltyChange, LoyaltyLedgerEntry, Order, OrderDetail,
    OrderItem, OrderStatus, Product,
};
use crate::order::{NewOrder, TransitionPlan};

/// 商品仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductRepositoryTrait: Send + Sync {
    async fn get_product(&self, id: i64) -> Result<Option<Product>>;
    async fn get_products_by_ids(&self, ids: &[i64]) -> Result<Vec<Product>>;
}

/// 收货地址仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AddressRepositoryTrait: Send + Sync {
    async fn get_address(&self, customer_id: i64, address_id: i64) -> Result<Option<Address>>;
    async fn get_default_address(&self, customer_id: i64) -> Result<Option<Address>>;
}

/// 订单仓储接口
///
/// `create_order` 与 `apply_transition` 须在单个事务内完成全部写入
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepositoryTrait: Send + Sync {
    async fn get_order(&self, id: i64) -> Result<Option<Order>>;
    async fn get_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>>;
    async fn find_by_idempotency_key(&self, customer_id: i64, key: &str)
    -> Result<Option<Order>>;

    /// 预占库存、扣减折扣余额并写入订单
    async fn create_order(&self, order: &NewOrder) -> Result<OrderDetail>;

    /// 按计划执行状态流转（乐观并发：仅当订单仍处于 `plan.from` 时生效）
    async fn apply_transition(
        &self,
        plan: &TransitionPlan,
        actor: Actor,
        reason: Option<String>,
    ) -> Result<Order>;

    async fn list_by_customer(
        &self,
        customer_id: i64,
        status: Option<OrderStatus>,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<Order>, i64)>;
    async fn list_by_pharmacy(
        &self,
        pharmacy_id: i64,
        status: Option<OrderStatus>,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<Order>, i64)>;
}

/// 积分仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoyaltyRepositoryTrait: Send + Sync {
    async fn get_account(&self, customer_id: i64) -> Result<Option<LoyaltyAccount>>;

    /// 原子地应用一次账户变动并写入账本
    async fn apply_change(&self, change: &LoyaltyChange) -> Result<LoyaltyAccount>;
    async fn list_ledger(&self, customer_id: i64, limit: i64) -> Result<Vec<LoyaltyLedgerEntry>>;
}
