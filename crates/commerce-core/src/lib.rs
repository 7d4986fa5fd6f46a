//! VetShop 交易核心
//!
//! 订单与积分流程的领域实现：
//!
//! - **积分规则**：按单笔可计积分金额分档计算积分与折扣累积，达到门槛可兑换奖励
//! - **下单**：校验订单行、计价、预占库存
//! - **状态流转**：送达时扣减库存并发放积分，取消时释放预占并退回折扣
//!
//! 规则以纯函数实现（`loyalty`、`order`），仓储层在事务内调用它们并持久化结果。

pub mod error;
pub mod loyalty;
pub mod models;
pub mod order;
pub mod repository;
pub mod service;

pub use error::{CommerceError, Result};
pub use loyalty::LoyaltyRules;
pub use service::{LoyaltyService, OrderService};

use repository::{AddressRepository, LoyaltyRepository, OrderRepository, ProductRepository};

/// PostgreSQL 仓储装配的订单服务
pub type PgOrderService =
    OrderService<OrderRepository, ProductRepository, AddressRepository, LoyaltyRepository>;

/// PostgreSQL 仓储装配的积分服务
pub type PgLoyaltyService = LoyaltyService<LoyaltyRepository>;
