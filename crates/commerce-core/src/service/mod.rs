//! 业务服务层
//!
//! 编排仓储与领域规则，对外提供下单、状态流转和积分操作

pub mod dto;
mod loyalty_service;
mod order_service;

pub use dto::*;
pub use loyalty_service::LoyaltyService;
pub use order_service::OrderService;
