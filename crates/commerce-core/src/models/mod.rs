//! 交易域模型
//!
//! 包含商品、订单、地址和积分账户等实体定义

mod enums;
mod loyalty;
mod order;
mod product;

pub use enums::*;
pub use loyalty::{LoyaltyAccount, LoyaltyChange, LoyaltyLedgerEntry};
pub use order::{Actor, Address, Order, OrderDetail, OrderItem, ShippingAddress};
pub use product::Product;
