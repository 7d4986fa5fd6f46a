//! 数据库仓储层
//!
//! 仓储只负责持久化，业务规则在 `order` / `loyalty` 模块中以纯函数实现，
//! 仓储在事务内调用这些函数校验后写回。

mod address_repo;
mod loyalty_repo;
mod order_repo;
mod product_repo;
mod traits;

pub use address_repo::AddressRepository;
pub use loyalty_repo::LoyaltyRepository;
pub use order_repo::OrderRepository;
pub use product_repo::ProductRepository;
pub use traits::*;
