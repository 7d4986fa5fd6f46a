//! VetShop 端到端测试
//!
//! 针对运行中的 vetshop-api 覆盖完整业务流程：
//! - 注册与登录（顾客、药房）
//! - 商品上架与库存
//! - 下单、状态流转与库存预占
//! - 积分累积与兑换
//!
//! 服务地址通过 `VETSHOP_API_URL` 指定

pub mod data;
pub mod helpers;
pub mod setup;
pub mod suites;

pub use setup::TestEnvironment;
