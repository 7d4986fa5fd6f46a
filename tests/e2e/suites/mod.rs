//! 测试套件模块
//!
//! 按业务功能组织的测试用例集合。

pub mod catalog;
pub mod loyalty;
pub mod order_flow;
