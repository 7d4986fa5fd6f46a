//! 测试数据

mod fixtures;

pub use fixtures::*;
