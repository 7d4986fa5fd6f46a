//! 数据传输对象
//!
//! 请求体和响应体定义，JSON 字段统一使用 camelCase

mod request;
mod response;

pub use request::*;
pub use response::*;
