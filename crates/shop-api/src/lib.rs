//! VetShop REST API
//!
//! 宠物药品商城的 HTTP 接口层：顾客与药房的注册登录、商品目录、购物车、
//! 收货地址、收藏、订单和积分。
//!
//! ## 模块结构
//!
//! - `auth`: JWT 签发校验与密码哈希
//! - `middleware`: 认证中间件和身份提取器
//! - `dto`: 请求和响应的数据传输对象
//! - `handlers`: HTTP 请求处理器
//! - `routes`: 路由配置
//! - `app`: 中间件栈与健康检查
//! - `state`: 应用状态
//!
//! 下单、状态流转和积分规则由 `commerce` crate 实现，处理器只做参数校验和权限判定。

pub mod app;
pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use app::{build_router, cors_layer};
pub use dto::{ApiResponse, PageResponse, PaginationParams};
pub use error::{ApiError, Result};
pub use state::AppState;
