//! HTTP 请求处理器

pub mod address;
pub mod auth;
pub mod cart;
pub mod customer;
pub mod favorite;
pub mod loyalty;
pub mod order;
pub mod pharmacy;
pub mod pharmacy_order;
pub mod product;
