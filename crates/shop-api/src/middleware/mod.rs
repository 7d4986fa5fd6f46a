//! 中间件模块

mod auth;

pub use auth::{CurrentActor, CurrentCustomer, CurrentPharmacy, auth_middleware, is_public};
