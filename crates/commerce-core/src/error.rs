//! 交易域错误类型
//!
//! 定义订单、库存和积分流程的业务错误和系统错误

use thiserror::Error;

use crate::models::OrderStatus;

/// 交易域错误类型
#[derive(Debug, Error)]
pub enum CommerceError {
    // === 商品与库存 ===
    #[error("商品不存在: {0}")]
    ProductNotFound(i64),

    #[error("商品已下架: {0}")]
    ProductInactive(i64),

    #[error("商品库存不足: product_id={product_id}, 需要 {requested}, 可用 {available}")]
    InsufficientStock {
        product_id: i64,
        requested: i32,
        available: i32,
    },

    #[error("库存数据不一致: product_id={product_id}, {reason}")]
    StockInvariant { product_id: i64, reason: String },

    #[error("同一订单只能包含同一药房的商品")]
    MixedPharmacies,

    // === 订单 ===
    #[error("订单不存在: {0}")]
    OrderNotFound(i64),

    #[error("订单状态不允许此操作: {from:?} -> {to:?}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("收货地址不存在: {0}")]
    AddressNotFound(i64),

    #[error("幂等键已被使用: {0}")]
    DuplicateIdempotencyKey(String),

    // === 积分 ===
    #[error("积分不足: 需要 {required}, 可用 {available}")]
    InsufficientPoints { required: i64, available: i64 },

    #[error("积分规则配置无效: {0}")]
    InvalidLoyaltyConfig(String),

    // === 权限与校验 ===
    #[error("无权操作: {0}")]
    Forbidden(String),

    #[error("参数校验失败: {0}")]
    Validation(String),

    // === 系统错误 ===
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON 序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("内部错误: {0}")]
    Internal(String),

    #[error("并发冲突，请重试")]
    ConcurrencyConflict,
}

/// 交易域 Result 类型别名
pub type Result<T> = std::result::Result<T, CommerceError>;

impl CommerceError {
    /// 检查是否为可重试的错误
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_) | Self::ConcurrencyConflict)
    }

    /// 检查是否为业务错误（非系统错误）
    pub fn is_business_error(&self) -> bool {
        !matches!(
            self,
            Self::Database(_)
                | Self::Serialization(_)
                | Self::Internal(_)
                | Self::ConcurrencyConflict
                | Self::StockInvariant { .. }
                | Self::InvalidLoyaltyConfig(_)
        )
    }

    /// 获取错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            Self::ProductInactive(_) => "PRODUCT_INACTIVE",
            Self::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            Self::StockInvariant { .. } => "STOCK_INVARIANT_VIOLATED",
            Self::MixedPharmacies => "MIXED_PHARMACIES",
            Self::OrderNotFound(_) => "ORDER_NOT_FOUND",
            Self::InvalidTransition { .. } => "INVALID_ORDER_TRANSITION",
            Self::AddressNotFound(_) => "ADDRESS_NOT_FOUND",
            Self::DuplicateIdempotencyKey(_) => "DUPLICATE_IDEMPOTENCY_KEY",
            Self::InsufficientPoints { .. } => "INSUFFICIENT_POINTS",
            Self::InvalidLoyaltyConfig(_) => "INVALID_LOYALTY_CONFIG",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::ConcurrencyConflict => "CONCURRENCY_CONFLICT",
        }
    }
}
