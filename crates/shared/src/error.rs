//! 统一错误处理模块
//!
//! 定义基础设施层共享的错误类型，使用 thiserror 提供良好的错误信息。

use thiserror::Error;

/// 基础设施错误类型
#[derive(Debug, Error)]
pub enum ShopError {
    // ==================== 数据库错误 ====================
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("数据库迁移失败: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("记录未找到: {entity} id={id}")]
    NotFound { entity: String, id: String },

    // ==================== 缓存错误 ====================
    #[error("Redis 错误: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("缓存序列化错误: {0}")]
    CacheSerialization(#[from] serde_json::Error),

    // ==================== 通用错误 ====================
    #[error("配置错误: {0}")]
    Config(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, ShopError>;

impl ShopError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::Database(_) => "DATABASE_ERROR",
            Self::Migration(_) => "MIGRATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Redis(_) => "REDIS_ERROR",
            Self::CacheSerialization(_) => "CACHE_SERIALIZATION_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 是否为可重试错误
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Redis(_))
    }
}
