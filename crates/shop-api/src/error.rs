//! API 错误类型定义
//!
//! 将认证、校验和交易域错误统一映射为 HTTP 状态码与错误码

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use commerce::CommerceError;
use serde_json::json;
use vetshop_shared::error::ShopError;

const INTERNAL_MESSAGE: &str = "服务内部错误，请稍后重试";

/// API 错误类型
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // 认证错误
    #[error("未授权: {0}")]
    Unauthorized(String),
    #[error("禁止访问: {0}")]
    Forbidden(String),
    #[error("邮箱或密码错误")]
    InvalidCredentials,
    #[error("账户已被禁用")]
    AccountDisabled,
    #[error("邮箱已被注册")]
    EmailTaken,

    // 验证错误
    #[error("参数验证失败: {0}")]
    Validation(String),

    // 资源
    #[error("资源不存在: {0}")]
    NotFound(String),
    #[error("资源冲突: {0}")]
    Conflict(String),
    #[error("请求处理中，请勿重复提交")]
    DuplicateSubmission,

    // 交易域错误
    #[error(transparent)]
    Commerce(CommerceError),

    // 系统错误
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Redis错误: {0}")]
    Redis(String),
    #[error("内部错误: {0}")]
    Internal(String),
}

impl ApiError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) | Self::AccountDisabled => StatusCode::FORBIDDEN,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::EmailTaken | Self::Conflict(_) | Self::DuplicateSubmission => {
                StatusCode::CONFLICT
            }
            Self::Commerce(err) => commerce_status(err),
            Self::Database(_) | Self::Redis(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::AccountDisabled => "ACCOUNT_DISABLED",
            Self::EmailTaken => "EMAIL_TAKEN",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::DuplicateSubmission => "DUPLICATE_SUBMISSION",
            Self::Commerce(err) => err.error_code(),
            Self::Database(_) => "DATABASE_ERROR",
            Self::Redis(_) => "REDIS_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 是否为需要屏蔽细节的系统错误
    fn is_system_error(&self) -> bool {
        match self {
            Self::Database(_) | Self::Redis(_) | Self::Internal(_) => true,
            Self::Commerce(err) => !err.is_business_error(),
            _ => false,
        }
    }
}

fn commerce_status(err: &CommerceError) -> StatusCode {
    match err {
        CommerceError::ProductNotFound(_)
        | CommerceError::OrderNotFound(_)
        | CommerceError::AddressNotFound(_) => StatusCode::NOT_FOUND,
        CommerceError::ProductInactive(_)
        | CommerceError::MixedPharmacies
        | CommerceError::Validation(_) => StatusCode::BAD_REQUEST,
        CommerceError::InsufficientStock { .. }
        | CommerceError::InsufficientPoints { .. }
        | CommerceError::InvalidTransition { .. }
        | CommerceError::DuplicateIdempotencyKey(_)
        | CommerceError::ConcurrencyConflict => StatusCode::CONFLICT,
        CommerceError::Forbidden(_) => StatusCode::FORBIDDEN,
        CommerceError::StockInvariant { .. }
        | CommerceError::InvalidLoyaltyConfig(_)
        | CommerceError::Database(_)
        | CommerceError::Serialization(_)
        | CommerceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志
        let message = if self.is_system_error() {
            tracing::error!(error = %self, code = self.error_code(), "请求处理失败");
            INTERNAL_MESSAGE.to_string()
        } else {
            self.to_string()
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null
        });

        (status, axum::Json(body)).into_response()
    }
}

/// 从 validator 错误转换
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

/// 从 JSON 序列化错误转换
impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON 处理错误: {}", err))
    }
}

/// 从交易域错误转换
impl From<CommerceError> for ApiError {
    fn from(err: CommerceError) -> Self {
        match err {
            CommerceError::Database(e) => Self::Database(e),
            other => Self::Commerce(other),
        }
    }
}

/// 从基础设施错误转换
impl From<ShopError> for ApiError {
    fn from(err: ShopError) -> Self {
        match err {
            ShopError::Database(e) => Self::Database(e),
            ShopError::Redis(e) => Self::Redis(e.to_string()),
            ShopError::NotFound { entity, id } => Self::NotFound(format!("{entity} {id}")),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// API 层 Result 类型别名
pub type Result<T> = std::result::Result<T, ApiError>;
