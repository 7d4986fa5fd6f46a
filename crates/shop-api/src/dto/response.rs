//! 响应 DTO 定义

use chrono::{DateTime, Utc};
use commerce::models::{AccountStatus, ActorRole, ProductCategory, ProductStatus};
use serde::{Deserialize, Serialize};

/// 分页响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

impl<T> PageResponse<T> {
    pub fn new(items: Vec<T>, total: i64, page: i64, page_size: i64) -> Self {
        let total_pages = if page_size > 0 {
            (total + page_size - 1) / page_size
        } else {
            0
        };

        Self {
            items,
            total,
            page,
            page_size,
            total_pages,
        }
    }
}

/// API 统一响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: "操作成功".to_string(),
            data: Some(data),
        }
    }

    /// 创建成功响应（无数据）
    pub fn success_empty() -> ApiResponse<()> {
        ApiResponse {
            success: true,
            code: "SUCCESS".to_string(),
            message: "操作成功".to_string(),
            data: None,
        }
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: message.into(),
            data: Some(data),
        }
    }
}

// ============================================
// 账户
// ============================================

/// 顾客资料
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDto {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
}

/// 药房资料
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PharmacyDto {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub license_number: String,
    pub phone: Option<String>,
    pub description: Option<String>,
    pub address_line: Option<String>,
    pub city: Option<String>,
    pub logo_url: Option<String>,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
}

/// 登录 / 注册响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub expires_at: i64,
    pub role: ActorRole,
    pub account_id: i64,
    pub name: String,
}

/// Token 刷新响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub token: String,
    pub expires_at: i64,
}

/// 当前登录账户
#[derive(Debug, Serialize)]
#[serde(tag = "role", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CurrentAccount {
    Customer { customer: CustomerDto },
    Pharmacy { pharmacy: PharmacyDto },
}

// ============================================
// 购物车 / 收藏
// ============================================

/// 购物车行（带商品当前信息）
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CartLineDto {
    pub product_id: i64,
    pub pharmacy_id: i64,
    pub name: String,
    pub image_url: Option<String>,
    pub price_cents: i64,
    pub quantity: i32,
    /// 当前可售数量
    pub available: i32,
    pub status: ProductStatus,
    pub added_at: DateTime<Utc>,
}

/// 购物车
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartDto {
    pub items: Vec<CartLineDto>,
    pub subtotal_cents: i64,
    pub item_count: i64,
}

impl CartDto {
    pub fn new(items: Vec<CartLineDto>) -> Self {
        let subtotal_cents = items
            .iter()
            .map(|l| l.price_cents * i64::from(l.quantity))
            .sum();
        let item_count = items.iter().map(|l| i64::from(l.quantity)).sum();

        Self {
            items,
            subtotal_cents,
            item_count,
        }
    }
}

/// 收藏商品
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteDto {
    pub product_id: i64,
    pub pharmacy_id: i64,
    pub name: String,
    pub category: ProductCategory,
    pub price_cents: i64,
    pub image_url: Option<String>,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
}
