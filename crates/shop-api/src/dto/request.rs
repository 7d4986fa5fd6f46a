//! 请求 DTO 定义
//!
//! 所有写操作的请求体都通过 validator 校验

use commerce::models::{OrderStatus, ProductCategory, ProductStatus};
use commerce::order::LineRequest;
use commerce::service::CreateOrderRequest;
use serde::Deserialize;
use validator::Validate;

// ============================================
// 认证
// ============================================

/// 顾客注册
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterCustomerRequest {
    #[validate(email(message = "邮箱格式不正确"))]
    pub email: String,
    #[validate(length(min = 8, max = 100, message = "密码长度必须在 8-100 之间"))]
    pub password: String,
    #[validate(length(min = 1, max = 100, message = "姓名长度必须在 1-100 之间"))]
    pub full_name: String,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
}

/// 药房注册
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPharmacyRequest {
    #[validate(email(message = "邮箱格式不正确"))]
    pub email: String,
    #[validate(length(min = 8, max = 100, message = "密码长度必须在 8-100 之间"))]
    pub password: String,
    #[validate(length(min = 1, max = 120, message = "药房名称长度必须在 1-120 之间"))]
    pub name: String,
    #[validate(length(min = 1, max = 60, message = "执照编号不能为空"))]
    pub license_number: String,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    pub description: Option<String>,
    #[validate(length(max = 255))]
    pub address_line: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
}

/// 登录（顾客与药房共用）
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email(message = "邮箱格式不正确"))]
    pub email: String,
    #[validate(length(min = 1, max = 100, message = "密码长度必须在 1-100 之间"))]
    pub password: String,
}

// ============================================
// 账户资料
// ============================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomerRequest {
    #[validate(length(min = 1, max = 100))]
    pub full_name: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePharmacyRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    pub description: Option<String>,
    #[validate(length(max = 255))]
    pub address_line: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(url(message = "Logo 地址格式不正确"))]
    pub logo_url: Option<String>,
}

// ============================================
// 商品
// ============================================

/// 商品单价上限（分）
pub const MAX_PRICE_CENTS: i64 = 10_000_000;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200, message = "商品名称长度必须在 1-200 之间"))]
    pub name: String,
    pub description: Option<String>,
    pub category: ProductCategory,
    #[validate(length(max = 60))]
    pub species: Option<String>,
    #[validate(range(min = 1, max = MAX_PRICE_CENTS, message = "价格必须在 0.01 到 100000.00 之间"))]
    pub price_cents: i64,
    #[validate(range(min = 0, message = "库存不能为负数"))]
    pub stock: i32,
    #[validate(url(message = "图片地址格式不正确"))]
    pub image_url: Option<String>,
    #[serde(default)]
    pub requires_prescription: bool,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<ProductCategory>,
    #[validate(length(max = 60))]
    pub species: Option<String>,
    #[validate(range(min = 1, max = MAX_PRICE_CENTS, message = "价格必须在 0.01 到 100000.00 之间"))]
    pub price_cents: Option<i64>,
    #[validate(url(message = "图片地址格式不正确"))]
    pub image_url: Option<String>,
    pub requires_prescription: Option<bool>,
    pub status: Option<ProductStatus>,
}

/// 设置库存总量（不能低于已预占数量）
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdjustStockRequest {
    #[validate(range(min = 0, message = "库存不能为负数"))]
    pub stock: i32,
}

/// 商品查询过滤
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQueryFilter {
    /// 名称 / 描述关键字
    pub q: Option<String>,
    pub category: Option<ProductCategory>,
    pub species: Option<String>,
    pub pharmacy_id: Option<i64>,
}

// ============================================
// 购物车 / 收藏 / 地址
// ============================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddCartItemRequest {
    pub product_id: i64,
    #[validate(range(min = 1, max = 99, message = "数量必须在 1-99 之间"))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartItemRequest {
    #[validate(range(min = 1, max = 99, message = "数量必须在 1-99 之间"))]
    pub quantity: i32,
}

/// 购物车结算
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    /// 只结算该药房的商品，不传时结算整个购物车
    pub pharmacy_id: Option<i64>,
    pub address_id: Option<i64>,
    #[serde(default)]
    pub use_discount: bool,
    #[validate(length(max = 500))]
    pub note: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddressRequest {
    #[validate(length(max = 50))]
    pub label: Option<String>,
    #[validate(length(min = 1, max = 100, message = "收件人不能为空"))]
    pub recipient: String,
    #[validate(length(min = 1, max = 30, message = "联系电话不能为空"))]
    pub phone: String,
    #[validate(length(min = 1, max = 255, message = "地址不能为空"))]
    pub line1: String,
    #[validate(length(max = 255))]
    pub line2: Option<String>,
    #[validate(length(min = 1, max = 100, message = "城市不能为空"))]
    pub city: String,
    #[validate(length(max = 20))]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

// ============================================
// 订单 / 积分
// ============================================

/// 直接下单（不经过购物车）
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    #[validate(length(min = 1, message = "订单至少包含一件商品"))]
    pub items: Vec<LineRequest>,
    pub address_id: Option<i64>,
    #[serde(default)]
    pub use_discount: bool,
    #[validate(length(max = 500))]
    pub note: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub idempotency_key: Option<String>,
}

impl From<PlaceOrderRequest> for CreateOrderRequest {
    fn from(req: PlaceOrderRequest) -> Self {
        Self {
            items: req.items,
            address_id: req.address_id,
            use_discount: req.use_discount,
            note: req.note,
            idempotency_key: req.idempotency_key,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderQueryFilter {
    pub status: Option<OrderStatus>,
}

/// 药房更新订单状态
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CancelOrderRequest {
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

/// 兑换奖励
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RedeemRequest {
    #[validate(range(min = 1, max = 100, message = "兑换次数必须在 1-100 之间"))]
    pub rewards: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerQuery {
    pub limit: Option<i64>,
}

// ============================================
// 分页
// ============================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    20
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl PaginationParams {
    /// 计算数据库查询的 offset
    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1) * self.limit()
    }

    /// 获取限制条数（最大100）
    pub fn limit(&self) -> i64 {
        self.page_size.clamp(1, 100)
    }
}
