//! REST API 客户端
//!
//! 封装对 vetshop-api 的 HTTP 调用，自动解包 `{success, code, message, data}` 响应。

use anyhow::Result;
use commerce::models::{OrderDetail, OrderStatus, Product, ProductCategory};
use commerce::service::{LoyaltySummary, OrderPage, TierTable};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::time::Duration;

/// API 客户端
///
/// 设置 Token 后以对应身份调用接口
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// 以指定 Token 派生新客户端
    pub fn with_token(&self, token: &str) -> Self {
        Self {
            token: Some(token.to_string()),
            ..self.clone()
        }
    }

    // ========== 健康检查 ==========

    pub async fn health(&self) -> Result<bool> {
        let resp = self.client.get(self.url("/health")).send().await?;
        Ok(resp.status().is_success())
    }

    // ========== 认证 API ==========

    pub async fn register_customer(&self, req: &RegisterCustomer) -> Result<AuthResponse> {
        self.post("/api/v1/auth/customers/register", req).await
    }

    pub async fn login_customer(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let body = serde_json::json!({ "email": email, "password": password });
        self.post("/api/v1/auth/customers/login", &body).await
    }

    pub async fn register_pharmacy(&self, req: &RegisterPharmacy) -> Result<AuthResponse> {
        self.post("/api/v1/auth/pharmacies/register", req).await
    }

    pub async fn me(&self) -> Result<Value> {
        self.get("/api/v1/auth/me").await
    }

    // ========== 商品 API ==========

    pub async fn create_product(&self, req: &CreateProduct) -> Result<Product> {
        self.post("/api/v1/products", req).await
    }

    pub async fn get_product(&self, id: i64) -> Result<Product> {
        self.get(&format!("/api/v1/products/{}", id)).await
    }

    pub async fn adjust_stock(&self, id: i64, stock: i32) -> Result<Product> {
        let body = serde_json::json!({ "stock": stock });
        self.put(&format!("/api/v1/products/{}/stock", id), &body)
            .await
    }

    // ========== 地址 / 购物车 API ==========

    pub async fn create_address(&self, req: &CreateAddress) -> Result<AddressResponse> {
        self.post("/api/v1/addresses", req).await
    }

    pub async fn add_cart_item(&self, product_id: i64, quantity: i32) -> Result<Value> {
        let body = serde_json::json!({ "productId": product_id, "quantity": quantity });
        self.post("/api/v1/cart/items", &body).await
    }

    pub async fn get_cart(&self) -> Result<CartResponse> {
        self.get("/api/v1/cart").await
    }

    pub async fn checkout(&self, body: &Value) -> Result<OrderDetail> {
        self.post("/api/v1/cart/checkout", body).await
    }

    // ========== 订单 API ==========

    pub async fn create_order(&self, body: &Value) -> Result<OrderDetail> {
        self.post("/api/v1/orders", body).await
    }

    pub async fn get_order(&self, id: i64) -> Result<OrderDetail> {
        self.get(&format!("/api/v1/orders/{}", id)).await
    }

    pub async fn list_orders(&self) -> Result<OrderPage> {
        self.get("/api/v1/orders").await
    }

    pub async fn cancel_order(&self, id: i64, reason: &str) -> Result<OrderDetail> {
        let body = serde_json::json!({ "reason": reason });
        self.post(&format!("/api/v1/orders/{}/cancel", id), &body)
            .await
    }

    pub async fn update_order_status(&self, id: i64, status: OrderStatus) -> Result<OrderDetail> {
        let body = serde_json::json!({ "status": status });
        self.post(&format!("/api/v1/pharmacy/orders/{}/status", id), &body)
            .await
    }

    /// 以药房身份把订单推进到送达
    pub async fn deliver_order(&self, id: i64) -> Result<OrderDetail> {
        self.update_order_status(id, OrderStatus::Confirmed).await?;
        self.update_order_status(id, OrderStatus::Shipped).await?;
        self.update_order_status(id, OrderStatus::Delivered).await
    }

    // ========== 积分 API ==========

    pub async fn loyalty_tiers(&self) -> Result<TierTable> {
        self.get("/api/v1/loyalty/tiers").await
    }

    pub async fn loyalty_summary(&self) -> Result<LoyaltySummary> {
        self.get("/api/v1/loyalty").await
    }

    pub async fn redeem(&self, rewards: i64) -> Result<LoyaltySummary> {
        let body = serde_json::json!({ "rewards": rewards });
        self.post("/api/v1/loyalty/redeem", &body).await
    }

    /// 发送请求并只返回状态码，用于校验错误分支
    pub async fn post_status<R: Serialize>(&self, path: &str, body: &R) -> Result<StatusCode> {
        let resp = self
            .authorize(self.client.post(self.url(path)))
            .json(body)
            .send()
            .await?;
        Ok(resp.status())
    }

    // ========== 内部方法 ==========

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self
            .authorize(self.client.get(self.url(path)))
            .send()
            .await?;
        self.handle_response(resp).await
    }

    async fn post<T: DeserializeOwned, R: Serialize>(&self, path: &str, body: &R) -> Result<T> {
        let resp = self
            .authorize(self.client.post(self.url(path)))
            .json(body)
            .send()
            .await?;
        self.handle_response(resp).await
    }

    async fn put<T: DeserializeOwned, R: Serialize>(&self, path: &str, body: &R) -> Result<T> {
        let resp = self
            .authorize(self.client.put(self.url(path)))
            .json(body)
            .send()
            .await?;
        self.handle_response(resp).await
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn handle_response<T: DeserializeOwned>(&self, resp: Response) -> Result<T> {
        let status = resp.status();
        if status.is_success() {
            let envelope: Envelope<T> = resp.json().await?;
            envelope
                .data
                .ok_or_else(|| anyhow::anyhow!("响应缺少 data 字段: {}", envelope.message))
        } else {
            let error_text = resp.text().await.unwrap_or_default();
            Err(anyhow::anyhow!("API 错误 {}: {}", status, error_text))
        }
    }
}

// ========== 请求/响应类型 ==========

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterCustomer {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPharmacy {
    pub email: String,
    pub password: String,
    pub name: String,
    pub license_number: String,
    pub city: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub expires_at: i64,
    pub account_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProduct {
    pub name: String,
    pub category: ProductCategory,
    pub species: Option<String>,
    pub price_cents: i64,
    pub stock: i32,
    pub requires_prescription: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAddress {
    pub recipient: String,
    pub phone: String,
    pub line1: String,
    pub city: String,
    pub is_default: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressResponse {
    pub id: i64,
    pub is_default: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub items: Vec<Value>,
    pub subtotal_cents: i64,
    pub item_count: i64,
}
