//! 账户与商品目录测试套件

use commerce::models::ProductStatus;
use reqwest::StatusCode;
use serde_json::json;

use crate::data::*;
use crate::setup::TestEnvironment;

#[cfg(test)]
mod catalog_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "需要运行服务"]
    async fn test_register_then_login() {
        let env = TestEnvironment::setup().await.unwrap();
        let req = TestAccounts::customer();

        let registered = env.api.register_customer(&req).await.unwrap();
        let logged_in = env
            .api
            .login_customer(&req.email, &req.password)
            .await
            .unwrap();
        assert_eq!(registered.account_id, logged_in.account_id);

        let me = env.api.with_token(&logged_in.token).me().await.unwrap();
        assert_eq!(me["role"], "CUSTOMER");

        // 重复注册
        let status = env
            .api
            .post_status("/api/v1/auth/customers/register", &req)
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    #[ignore = "需要运行服务"]
    async fn test_pharmacy_manages_product_stock() {
        let env = TestEnvironment::setup().await.unwrap();
        let pharmacy = env.new_pharmacy().await.unwrap();

        let product = pharmacy.api.create_product(&TestProducts::drops(5)).await.unwrap();
        assert_eq!(product.pharmacy_id, pharmacy.auth.account_id);
        assert_eq!(product.status, ProductStatus::Active);

        let adjusted = pharmacy.api.adjust_stock(product.id, 12).await.unwrap();
        assert_eq!(adjusted.stock, 12);

        // 其他药房不能改库存
        let other = env.new_pharmacy().await.unwrap();
        assert!(other.api.adjust_stock(product.id, 0).await.is_err());
    }

    #[tokio::test]
    #[ignore = "需要运行服务"]
    async fn test_customer_cannot_create_product() {
        let env = TestEnvironment::setup().await.unwrap();
        let (customer, _) = env.new_customer().await.unwrap();

        let status = customer
            .api
            .post_status(
                "/api/v1/products",
                &json!({
                    "name": "Not allowed",
                    "category": "OTHER",
                    "priceCents": 100,
                    "stock": 1
                }),
            )
            .await
            .unwrap();
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
