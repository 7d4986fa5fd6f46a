//! 订单流程测试套件
//!
//! 下单预占库存，送达扣减库存并发放积分，取消释放预占。

use commerce::models::{LoyaltyTier, OrderStatus};
use reqwest::StatusCode;
use serde_json::json;

use crate::data::*;
use crate::setup::TestEnvironment;

#[cfg(test)]
mod order_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "需要运行服务"]
    async fn test_delivered_order_commits_stock_and_credits_points() {
        let env = TestEnvironment::setup().await.unwrap();
        let pharmacy = env.new_pharmacy().await.unwrap();
        let (customer, _) = env.new_customer().await.unwrap();

        let kibble = pharmacy.api.create_product(&TestProducts::kibble(10)).await.unwrap();
        let drops = pharmacy.api.create_product(&TestProducts::drops(5)).await.unwrap();

        let detail = customer
            .api
            .create_order(&json!({
                "items": [
                    { "productId": kibble.id, "quantity": 2 },
                    { "productId": drops.id, "quantity": 1 }
                ]
            }))
            .await
            .unwrap();
        assert_eq!(detail.order.status, OrderStatus::Pending);
        assert_eq!(detail.order.subtotal_cents, 17_500);
        assert_eq!(detail.order.loyalty_tier, LoyaltyTier::Silver);
        assert_eq!(detail.items.len(), 2);

        let reserved = env.api.get_product(kibble.id).await.unwrap();
        assert_eq!(reserved.stock, 10);
        assert_eq!(reserved.reserved, 2);

        let delivered = pharmacy.api.deliver_order(detail.order.id).await.unwrap();
        assert_eq!(delivered.order.status, OrderStatus::Delivered);
        assert_eq!(delivered.order.points_awarded, detail.order.points_preview);

        let committed = env.api.get_product(kibble.id).await.unwrap();
        assert_eq!(committed.stock, 8);
        assert_eq!(committed.reserved, 0);

        let summary = customer.api.loyalty_summary().await.unwrap();
        assert_eq!(summary.points_balance, delivered.order.points_awarded);
        assert_eq!(summary.lifetime_spend_cents, 17_500);
    }

    #[tokio::test]
    #[ignore = "需要运行服务"]
    async fn test_cancel_releases_reservation() {
        let env = TestEnvironment::setup().await.unwrap();
        let pharmacy = env.new_pharmacy().await.unwrap();
        let (customer, _) = env.new_customer().await.unwrap();
        let product = pharmacy.api.create_product(&TestProducts::drops(3)).await.unwrap();

        let detail = customer
            .api
            .create_order(&json!({ "items": [{ "productId": product.id, "quantity": 3 }] }))
            .await
            .unwrap();
        assert_eq!(env.api.get_product(product.id).await.unwrap().reserved, 3);

        // 可售为 0 时再下单应失败
        let status = customer
            .api
            .post_status(
                "/api/v1/orders",
                &json!({ "items": [{ "productId": product.id, "quantity": 1 }] }),
            )
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CONFLICT);

        let cancelled = customer
            .api
            .cancel_order(detail.order.id, "changed my mind")
            .await
            .unwrap();
        assert_eq!(cancelled.order.status, OrderStatus::Cancelled);

        let released = env.api.get_product(product.id).await.unwrap();
        assert_eq!(released.stock, 3);
        assert_eq!(released.reserved, 0);

        // 已取消订单不能再流转
        let result = pharmacy
            .api
            .update_order_status(detail.order.id, OrderStatus::Confirmed)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    #[ignore = "需要运行服务"]
    async fn test_customer_cannot_cancel_confirmed_order() {
        let env = TestEnvironment::setup().await.unwrap();
        let pharmacy = env.new_pharmacy().await.unwrap();
        let (customer, _) = env.new_customer().await.unwrap();
        let product = pharmacy.api.create_product(&TestProducts::drops(5)).await.unwrap();

        let detail = customer
            .api
            .create_order(&json!({ "items": [{ "productId": product.id, "quantity": 1 }] }))
            .await
            .unwrap();
        pharmacy
            .api
            .update_order_status(detail.order.id, OrderStatus::Confirmed)
            .await
            .unwrap();

        let status = customer
            .api
            .post_status(&format!("/api/v1/orders/{}/cancel", detail.order.id), &json!({}))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    #[ignore = "需要运行服务"]
    async fn test_cart_checkout_creates_order_and_empties_cart() {
        let env = TestEnvironment::setup().await.unwrap();
        let pharmacy = env.new_pharmacy().await.unwrap();
        let (customer, address) = env.new_customer().await.unwrap();
        assert!(address.is_default);
        let product = pharmacy.api.create_product(&TestProducts::kibble(4)).await.unwrap();

        customer.api.add_cart_item(product.id, 2).await.unwrap();
        let cart = customer.api.get_cart().await.unwrap();
        assert_eq!(cart.item_count, 2);
        assert_eq!(cart.subtotal_cents, 15_000);

        let detail = customer
            .api
            .checkout(&json!({ "idempotencyKey": format!("e2e-{}", product.id) }))
            .await
            .unwrap();
        assert_eq!(detail.order.pharmacy_id, pharmacy.auth.account_id);
        assert!(customer.api.get_cart().await.unwrap().items.is_empty());

        let orders = customer.api.list_orders().await.unwrap();
        assert_eq!(orders.total, 1);
        assert_eq!(orders.items[0].id, detail.order.id);
    }
}
