//! 积分测试套件

use serde_json::json;

use crate::data::*;
use crate::setup::TestEnvironment;

#[cfg(test)]
mod loyalty_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "需要运行服务"]
    async fn test_public_tier_table() {
        let env = TestEnvironment::setup().await.unwrap();

        let table = env.api.loyalty_tiers().await.unwrap();
        assert!(!table.tiers.is_empty());
        assert_eq!(table.tiers[0].min_spend_cents, 0);
        assert!(
            table
                .tiers
                .windows(2)
                .all(|w| w[0].min_spend_cents < w[1].min_spend_cents),
            "档位应按门槛升序"
        );
        assert!(table.redemption_threshold_points > 0);
    }

    #[tokio::test]
    #[ignore = "需要运行服务"]
    async fn test_new_customer_has_empty_account() {
        let env = TestEnvironment::setup().await.unwrap();
        let (customer, _) = env.new_customer().await.unwrap();

        let summary = customer.api.loyalty_summary().await.unwrap();
        assert_eq!(summary.customer_id, customer.auth.account_id);
        assert_eq!(summary.points_balance, 0);
        assert_eq!(summary.discount_balance_cents, 0);

        // 积分不足时兑换失败
        assert!(customer.api.redeem(1).await.is_err());
    }

    #[tokio::test]
    #[ignore = "需要运行服务"]
    async fn test_points_only_after_delivery() {
        let env = TestEnvironment::setup().await.unwrap();
        let pharmacy = env.new_pharmacy().await.unwrap();
        let (customer, _) = env.new_customer().await.unwrap();
        let product = pharmacy.api.create_product(&TestProducts::kibble(20)).await.unwrap();

        let detail = customer
            .api
            .create_order(&json!({ "items": [{ "productId": product.id, "quantity": 6 }] }))
            .await
            .unwrap();
        assert!(detail.order.points_preview > 0);
        assert_eq!(customer.api.loyalty_summary().await.unwrap().points_balance, 0);

        pharmacy.api.deliver_order(detail.order.id).await.unwrap();

        let summary = customer.api.loyalty_summary().await.unwrap();
        assert_eq!(summary.points_balance, detail.order.points_preview);
        assert_eq!(summary.lifetime_spend_cents, detail.order.eligible_cents);
    }
}
