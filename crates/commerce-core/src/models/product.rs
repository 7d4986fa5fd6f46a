//! 商品模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{ProductCategory, ProductStatus};

/// 商品
///
/// `reserved` 为已下单未送达订单预占的数量，`stock - reserved` 为可售数量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub pharmacy_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub category: ProductCategory,
    /// 适用物种（如 "dog", "cat"）
    pub species: Option<String>,
    pub price_cents: i64,
    pub stock: i32,
    pub reserved: i32,
    pub image_url: Option<String>,
    pub requires_prescription: bool,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// 可售数量
    pub fn available(&self) -> i32 {
        self.stock - self.reserved
    }

    /// 是否可购买
    pub fn is_purchasable(&self) -> bool {
        self.status == ProductStatus::Active && self.available() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn sample_product() -> Product {
        Product {
            id: 1,
            pharmacy_id: 10,
            name: "Flea & Tick Spot-On".to_string(),
            description: None,
            category: ProductCategory::Medicine,
            species: Some("dog".to_string()),
            price_cents: 4_500,
            stock: 10,
            reserved: 4,
            image_url: None,
            requires_prescription: false,
            status: ProductStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_available_and_purchasable() {
        let mut product = sample_product();
        assert_eq!(product.available(), 6);
        assert!(product.is_purchasable());

        product.reserved = 10;
        assert!(!product.is_purchasable());

        product.reserved = 0;
        product.status = ProductStatus::Inactive;
        assert!(!product.is_purchasable());
    }

    #[test]
    fn test_product_serialization_camel_case() {
        let json = serde_json::to_value(sample_product()).unwrap();
        assert_eq!(json["pharmacyId"], 10);
        assert_eq!(json["priceCents"], 4_500);
        assert_eq!(json["category"], "MEDICINE");
        assert_eq!(json["requiresPrescription"], false);
    }
}
