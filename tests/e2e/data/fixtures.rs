//! 测试数据工厂
//!
//! 邮箱和执照号带随机后缀，同一数据库可重复执行

use commerce::models::ProductCategory;
use uuid::Uuid;

use crate::helpers::{CreateAddress, CreateProduct, RegisterCustomer, RegisterPharmacy};

pub const TEST_PASSWORD: &str = "Passw0rd!e2e";

fn suffix() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_string()
}

pub struct TestAccounts;

impl TestAccounts {
    pub fn customer() -> RegisterCustomer {
        RegisterCustomer {
            email: format!("owner_{}@e2e.vetshop.test", suffix()),
            password: TEST_PASSWORD.to_string(),
            full_name: "E2E Pet Owner".to_string(),
        }
    }

    pub fn pharmacy() -> RegisterPharmacy {
        let suffix = suffix();
        RegisterPharmacy {
            email: format!("pharmacy_{}@e2e.vetshop.test", suffix),
            password: TEST_PASSWORD.to_string(),
            name: format!("E2E Vet Pharmacy {}", suffix),
            license_number: format!("LIC-{}", suffix),
            city: Some("Hangzhou".to_string()),
        }
    }
}

pub struct TestProducts;

impl TestProducts {
    /// 75.00 元处方粮
    pub fn kibble(stock: i32) -> CreateProduct {
        CreateProduct {
            name: "Renal Care Kibble 2kg".to_string(),
            category: ProductCategory::Food,
            species: Some("cat".to_string()),
            price_cents: 7_500,
            stock,
            requires_prescription: false,
        }
    }

    /// 25.00 元驱虫滴剂
    pub fn drops(stock: i32) -> CreateProduct {
        CreateProduct {
            name: "Flea & Tick Drops".to_string(),
            category: ProductCategory::Medicine,
            species: Some("dog".to_string()),
            price_cents: 2_500,
            stock,
            requires_prescription: false,
        }
    }
}

pub fn test_address() -> CreateAddress {
    CreateAddress {
        recipient: "E2E Pet Owner".to_string(),
        phone: "13800000000".to_string(),
        line1: "1 Test Road".to_string(),
        city: "Hangzhou".to_string(),
        is_default: true,
    }
}
