//! 订单计价与校验

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use vetshop_shared::config::ShopConfig;

use crate::error::{CommerceError, Result};
use crate::loyalty::{LoyaltyAward, LoyaltyRules};
use crate::models::{Product, ProductStatus};

/// 下单请求中的一行
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineRequest {
    pub product_id: i64,
    pub quantity: i32,
}

/// 计价后的订单行（商品名和单价为快照）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedLine {
    pub product_id: i64,
    pub product_name: String,
    pub unit_price_cents: i64,
    pub quantity: i32,
    pub line_total_cents: i64,
}

/// 报价
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub pharmacy_id: i64,
    pub lines: Vec<PricedLine>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub shipping_cents: i64,
    pub total_cents: i64,
    pub eligible_cents: i64,
    /// 积分预估，送达后入账
    pub loyalty: LoyaltyAward,
}

/// 规范化订单行
///
/// 同一商品的多行合并为一行，合并后按商品 ID 升序。
/// 数量和行数限制在合并后校验。
pub fn normalize_items(items: &[LineRequest], shop: &ShopConfig) -> Result<Vec<LineRequest>> {
    if items.is_empty() {
        return Err(CommerceError::Validation("订单至少包含一件商品".to_string()));
    }

    let mut merged: BTreeMap<i64, i32> = BTreeMap::new();
    for item in items {
        if item.quantity < 1 || item.quantity > shop.max_item_quantity {
            return Err(CommerceError::Validation(format!(
                "商品 {} 数量必须在 1 到 {} 之间",
                item.product_id, shop.max_item_quantity
            )));
        }
        *merged.entry(item.product_id).or_default() += item.quantity;
    }

    if merged.len() > shop.max_order_lines {
        return Err(CommerceError::Validation(format!(
            "单笔订单最多 {} 种商品",
            shop.max_order_lines
        )));
    }

    merged
        .into_iter()
        .map(|(product_id, quantity)| {
            if quantity > shop.max_item_quantity {
                return Err(CommerceError::Validation(format!(
                    "商品 {} 合并后数量 {} 超过上限 {}",
                    product_id, quantity, shop.max_item_quantity
                )));
            }
            Ok(LineRequest {
                product_id,
                quantity,
            })
        })
        .collect()
}

/// 校验订单商品，返回所属药房 ID
pub fn validate_products(lines: &[LineRequest], products: &HashMap<i64, Product>) -> Result<i64> {
    let mut pharmacy_id = None;

    for line in lines {
        let product = products
            .get(&line.product_id)
            .ok_or(CommerceError::ProductNotFound(line.product_id))?;

        if product.status != ProductStatus::Active {
            return Err(CommerceError::ProductInactive(product.id));
        }

        match pharmacy_id {
            None => pharmacy_id = Some(product.pharmacy_id),
            Some(id) if id != product.pharmacy_id => return Err(CommerceError::MixedPharmacies),
            Some(_) => {}
        }
    }

    pharmacy_id.ok_or_else(|| CommerceError::Validation("订单至少包含一件商品".to_string()))
}

/// 计算订单金额
///
/// `lines` 需先经过 [`normalize_items`] 和 [`validate_products`]
pub fn price(
    lines: &[LineRequest],
    products: &HashMap<i64, Product>,
    discount_balance_cents: i64,
    use_discount: bool,
    rules: &LoyaltyRules,
    shop: &ShopConfig,
) -> Result<Quote> {
    let pharmacy_id = validate_products(lines, products)?;

    let mut priced = Vec::with_capacity(lines.len());
    let mut subtotal_cents: i64 = 0;
    for line in lines {
        let product = products
            .get(&line.product_id)
            .ok_or(CommerceError::ProductNotFound(line.product_id))?;
        let line_total_cents = product
            .price_cents
            .checked_mul(i64::from(line.quantity))
            .ok_or_else(|| CommerceError::Validation("订单金额溢出".to_string()))?;
        subtotal_cents = subtotal_cents
            .checked_add(line_total_cents)
            .ok_or_else(|| CommerceError::Validation("订单金额溢出".to_string()))?;

        priced.push(PricedLine {
            product_id: product.id,
            product_name: product.name.clone(),
            unit_price_cents: product.price_cents,
            quantity: line.quantity,
            line_total_cents,
        });
    }

    let discount_cents = if use_discount {
        discount_balance_cents.max(0).min(subtotal_cents)
    } else {
        0
    };
    let shipping_cents = if subtotal_cents >= shop.free_shipping_threshold_cents {
        0
    } else {
        shop.flat_shipping_cents
    };
    let eligible_cents = subtotal_cents - discount_cents;
    let total_cents = eligible_cents
        .checked_add(shipping_cents)
        .ok_or_else(|| CommerceError::Validation("订单金额溢出".to_string()))?;

    Ok(Quote {
        pharmacy_id,
        lines: priced,
        subtotal_cents,
        discount_cents,
        shipping_cents,
        total_cents,
        eligible_cents,
        loyalty: rules.evaluate(eligible_cents),
    })
}
