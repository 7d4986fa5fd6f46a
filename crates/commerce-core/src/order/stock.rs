//! 库存预占
//!
//! 下单预占、送达扣减、取消释放三种库存变动。
//! 任何操作后都必须满足 `0 <= reserved <= stock`。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::pricing::PricedLine;
use crate::error::{CommerceError, Result};
use crate::models::{Product, ProductStatus};

/// 库存变动类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementKind {
    /// 预占：reserved += q
    Reserve,
    /// 释放：reserved -= q
    Release,
    /// 扣减：stock -= q, reserved -= q
    Commit,
}

/// 单个商品的库存变动
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub product_id: i64,
    pub quantity: i32,
    pub kind: MovementKind,
}

/// 库存快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLevel {
    pub product_id: i64,
    pub stock: i32,
    pub reserved: i32,
}

impl From<&Product> for StockLevel {
    fn from(product: &Product) -> Self {
        Self {
            product_id: product.id,
            stock: product.stock,
            reserved: product.reserved,
        }
    }
}

impl StockLevel {
    pub fn new(product_id: i64, stock: i32, reserved: i32) -> Self {
        Self {
            product_id,
            stock,
            reserved,
        }
    }

    pub fn available(&self) -> i32 {
        self.stock - self.reserved
    }

    fn invariant(&self, reason: impl Into<String>) -> CommerceError {
        CommerceError::StockInvariant {
            product_id: self.product_id,
            reason: reason.into(),
        }
    }

    fn check_quantity(&self, quantity: i32) -> Result<()> {
        if quantity <= 0 {
            return Err(self.invariant(format!("变动数量必须为正数: {}", quantity)));
        }
        Ok(())
    }

    /// 预占库存
    pub fn reserve(&mut self, quantity: i32) -> Result<()> {
        self.check_quantity(quantity)?;
        let available = self.available();
        if available < quantity {
            return Err(CommerceError::InsufficientStock {
                product_id: self.product_id,
                requested: quantity,
                available: available.max(0),
            });
        }
        self.reserved += quantity;
        Ok(())
    }

    /// 释放预占
    pub fn release(&mut self, quantity: i32) -> Result<()> {
        self.check_quantity(quantity)?;
        if self.reserved < quantity {
            return Err(self.invariant(format!(
                "释放数量 {} 超过已预占 {}",
                quantity, self.reserved
            )));
        }
        self.reserved -= quantity;
        Ok(())
    }

    /// 扣减库存（消耗预占）
    pub fn commit(&mut self, quantity: i32) -> Result<()> {
        self.check_quantity(quantity)?;
        if self.reserved < quantity || self.stock < quantity {
            return Err(self.invariant(format!(
                "扣减数量 {} 超过库存 {} 或已预占 {}",
                quantity, self.stock, self.reserved
            )));
        }
        self.stock -= quantity;
        self.reserved -= quantity;
        Ok(())
    }

    /// 药房调整库存，不能低于已预占数量
    pub fn adjust(&mut self, new_stock: i32) -> Result<()> {
        if new_stock < 0 {
            return Err(CommerceError::Validation("库存不能为负数".to_string()));
        }
        if new_stock < self.reserved {
            return Err(CommerceError::Validation(format!(
                "库存 {} 不能低于已预占数量 {}",
                new_stock, self.reserved
            )));
        }
        self.stock = new_stock;
        Ok(())
    }

    /// 应用一次变动
    pub fn apply(&mut self, movement: &StockMovement) -> Result<()> {
        if movement.product_id != self.product_id {
            return Err(self.invariant(format!(
                "变动商品不匹配: {}",
                movement.product_id
            )));
        }
        match movement.kind {
            MovementKind::Reserve => self.reserve(movement.quantity),
            MovementKind::Release => self.release(movement.quantity),
            MovementKind::Commit => self.commit(movement.quantity),
        }
    }
}

/// 为已计价的订单行预占库存
///
/// `products` 须为加锁后读到的最新数据。商品下架或价格与报价不一致时拒绝下单。
/// 返回预占后的库存快照，按商品 ID 升序。
pub fn reserve_lines(
    products: &HashMap<i64, Product>,
    lines: &[PricedLine],
) -> Result<Vec<StockLevel>> {
    let mut levels = Vec::with_capacity(lines.len());
    for line in lines {
        let product = products
            .get(&line.product_id)
            .ok_or(CommerceError::ProductNotFound(line.product_id))?;
        if product.status != ProductStatus::Active {
            return Err(CommerceError::ProductInactive(product.id));
        }
        if product.price_cents != line.unit_price_cents {
            return Err(CommerceError::Validation(format!(
                "商品 {} 价格已变动，请重新确认订单",
                product.name
            )));
        }

        let mut level = StockLevel::from(product);
        level.reserve(line.quantity)?;
        levels.push(level);
    }
    levels.sort_by_key(|l| l.product_id);
    Ok(levels)
}

/// 对一组库存快照应用变动
///
/// 任一变动失败即整体失败，调用方应丢弃快照并回滚事务
pub fn apply_movements(
    levels: &mut HashMap<i64, StockLevel>,
    movements: &[StockMovement],
) -> Result<()> {
    for movement in movements {
        let level = levels
            .get_mut(&movement.product_id)
            .ok_or(CommerceError::ProductNotFound(movement.product_id))?;
        level.apply(movement)?;
    }
    Ok(())
}
