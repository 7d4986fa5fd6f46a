//! 交易域枚举类型定义
//!
//! 所有枚举都支持数据库（sqlx）和 JSON（serde）序列化

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 账户状态（顾客与药房共用）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    #[default]
    Active,
    /// 已禁用 - 不允许登录和下单
    Disabled,
}

/// 商品状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    /// 在售
    #[default]
    Active,
    /// 已下架 - 不可购买，历史订单仍可引用
    Inactive,
}

/// 商品分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductCategory {
    /// 药品
    Medicine,
    /// 处方粮与宠物食品
    Food,
    /// 营养补充剂
    Supplement,
    /// 清洁护理
    Hygiene,
    /// 用品配件
    Accessory,
    Other,
}

/// 订单状态
///
/// 状态流转：Pending -> Confirmed -> Shipped -> Delivered，
/// Pending / Confirmed 可取消。Delivered 与 Cancelled 为终态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// 待确认 - 已下单，库存已预占
    Pending,
    /// 已确认 - 药房接单
    Confirmed,
    /// 已发货
    Shipped,
    /// 已送达 - 扣减库存并发放积分
    Delivered,
    /// 已取消 - 释放预占库存
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Shipped => "SHIPPED",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 积分等级
///
/// 由订单可计积分金额所在的档位决定
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoyaltyTier {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl LoyaltyTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bronze => "BRONZE",
            Self::Silver => "SILVER",
            Self::Gold => "GOLD",
            Self::Platinum => "PLATINUM",
        }
    }
}

impl FromStr for LoyaltyTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BRONZE" => Ok(Self::Bronze),
            "SILVER" => Ok(Self::Silver),
            "GOLD" => Ok(Self::Gold),
            "PLATINUM" => Ok(Self::Platinum),
            other => Err(format!("未知的积分等级: {}", other)),
        }
    }
}

/// 积分账本变动类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerChangeType {
    /// 订单送达奖励（+积分，+折扣余额）
    OrderReward,
    /// 积分兑换奖励（-积分，+折扣余额）
    Redemption,
    /// 下单抵扣（-折扣余额）
    DiscountUsed,
    /// 订单取消退回抵扣（+折扣余额）
    DiscountRefund,
}

/// 操作者角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActorRole {
    Customer,
    Pharmacy,
}

impl ActorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "CUSTOMER",
            Self::Pharmacy => "PHARMACY",
        }
    }
}
