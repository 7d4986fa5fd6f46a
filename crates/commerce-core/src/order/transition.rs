//! 订单状态流转
//!
//! 校验状态边与操作者权限，并生成流转的副作用计划（库存变动和积分变动）。
//! 计划由仓储层在同一事务内原子执行。

use serde::{Deserialize, Serialize};

use super::stock::{MovementKind, StockMovement};
use crate::error::{CommerceError, Result};
use crate::loyalty::{LoyaltyAward, LoyaltyRules};
use crate::models::{
    Actor, ActorRole, LedgerChangeType, LoyaltyChange, Order, OrderItem, OrderStatus,
};

/// 状态边是否合法
pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;
    matches!(
        (from, to),
        (Pending, Confirmed)
            | (Confirmed, Shipped)
            | (Shipped, Delivered)
            | (Pending, Cancelled)
            | (Confirmed, Cancelled)
    )
}

/// 校验操作者是否可执行该流转
///
/// 药房可执行全部合法边；顾客只能在待确认时取消自己的订单
pub fn authorize(actor: &Actor, order: &Order, to: OrderStatus) -> Result<()> {
    match actor.role {
        ActorRole::Pharmacy if order.pharmacy_id == actor.id => Ok(()),
        ActorRole::Customer if order.customer_id == actor.id => {
            if to != OrderStatus::Cancelled {
                return Err(CommerceError::Forbidden(
                    "顾客只能取消订单".to_string(),
                ));
            }
            if order.status != OrderStatus::Pending {
                return Err(CommerceError::Forbidden(
                    "订单已被药房确认，请联系药房取消".to_string(),
                ));
            }
            Ok(())
        }
        _ => Err(CommerceError::Forbidden(format!(
            "无权操作订单 {}",
            order.order_no
        ))),
    }
}

/// 流转计划
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionPlan {
    pub order_id: i64,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub movements: Vec<StockMovement>,
    /// 送达时的积分奖励
    pub award: Option<LoyaltyAward>,
    /// 需要入账的积分账户变动
    pub loyalty_change: Option<LoyaltyChange>,
}

impl TransitionPlan {
    pub fn has_side_effects(&self) -> bool {
        !self.movements.is_empty() || self.loyalty_change.is_some()
    }
}

/// 生成流转计划
pub fn plan_transition(
    order: &Order,
    items: &[OrderItem],
    to: OrderStatus,
    rules: &LoyaltyRules,
) -> Result<TransitionPlan> {
    let from = order.status;
    if !can_transition(from, to) {
        return Err(CommerceError::InvalidTransition { from, to });
    }

    let movements_of = |kind: MovementKind| {
        items
            .iter()
            .map(|item| StockMovement {
                product_id: item.product_id,
                quantity: item.quantity,
                kind,
            })
            .collect::<Vec<_>>()
    };

    let mut plan = TransitionPlan {
        order_id: order.id,
        from,
        to,
        movements: Vec::new(),
        award: None,
        loyalty_change: None,
    };

    match to {
        OrderStatus::Delivered => {
            let award = rules.evaluate(order.eligible_cents);
            plan.movements = movements_of(MovementKind::Commit);
            plan.loyalty_change = Some(LoyaltyChange {
                customer_id: order.customer_id,
                change_type: LedgerChangeType::OrderReward,
                points_delta: award.points,
                discount_delta_cents: award.discount_cents,
                spend_cents: award.eligible_cents,
                ref_id: Some(order.order_no.clone()),
                remark: Some(format!("订单送达奖励 ({})", award.tier.as_str())),
            });
            plan.award = Some(award);
        }
        OrderStatus::Cancelled => {
            plan.movements = movements_of(MovementKind::Release);
            if order.discount_cents > 0 {
                plan.loyalty_change = Some(LoyaltyChange {
                    customer_id: order.customer_id,
                    change_type: LedgerChangeType::DiscountRefund,
                    points_delta: 0,
                    discount_delta_cents: order.discount_cents,
                    spend_cents: 0,
                    ref_id: Some(order.order_no.clone()),
                    remark: Some("订单取消退回折扣".to_string()),
                });
            }
        }
        _ => {}
    }

    Ok(plan)
}
