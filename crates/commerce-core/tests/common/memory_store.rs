//! 内存仓储实现
//!
//! 以单把互斥锁模拟事务：所有校验在副本上完成，成功后一次性写回。

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use sqlx::types::Json;

use commerce::error::{CommerceError, Result};
use commerce::models::{
    Actor, Address, LedgerChangeType, LoyaltyAccount, LoyaltyChange, LoyaltyLedgerEntry, Order,
    OrderDetail, OrderItem, OrderStatus, Product, ProductCategory, ProductStatus,
};
use commerce::order::{NewOrder, StockLevel, TransitionPlan, apply_movements, reserve_lines};
use commerce::repository::{
    AddressRepositoryTrait, LoyaltyRepositoryTrait, OrderRepositoryTrait, ProductRepositoryTrait,
};

#[derive(Default)]
struct State {
    products: HashMap<i64, Product>,
    addresses: HashMap<i64, Address>,
    orders: HashMap<i64, Order>,
    items: HashMap<i64, Vec<OrderItem>>,
    accounts: HashMap<i64, LoyaltyAccount>,
    ledger: Vec<LoyaltyLedgerEntry>,
    next_id: i64,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn account(&self, customer_id: i64) -> LoyaltyAccount {
        self.accounts
            .get(&customer_id)
            .cloned()
            .unwrap_or_else(|| LoyaltyAccount::empty(customer_id))
    }

    fn record(&mut self, change: &LoyaltyChange, after: LoyaltyAccount) {
        let id = self.next_id();
        self.ledger.push(LoyaltyLedgerEntry {
            id,
            customer_id: change.customer_id,
            change_type: change.change_type,
            points_delta: change.points_delta,
            discount_delta_cents: change.discount_delta_cents,
            points_balance_after: after.points_balance,
            discount_balance_after: after.discount_balance_cents,
            ref_id: change.ref_id.clone(),
            remark: change.remark.clone(),
            created_at: Utc::now(),
        });
        self.accounts.insert(after.customer_id, after);
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_product(&self, pharmacy_id: i64, price_cents: i64, stock: i32) -> i64 {
        let mut state = self.state.lock();
        let id = state.next_id();
        state.products.insert(
            id,
            Product {
                id,
                pharmacy_id,
                name: format!("product-{}", id),
                description: None,
                category: ProductCategory::Medicine,
                species: Some("dog".to_string()),
                price_cents,
                stock,
                reserved: 0,
                image_url: None,
                requires_prescription: false,
                status: ProductStatus::Active,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        );
        id
    }

    pub fn set_product_status(&self, product_id: i64, status: ProductStatus) {
        if let Some(product) = self.state.lock().products.get_mut(&product_id) {
            product.status = status;
        }
    }

    pub fn add_default_address(&self, customer_id: i64) -> i64 {
        let mut state = self.state.lock();
        let id = state.next_id();
        state.addresses.insert(
            id,
            Address {
                id,
                customer_id,
                label: Some("Home".to_string()),
                recipient: format!("customer-{}", customer_id),
                phone: "555-0100".to_string(),
                line1: "1 Main St".to_string(),
                line2: None,
                city: "Springfield".to_string(),
                postal_code: None,
                is_default: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        );
        id
    }

    pub fn set_discount_balance(&self, customer_id: i64, cents: i64) {
        let mut state = self.state.lock();
        let mut account = state.account(customer_id);
        account.discount_balance_cents = cents;
        state.accounts.insert(customer_id, account);
    }

    pub fn set_points_balance(&self, customer_id: i64, points: i64) {
        let mut state = self.state.lock();
        let mut account = state.account(customer_id);
        account.points_balance = points;
        state.accounts.insert(customer_id, account);
    }

    pub fn stock_level(&self, product_id: i64) -> StockLevel {
        let state = self.state.lock();
        state
            .products
            .get(&product_id)
            .map(StockLevel::from)
            .unwrap_or_else(|| StockLevel::new(product_id, 0, 0))
    }

    pub fn account(&self, customer_id: i64) -> LoyaltyAccount {
        self.state.lock().account(customer_id)
    }

    /// 所有商品都满足 0 <= reserved <= stock
    pub fn reservation_bounds_hold(&self) -> bool {
        self.state
            .lock()
            .products
            .values()
            .all(|p| p.reserved >= 0 && p.reserved <= p.stock)
    }

    /// 所有未终结订单的预占数量之和
    pub fn open_reservations(&self, product_id: i64) -> i32 {
        let state = self.state.lock();
        state
            .orders
            .values()
            .filter(|o| !o.status.is_terminal())
            .flat_map(|o| state.items.get(&o.id).into_iter().flatten())
            .filter(|i| i.product_id == product_id)
            .map(|i| i.quantity)
            .sum()
    }
}

#[async_trait]
impl ProductRepositoryTrait for MemoryStore {
    async fn get_product(&self, id: i64) -> Result<Option<Product>> {
        Ok(self.state.lock().products.get(&id).cloned())
    }

    async fn get_products_by_ids(&self, ids: &[i64]) -> Result<Vec<Product>> {
        let state = self.state.lock();
        Ok(ids
            .iter()
            .filter_map(|id| state.products.get(id).cloned())
            .collect())
    }
}

#[async_trait]
impl AddressRepositoryTrait for MemoryStore {
    async fn get_address(&self, customer_id: i64, address_id: i64) -> Result<Option<Address>> {
        Ok(self
            .state
            .lock()
            .addresses
            .get(&address_id)
            .filter(|a| a.customer_id == customer_id)
            .cloned())
    }

    async fn get_default_address(&self, customer_id: i64) -> Result<Option<Address>> {
        Ok(self
            .state
            .lock()
            .addresses
            .values()
            .find(|a| a.customer_id == customer_id && a.is_default)
            .cloned())
    }
}

#[async_trait]
impl OrderRepositoryTrait for MemoryStore {
    async fn get_order(&self, id: i64) -> Result<Option<Order>> {
        Ok(self.state.lock().orders.get(&id).cloned())
    }

    async fn get_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>> {
        Ok(self
            .state
            .lock()
            .items
            .get(&order_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn find_by_idempotency_key(
        &self,
        customer_id: i64,
        key: &str,
    ) -> Result<Option<Order>> {
        Ok(self
            .state
            .lock()
            .orders
            .values()
            .find(|o| o.customer_id == customer_id && o.idempotency_key.as_deref() == Some(key))
            .cloned())
    }

    async fn create_order(&self, new_order: &NewOrder) -> Result<OrderDetail> {
        let mut state = self.state.lock();
        let quote = &new_order.quote;

        let levels = reserve_lines(&state.products, &quote.lines)?;

        let discount_change = (quote.discount_cents > 0).then(|| LoyaltyChange {
            customer_id: new_order.customer_id,
            change_type: LedgerChangeType::DiscountUsed,
            points_delta: 0,
            discount_delta_cents: -quote.discount_cents,
            spend_cents: 0,
            ref_id: Some(new_order.order_no.clone()),
            remark: None,
        });
        let account_after = match &discount_change {
            Some(change) => Some(state.account(new_order.customer_id).try_apply(change)?),
            None => None,
        };

        // 校验全部通过后写回
        for level in levels {
            if let Some(product) = state.products.get_mut(&level.product_id) {
                product.stock = level.stock;
                product.reserved = level.reserved;
            }
        }
        if let (Some(change), Some(after)) = (discount_change, account_after) {
            state.record(&change, after);
        }

        let order_id = state.next_id();
        let now = Utc::now();
        let order = Order {
            id: order_id,
            order_no: new_order.order_no.clone(),
            customer_id: new_order.customer_id,
            pharmacy_id: quote.pharmacy_id,
            shipping_address: Json(new_order.shipping_address.clone()),
            status: OrderStatus::Pending,
            subtotal_cents: quote.subtotal_cents,
            discount_cents: quote.discount_cents,
            shipping_cents: quote.shipping_cents,
            total_cents: quote.total_cents,
            eligible_cents: quote.eligible_cents,
            loyalty_tier: quote.loyalty.tier,
            points_preview: quote.loyalty.points,
            points_awarded: 0,
            discount_accrued_cents: 0,
            note: new_order.note.clone(),
            cancel_reason: None,
            idempotency_key: new_order.idempotency_key.clone(),
            created_at: now,
            updated_at: now,
            delivered_at: None,
            cancelled_at: None,
        };

        let mut items = Vec::with_capacity(quote.lines.len());
        for line in &quote.lines {
            let id = state.next_id();
            items.push(OrderItem {
                id,
                order_id,
                product_id: line.product_id,
                product_name: line.product_name.clone(),
                unit_price_cents: line.unit_price_cents,
                quantity: line.quantity,
                line_total_cents: line.line_total_cents,
            });
        }

        state.orders.insert(order_id, order.clone());
        state.items.insert(order_id, items.clone());
        Ok(OrderDetail { order, items })
    }

    async fn apply_transition(
        &self,
        plan: &TransitionPlan,
        _actor: Actor,
        reason: Option<String>,
    ) -> Result<Order> {
        let mut state = self.state.lock();

        let mut order = state
            .orders
            .get(&plan.order_id)
            .cloned()
            .ok_or(CommerceError::OrderNotFound(plan.order_id))?;
        if order.status != plan.from {
            return Err(CommerceError::ConcurrencyConflict);
        }

        let mut levels: HashMap<i64, StockLevel> = plan
            .movements
            .iter()
            .filter_map(|m| state.products.get(&m.product_id))
            .map(|p| (p.id, StockLevel::from(p)))
            .collect();
        apply_movements(&mut levels, &plan.movements)?;

        let loyalty = match plan.loyalty_change.as_ref().filter(|c| !c.is_noop()) {
            Some(change) => Some((
                change.clone(),
                state.account(change.customer_id).try_apply(change)?,
            )),
            None => None,
        };

        for level in levels.into_values() {
            if let Some(product) = state.products.get_mut(&level.product_id) {
                product.stock = level.stock;
                product.reserved = level.reserved;
            }
        }
        if let Some((change, after)) = loyalty {
            state.record(&change, after);
        }

        let now = Utc::now();
        order.status = plan.to;
        order.updated_at = now;
        match plan.to {
            OrderStatus::Delivered => order.delivered_at = Some(now),
            OrderStatus::Cancelled => {
                order.cancelled_at = Some(now);
                order.cancel_reason = reason;
            }
            _ => {}
        }
        if let Some(award) = plan.award {
            order.points_awarded = award.points;
            order.discount_accrued_cents = award.discount_cents;
        }

        state.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn list_by_customer(
        &self,
        customer_id: i64,
        status: Option<OrderStatus>,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<Order>, i64)> {
        Ok(self.list(|o| o.customer_id == customer_id, status, page, page_size))
    }

    async fn list_by_pharmacy(
        &self,
        pharmacy_id: i64,
        status: Option<OrderStatus>,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<Order>, i64)> {
        Ok(self.list(|o| o.pharmacy_id == pharmacy_id, status, page, page_size))
    }
}

impl MemoryStore {
    fn list(
        &self,
        owner: impl Fn(&Order) -> bool,
        status: Option<OrderStatus>,
        page: i64,
        page_size: i64,
    ) -> (Vec<Order>, i64) {
        let state = self.state.lock();
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| owner(o) && status.is_none_or(|s| o.status == s))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.id.cmp(&a.id));

        let total = orders.len() as i64;
        let skip = ((page.max(1) - 1) * page_size) as usize;
        let items = orders.into_iter().skip(skip).take(page_size as usize).collect();
        (items, total)
    }
}

#[async_trait]
impl LoyaltyRepositoryTrait for MemoryStore {
    async fn get_account(&self, customer_id: i64) -> Result<Option<LoyaltyAccount>> {
        Ok(self.state.lock().accounts.get(&customer_id).cloned())
    }

    async fn apply_change(&self, change: &LoyaltyChange) -> Result<LoyaltyAccount> {
        let mut state = self.state.lock();
        let after = state.account(change.customer_id).try_apply(change)?;
        state.record(change, after.clone());
        Ok(after)
    }

    async fn list_ledger(&self, customer_id: i64, limit: i64) -> Result<Vec<LoyaltyLedgerEntry>> {
        let state = self.state.lock();
        Ok(state
            .ledger
            .iter()
            .rev()
            .filter(|e| e.customer_id == customer_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
