pub mod memory_store;

use std::sync::Arc;

use commerce::{LoyaltyRules, LoyaltyService, OrderService};
use vetshop_shared::config::ShopConfig;

pub use memory_store::MemoryStore;

pub type MemoryOrderService = OrderService<MemoryStore, MemoryStore, MemoryStore, MemoryStore>;

pub fn services(store: &Arc<MemoryStore>) -> (MemoryOrderService, LoyaltyService<MemoryStore>) {
    let rules = Arc::new(LoyaltyRules::default());
    let orders = OrderService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        rules.clone(),
        ShopConfig::default(),
    );
    let loyalty = LoyaltyService::new(store.clone(), rules);
    (orders, loyalty)
}
