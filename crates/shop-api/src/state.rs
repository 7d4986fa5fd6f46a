//! 应用状态定义

use std::sync::Arc;

use commerce::repository::{
    AddressRepository, LoyaltyRepository, OrderRepository, ProductRepository,
};
use commerce::{LoyaltyRules, LoyaltyService, OrderService, PgLoyaltyService, PgOrderService};
use sqlx::PgPool;
use vetshop_shared::cache::Cache;
use vetshop_shared::config::ShopConfig;

use crate::auth::{JwtConfig, JwtManager};

/// Axum 应用共享状态
///
/// 服务对象通过 Arc 在 handler 间共享，克隆开销只是引用计数
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub cache: Arc<Cache>,
    pub jwt_manager: Arc<JwtManager>,
    pub orders: Arc<PgOrderService>,
    pub loyalty: Arc<PgLoyaltyService>,
    pub shop: ShopConfig,
}

impl AppState {
    /// 用同一个连接池装配全部仓储和服务
    pub fn new(
        pool: PgPool,
        cache: Arc<Cache>,
        jwt_config: JwtConfig,
        rules: Arc<LoyaltyRules>,
        shop: ShopConfig,
    ) -> Self {
        let loyalty_repo = Arc::new(LoyaltyRepository::new(pool.clone()));

        let orders = OrderService::new(
            Arc::new(OrderRepository::new(pool.clone())),
            Arc::new(ProductRepository::new(pool.clone())),
            Arc::new(AddressRepository::new(pool.clone())),
            loyalty_repo.clone(),
            rules.clone(),
            shop.clone(),
        );
        let loyalty = LoyaltyService::new(loyalty_repo, rules);

        Self {
            pool,
            cache,
            jwt_manager: Arc::new(JwtManager::new(jwt_config)),
            orders: Arc::new(orders),
            loyalty: Arc::new(loyalty),
            shop,
        }
    }
}
