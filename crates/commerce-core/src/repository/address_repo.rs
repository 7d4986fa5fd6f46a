//! 收货地址仓储

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::AddressRepositoryTrait;
use crate::error::Result;
use crate::models::Address;

pub struct AddressRepository {
    pool: PgPool,
}

impl AddressRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AddressRepositoryTrait for AddressRepository {
    /// 按顾客查询地址，他人的地址视为不存在
    async fn get_address(&self, customer_id: i64, address_id: i64) -> Result<Option<Address>> {
        let address = sqlx::query_as::<_, Address>(
            r#"
            SELECT id, customer_id, label, recipient, phone, line1, line2, city,
                   postal_code, is_default, created_at, updated_at
            FROM addresses
            WHERE id = $1 AND customer_id = $2
            "#,
        )
        .bind(address_id)
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(address)
    }

    async fn get_default_address(&self, customer_id: i64) -> Result<Option<Address>> {
        let address = sqlx::query_as::<_, Address>(
            r#"
            SELECT id, customer_id, label, recipient, phone, line1, line2, city,
                   postal_code, is_default, created_at, updated_at
            FROM addresses
            WHERE customer_id = $1 AND is_default
            "#,
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(address)
    }
}
