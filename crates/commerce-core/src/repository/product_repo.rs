//! 商品仓储
//!
//! 商品读取与库存更新，库存写入只在事务内进行

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};

use super::traits::ProductRepositoryTrait;
use crate::error::Result;
use crate::models::Product;
use crate::order::StockLevel;

pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 在事务中锁定商品行
    ///
    /// 按 ID 升序加锁，避免并发下单时死锁
    pub async fn lock_products_in_tx(tx: &mut PgConnection, ids: &[i64]) -> Result<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, pharmacy_id, name, description, category, species, price_cents,
                   stock, reserved, image_url, requires_prescription, status,
                   created_at, updated_at
            FROM products
            WHERE id = ANY($1)
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(ids)
        .fetch_all(tx)
        .await?;

        Ok(products)
    }

    /// 在事务中写回库存快照
    pub async fn save_stock_levels_in_tx(tx: &mut PgConnection, levels: &[StockLevel]) -> Result<()> {
        for level in levels {
            sqlx::query(
                r#"
                UPDATE products
                SET stock = $2, reserved = $3, updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(level.product_id)
            .bind(level.stock)
            .bind(level.reserved)
            .execute(&mut *tx)
            .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl ProductRepositoryTrait for ProductRepository {
    async fn get_product(&self, id: i64) -> Result<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, pharmacy_id, name, description, category, species, price_cents,
                   stock, reserved, image_url, requires_prescription, status,
                   created_at, updated_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    async fn get_products_by_ids(&self, ids: &[i64]) -> Result<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, pharmacy_id, name, description, category, species, price_cents,
                   stock, reserved, image_url, requires_prescription, status,
                   created_at, updated_at
            FROM products
            WHERE id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }
}
