//! 数据库连接管理模块
//!
//! 提供 PostgreSQL 连接池管理，支持健康检查、连接配置和 schema 迁移。

use crate::config::DatabaseConfig;
use crate::error::{Result, ShopError};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};

/// 数据库连接池包装
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 创建数据库连接池
    #[instrument(skip(config))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect(&config.url)
            .await?;

        info!("Database connection pool created");

        Ok(Self { pool })
    }

    /// 包装已有连接池（测试中使用 connect_lazy 创建的池）
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 获取连接池引用
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 健康检查
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(ShopError::from)
    }

    /// 关闭连接池
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database connection pool closed");
    }

    /// 执行工作区根目录 migrations/ 下的迁移
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations...");
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }
}

impl std::ops::Deref for Database {
    type Target = PgPool;

    fn deref(&self) -> &Self::Target {
        &self.pool
    }
}
