//! Redis 缓存管理模块
//!
//! 提供 Redis 连接管理和常用缓存操作封装。

use crate::config::RedisConfig;
use crate::error::{Result, ShopError};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::{info, instrument};

/// Redis 缓存客户端
#[derive(Clone)]
pub struct Cache {
    client: Client,
}

impl Cache {
    /// 创建 Redis 客户端（连接延迟到首次使用时建立）
    pub fn new(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())?;
        info!("Redis client created");
        Ok(Self { client })
    }

    async fn get_conn(&self) -> Result<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(ShopError::from)
    }

    /// 健康检查
    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.get_conn().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(ShopError::from)
    }

    /// 获取值
    #[instrument(skip(self))]
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.get_conn().await?;
        let value: Option<String> = conn.get(key).await?;

        match value {
            Some(v) => Ok(Some(serde_json::from_str(&v)?)),
            None => Ok(None),
        }
    }

    /// 设置值
    #[instrument(skip(self, value))]
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let mut conn = self.get_conn().await?;
        let serialized = serde_json::to_string(value)?;

        let _: () = conn.set_ex(key, serialized, ttl.as_secs()).await?;
        Ok(())
    }

    /// 删除值
    #[instrument(skip(self))]
    pub async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.get_conn().await?;
        let _: () = conn.del(key).await?;
        Ok(())
    }

    /// 原子性地仅在 key 不存在时设置值，并指定 TTL
    ///
    /// 基于 Redis SET NX EX 实现，用于防止重复提交。
    /// 返回 true 表示设置成功（key 不存在），false 表示 key 已存在。
    pub async fn set_nx<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<bool> {
        let mut conn = self.get_conn().await?;
        let serialized = serde_json::to_string(value)?;

        let result: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(serialized)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs())
            .query_async(&mut conn)
            .await?;

        Ok(result.is_some())
    }
}

/// 缓存键生成器
pub struct CacheKey;

impl CacheKey {
    pub fn product_detail(product_id: i64) -> String {
        format!("product:detail:{}", product_id)
    }

    pub fn pharmacy_detail(pharmacy_id: i64) -> String {
        format!("pharmacy:detail:{}", pharmacy_id)
    }

    pub fn checkout_lock(customer_id: i64) -> String {
        format!("cart:checkout:lock:{}", customer_id)
    }
}
