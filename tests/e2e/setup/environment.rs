//! 测试环境管理
//!
//! 统一管理服务地址，并提供注册好的顾客与药房客户端。

use anyhow::{Result, bail};
use std::time::Duration;

use crate::data::{TestAccounts, test_address};
use crate::helpers::{AddressResponse, ApiClient, AuthResponse};

/// 测试环境配置
#[derive(Debug, Clone)]
pub struct TestEnvConfig {
    /// vetshop-api 地址
    pub api_url: String,
    /// 等待服务就绪的超时时间
    pub service_ready_timeout: Duration,
    /// 是否跳过服务健康检查
    pub skip_health_check: bool,
}

impl Default for TestEnvConfig {
    fn default() -> Self {
        Self {
            // 使用 127.0.0.1 而非 localhost，避免 IPv6 连接问题
            api_url: std::env::var("VETSHOP_API_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8080".into()),
            service_ready_timeout: Duration::from_secs(30),
            skip_health_check: std::env::var("SKIP_HEALTH_CHECK")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

/// 测试环境
pub struct TestEnvironment {
    pub config: TestEnvConfig,
    /// 匿名客户端
    pub api: ApiClient,
}

/// 已登录的参与方
pub struct Participant {
    pub auth: AuthResponse,
    pub api: ApiClient,
}

impl TestEnvironment {
    pub async fn setup() -> Result<Self> {
        Self::setup_with_config(TestEnvConfig::default()).await
    }

    pub async fn setup_with_config(config: TestEnvConfig) -> Result<Self> {
        let api = ApiClient::new(&config.api_url)?;
        let env = Self { config, api };

        if !env.config.skip_health_check {
            env.wait_for_service().await?;
        }
        Ok(env)
    }

    async fn wait_for_service(&self) -> Result<()> {
        let deadline = tokio::time::Instant::now() + self.config.service_ready_timeout;
        loop {
            if matches!(self.api.health().await, Ok(true)) {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                bail!("服务未就绪: {}", self.config.api_url);
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    }

    /// 注册新顾客并创建默认地址
    pub async fn new_customer(&self) -> Result<(Participant, AddressResponse)> {
        let auth = self.api.register_customer(&TestAccounts::customer()).await?;
        let api = self.api.with_token(&auth.token);
        let address = api.create_address(&test_address()).await?;
        Ok((Participant { auth, api }, address))
    }

    /// 注册新药房
    pub async fn new_pharmacy(&self) -> Result<Participant> {
        let auth = self.api.register_pharmacy(&TestAccounts::pharmacy()).await?;
        let api = self.api.with_token(&auth.token);
        Ok(Participant { auth, api })
    }
}
