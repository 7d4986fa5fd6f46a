//! 统一可观测性模块
//!
//! 提供 metrics、logging 的统一初始化和管理。
//! 所有服务通过单一入口点配置可观测性，确保一致的指标命名。

pub mod metrics;
pub mod middleware;
pub mod tracing;

use ::tracing::info;
use anyhow::Result;

pub use crate::config::ObservabilityConfig;

/// 可观测性资源守卫
///
/// 持有指标服务器的生命周期，drop 时记录关闭日志。
pub struct ObservabilityGuard {
    _metrics_handle: Option<metrics::MetricsHandle>,
}

impl ObservabilityGuard {
    /// 创建一个空的 Guard（用于测试或禁用可观测性时）
    pub fn empty() -> Self {
        Self {
            _metrics_handle: None,
        }
    }
}

impl Drop for ObservabilityGuard {
    fn drop(&mut self) {
        info!("Shutting down observability...");
    }
}

/// 统一初始化可观测性
///
/// 初始化顺序：
/// 1. 日志（tracing-subscriber）
/// 2. Prometheus 指标（若启用）
///
/// # Example
///
/// ```ignore
/// use vetshop_shared::{config::AppConfig, observability};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = AppConfig::load("vetshop-api")?;
///     let obs = config.observability.clone().with_service_name(&config.service_name);
///     let _guard = observability::init(&obs).await?;
///     Ok(())
/// }
/// ```
pub async fn init(config: &ObservabilityConfig) -> Result<ObservabilityGuard> {
    tracing::init(config)?;

    info!(
        service = %config.service_name,
        metrics_enabled = config.metrics_enabled,
        metrics_port = config.metrics_port,
        "Observability initialized"
    );

    let metrics_handle = if config.metrics_enabled {
        Some(metrics::init(config).await?)
    } else {
        None
    };

    Ok(ObservabilityGuard {
        _metrics_handle: metrics_handle,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.metrics_port, 9090);
        assert_eq!(config.log_level, "info");
        assert!(!config.json_logs);
    }

    #[test]
    fn test_with_service_name() {
        let config = ObservabilityConfig::default().with_service_name("vetshop-api");
        assert_eq!(config.service_name, "vetshop-api");
    }
}
