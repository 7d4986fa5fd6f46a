//! 日志初始化
//!
//! 基于 tracing-subscriber 构建日志层，支持 JSON 结构化与人类可读两种输出。

use anyhow::Result;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use super::ObservabilityConfig;

/// 构建环境过滤器
///
/// RUST_LOG 优先，其次使用配置中的 log_level，二者都无效时回退到 info
pub fn build_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// 初始化全局日志订阅者
pub fn init(config: &ObservabilityConfig) -> Result<()> {
    let env_filter = build_filter(&config.log_level);

    let fmt_layer = if config.json_logs {
        fmt::layer()
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
