//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::ObservabilityConfig;

/// 全局 Prometheus handle，用于渲染指标
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics 资源守卫
pub struct MetricsHandle {
    _server_handle: tokio::task::JoinHandle<()>,
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 端点。
pub async fn init(config: &ObservabilityConfig) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROMETHEUS_HANDLE.set(handle.clone());

    register_common_metrics(&config.service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle {
        _server_handle: server_handle,
    })
}

/// 注册通用指标描述（出现在 /metrics 的 HELP 注释中）
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!("http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    metrics::describe_counter!("orders_created_total", "Total number of order submissions");
    metrics::describe_counter!(
        "order_transitions_total",
        "Total number of order status transitions"
    );
    metrics::describe_counter!(
        "stock_reservation_failures_total",
        "Order submissions rejected for insufficient stock"
    );
    metrics::describe_counter!(
        "loyalty_points_awarded_total",
        "Loyalty points credited on delivered orders"
    );
    metrics::describe_counter!(
        "loyalty_redemptions_total",
        "Total number of loyalty reward redemptions"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(server_handle)
}

/// 获取全局 Prometheus handle
pub fn get_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

// ============================================================================
// 指标记录函数
// ============================================================================

/// 记录 HTTP 请求
#[inline]
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str.clone()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str
    )
    .record(duration_secs);
}

/// 记录订单提交结果
#[inline]
pub fn record_order_created(status: &str) {
    metrics::counter!("orders_created_total", "status" => status.to_string()).increment(1);
}

/// 记录订单状态流转
#[inline]
pub fn record_order_transition(from: &str, to: &str) {
    metrics::counter!(
        "order_transitions_total",
        "from" => from.to_string(),
        "to" => to.to_string()
    )
    .increment(1);
}

/// 记录库存预占失败
#[inline]
pub fn record_stock_reservation_failure(product_id: i64) {
    metrics::counter!(
        "stock_reservation_failures_total",
        "product_id" => product_id.to_string()
    )
    .increment(1);
}

/// 记录发放的积分
#[inline]
pub fn record_points_awarded(tier: &str, points: i64) {
    if points <= 0 {
        return;
    }
    metrics::counter!("loyalty_points_awarded_total", "tier" => tier.to_string())
        .increment(points as u64);
}

/// 记录积分兑换
#[inline]
pub fn record_redemption(status: &str) {
    metrics::counter!("loyalty_redemptions_total", "status" => status.to_string()).increment(1);
}
