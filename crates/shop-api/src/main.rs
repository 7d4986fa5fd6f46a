//! VetShop API 服务入口

use std::sync::Arc;

use anyhow::Context;
use commerce::LoyaltyRules;
use tokio::net::TcpListener;
use tracing::{info, warn};
use vetshop_api::{AppState, auth::JwtConfig, build_router, cors_layer};
use vetshop_shared::{cache::Cache, config::AppConfig, database::Database, observability};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load("vetshop-api").context("加载配置失败")?;

    let obs_config = config
        .observability
        .clone()
        .with_service_name(&config.service_name);
    let _guard = observability::init(&obs_config).await?;

    info!(
        environment = %config.environment,
        "Starting vetshop-api on {}",
        config.server_addr()
    );

    let db = Database::connect(&config.database).await?;
    if config.database.run_migrations {
        db.run_migrations().await?;
    }
    let cache = Arc::new(Cache::new(&config.redis)?);

    // 生产环境必须显式配置 JWT 密钥
    let defaults = JwtConfig::default();
    let secret = match config.auth.jwt_secret.clone() {
        Some(secret) if !secret.trim().is_empty() => secret,
        _ if config.is_production() => {
            anyhow::bail!("VETSHOP_AUTH__JWT_SECRET must be set in production");
        }
        _ => {
            warn!("Using default JWT secret - set VETSHOP_AUTH__JWT_SECRET for production");
            defaults.secret
        }
    };
    let jwt_config = JwtConfig {
        secret,
        expires_in_secs: config.auth.jwt_expires_secs,
        issuer: config.auth.jwt_issuer.clone(),
    };

    let rules = Arc::new(LoyaltyRules::from_config(&config.loyalty).context("积分规则配置无效")?);
    info!(
        tiers = rules.tiers().len(),
        threshold = rules.redemption_threshold_points(),
        "Loyalty rules loaded"
    );

    let state = AppState::new(
        db.pool().clone(),
        cache,
        jwt_config,
        rules,
        config.shop.clone(),
    );

    if config.is_production() && config.server.cors_origins.trim() == "*" {
        warn!("cors_origins=\"*\" 在生产环境中不安全，请设置为具体域名");
    }
    let app = build_router(state, cors_layer(&config.server.cors_origins));

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");

    Ok(())
}

/// 监听关闭信号（Ctrl+C 或 SIGTERM）
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "注册 Ctrl+C 处理器失败");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "注册 SIGTERM 处理器失败");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
