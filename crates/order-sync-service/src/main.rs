//! 订单状态对账服务入口
//!
//! 加载配置 → 初始化可观测性 → 创建外部客户端与分发器 → 启动 Kafka 消费循环，
//! 收到 Ctrl+C / SIGTERM 后等待当前消息处理完毕再退出。

use anyhow::Result;
use order_sync_shared::{config::AppConfig, observability};
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};

use order_sync_service::{
    clients::Collaborators, consumer::OrderEventConsumer, dispatcher::EventDispatcher,
};

const SERVICE_NAME: &str = "order-sync-service";

#[tokio::main]
async fn main() -> Result<()> {
    // 本地开发时从 .env 注入 ORDER_SYNC_* 环境变量，文件不存在不算错误
    let dotenv = dotenvy::dotenv();

    let config = AppConfig::load(SERVICE_NAME)?;
    let _guard = observability::init(&config.service_name, &config.observability).await?;

    if let Ok(path) = dotenv {
        info!(path = %path.display(), "已加载 .env");
    }
    info!(
        environment = %config.environment,
        topic = %config.kafka.order_status_topic,
        contract_edit_enabled = config.reconciliation.contract_edit_enabled,
        "Starting order-sync-service..."
    );

    let collaborators = Collaborators::from_config(&config)?;
    let dispatcher = EventDispatcher::from_config(collaborators, &config);
    let consumer = OrderEventConsumer::new(&config.kafka, dispatcher)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    // 消费循环在主任务上运行，收到关闭信号后处理完当前消息即返回
    consumer.run(shutdown_rx).await?;

    info!("Service shutdown complete");
    Ok(())
}

/// 优雅关闭信号处理
///
/// 监听 Ctrl+C 和 SIGTERM 信号，用于 Kubernetes 优雅关闭
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        }
    }
}
