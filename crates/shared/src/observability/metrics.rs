//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Metrics 资源守卫
pub struct MetricsHandle {
    _server_handle: tokio::task::JoinHandle<()>,
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 与 `/health` 端点。
pub async fn init(service_name: &str, port: u16) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    register_common_metrics(service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle {
        _server_handle: server_handle,
    })
}

/// 注册通用指标描述，出现在 /metrics 端点的 HELP 注释中
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!(
        "order_events_total",
        "Total number of order status events by status and dispatch outcome"
    );
    metrics::describe_counter!(
        "reconciliations_total",
        "Total number of reconciliation runs by scenario and result"
    );
    metrics::describe_histogram!(
        "reconciliation_duration_seconds",
        "Reconciliation duration in seconds"
    );
    metrics::describe_counter!(
        "failure_records_total",
        "Total number of failure record writes by result"
    );
    metrics::describe_counter!(
        "subscription_mutations_total",
        "Total number of subscription item mutations by kind"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

/// 启动指标 HTTP 服务器
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

// ============================================================================
// 指标记录函数
// ============================================================================

/// 记录一条订单状态事件的分发结果
#[inline]
pub fn record_order_event(status: &str, outcome: &str) {
    metrics::counter!(
        "order_events_total",
        "status" => status.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// 记录一次对账执行
#[inline]
pub fn record_reconciliation(scenario: &str, result: &str, duration_secs: f64) {
    metrics::counter!(
        "reconciliations_total",
        "scenario" => scenario.to_string(),
        "result" => result.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "reconciliation_duration_seconds",
        "scenario" => scenario.to_string()
    )
    .record(duration_secs);
}

/// 记录失败记录的写入结果
#[inline]
pub fn record_failure_log(result: &str) {
    metrics::counter!("failure_records_total", "result" => result.to_string()).increment(1);
}

/// 记录订阅项变更调用
#[inline]
pub fn record_subscription_mutation(kind: &str) {
    metrics::counter!("subscription_mutations_total", "kind" => kind.to_string()).increment(1);
}
