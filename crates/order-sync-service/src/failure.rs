//! 失败记录
//!
//! 处理器调用外部系统失败时，尽力向主数据写入一条失败记录供人工排查，
//! 写入本身失败只记日志。无论写入结果如何，原始错误都会原样返回给分发器。

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use order_sync_shared::config::FailureLogConfig;
use order_sync_shared::events::OrderEvent;
use order_sync_shared::observability::metrics;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{error, info};

use crate::clients::DocumentStore;
use crate::error::ReconcileError;

/// 出错的业务功能
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureFeature {
    FirstPayment,
    Recurrence,
    Upgrade,
}

impl FailureFeature {
    /// 写入失败记录 `funcionalidade` 字段的名称
    pub fn label(&self) -> &'static str {
        match self {
            Self::FirstPayment => "Primeira compra",
            Self::Recurrence => "Recorrência",
            Self::Upgrade => "Upgrade",
        }
    }
}

/// 失败记录
#[derive(Debug, Clone, PartialEq)]
pub struct FailureRecord {
    pub moment_utc: DateTime<Utc>,
    pub feature: FailureFeature,
    pub order_number: String,
    /// 金额（元），升级场景没有金额
    pub value_major: Option<f64>,
    pub error_message: String,
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    #[serde(rename = "NumeroPedido")]
    order_number: &'a str,
    #[serde(rename = "Valor", skip_serializing_if = "Option::is_none")]
    value: Option<String>,
    erro: &'a str,
}

impl FailureRecord {
    pub fn new(
        feature: FailureFeature,
        event: &OrderEvent,
        value_major: Option<f64>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            moment_utc: Utc::now(),
            feature,
            order_number: event.order_id.clone(),
            value_major,
            error_message: error_message.into(),
        }
    }

    /// 转换为主数据文档字段
    ///
    /// `momento` 为按 `utc_offset_hours` 平移后的时间，仍以 `Z` 结尾；
    /// `erro` 为 `{NumeroPedido, Valor, erro}` 的 JSON 字符串，金额以字符串表示。
    pub fn to_document_fields(&self, utc_offset_hours: i64) -> Value {
        let moment = self.moment_utc + Duration::hours(utc_offset_hours);
        let detail = ErrorDetail {
            order_number: &self.order_number,
            value: self.value_major.map(|v| v.to_string()),
            erro: &self.error_message,
        };
        let detail = serde_json::to_string(&detail).unwrap_or_else(|_| self.error_message.clone());

        json!({
            "momento": moment.to_rfc3339_opts(SecondsFormat::Millis, true),
            "funcionalidade": self.feature.label(),
            "erro": detail,
        })
    }
}

/// 失败记录的写入结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureLogStatus {
    Persisted,
    PersistFailed(String),
}

/// 处理结果及其附带的失败记录写入结果
///
/// 处理成功时 `failure_log` 为 None；处理失败时一定尝试过写入。
#[derive(Debug)]
pub struct Audited<T> {
    pub outcome: Result<T, ReconcileError>,
    pub failure_log: Option<FailureLogStatus>,
}

impl<T> Audited<T> {
    /// 丢弃写入结果，返回原始处理结果
    pub fn into_result(self) -> Result<T, ReconcileError> {
        self.outcome
    }
}

/// 失败记录器
#[derive(Clone)]
pub struct FailureRecorder {
    documents: Arc<dyn DocumentStore>,
    config: FailureLogConfig,
}

impl FailureRecorder {
    pub fn new(documents: Arc<dyn DocumentStore>, config: FailureLogConfig) -> Self {
        Self { documents, config }
    }

    /// 写入一条失败记录，不返回错误
    pub async fn record(
        &self,
        feature: FailureFeature,
        event: &OrderEvent,
        value_major: Option<f64>,
        err: &ReconcileError,
    ) -> FailureLogStatus {
        let record = FailureRecord::new(feature, event, value_major, err.to_string());
        let fields = record.to_document_fields(self.config.utc_offset_hours);

        match self
            .documents
            .create_document(&self.config.entity, fields)
            .await
        {
            Ok(_) => {
                info!(
                    order_id = %event.order_id,
                    feature = feature.label(),
                    entity = %self.config.entity,
                    "失败记录已写入"
                );
                metrics::record_failure_log("persisted");
                FailureLogStatus::Persisted
            }
            Err(save_err) => {
                error!(
                    order_id = %event.order_id,
                    original_error = %err,
                    save_error = %save_err,
                    "失败记录写入失败"
                );
                metrics::record_failure_log("failed");
                FailureLogStatus::PersistFailed(save_err.to_string())
            }
        }
    }

    /// 执行一段处理流程，任何错误返回前都会先写入失败记录
    pub async fn audit<T, Fut>(
        &self,
        feature: FailureFeature,
        event: &OrderEvent,
        value_major: Option<f64>,
        work: Fut,
    ) -> Audited<T>
    where
        Fut: Future<Output = Result<T, ReconcileError>>,
    {
        match work.await {
            Ok(value) => Audited {
                outcome: Ok(value),
                failure_log: None,
            },
            Err(err) => {
                let status = self.record(feature, event, value_major, &err).await;
                Audited {
                    outcome: Err(err),
                    failure_log: Some(status),
                }
            }
        }
    }
}
