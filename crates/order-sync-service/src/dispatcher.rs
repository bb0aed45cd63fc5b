//! 事件分发器
//!
//! 状态标签到处理器的映射是编译期的穷举 match，未登记的标签走默认分支只记告警。
//! 处理器返回的错误在这里转换为日志，分发本身从不失败，事件通道不会被单个事件阻塞。

use order_sync_shared::config::{AppConfig, AuthConfig, FailureLogConfig, ReconcileSettings};
use order_sync_shared::events::{OrderEvent, OrderStatus};
use order_sync_shared::observability::metrics;
use tracing::{error, info, warn};

use crate::clients::Collaborators;
use crate::error::ReconcileError;
use crate::failure::FailureRecorder;
use crate::handlers::{ReconcileContext, Reconciliation, canceled, payment_approved};

/// 单个事件的分发结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// 处理器正常返回
    Completed(Reconciliation),
    /// 处理器返回错误，已记录日志
    Failed { code: &'static str, message: String },
    /// 状态标签没有登记处理器，携带原始标签
    Unrecognized { status: String },
}

impl DispatchOutcome {
    fn label(&self) -> &'static str {
        match self {
            Self::Completed(_) => "completed",
            Self::Failed { .. } => "failed",
            Self::Unrecognized { .. } => "unrecognized",
        }
    }
}

pub struct EventDispatcher {
    collaborators: Collaborators,
    recorder: FailureRecorder,
    settings: ReconcileSettings,
    auth: AuthConfig,
}

impl EventDispatcher {
    pub fn new(
        collaborators: Collaborators,
        settings: ReconcileSettings,
        auth: AuthConfig,
        failure_log: FailureLogConfig,
    ) -> Self {
        let recorder = FailureRecorder::new(collaborators.documents.clone(), failure_log);
        Self {
            collaborators,
            recorder,
            settings,
            auth,
        }
    }

    pub fn from_config(collaborators: Collaborators, config: &AppConfig) -> Self {
        Self::new(
            collaborators,
            config.reconciliation.clone(),
            config.auth.clone(),
            config.failure_log.clone(),
        )
    }

    /// 解析事件的状态标签
    pub fn resolve(event: &OrderEvent) -> Result<OrderStatus, ReconcileError> {
        event
            .status()
            .ok_or_else(|| ReconcileError::UnrecognizedStatus {
                status: event.current_state.clone(),
            })
    }

    /// 分发一个事件，不返回错误
    pub async fn dispatch(&self, event: &OrderEvent) -> DispatchOutcome {
        let tracker_id = event.tracker_id();
        let changed_at = event.changed_at();
        info!(
            order_id = %event.order_id,
            current_state = %event.current_state,
            current_change_date = %event.current_change_date,
            changed_at = ?changed_at,
            tracker_id = %tracker_id,
            "收到订单状态事件"
        );
        if changed_at.is_none() {
            warn!(
                order_id = %event.order_id,
                current_change_date = %event.current_change_date,
                "订单状态变更时间无法解析"
            );
        }

        let status = match Self::resolve(event) {
            Ok(status) => status,
            Err(e) => {
                warn!(
                    order_id = %event.order_id,
                    current_state = %event.current_state,
                    available_handlers = ?OrderStatus::known_tags(),
                    error = %e,
                    "订单状态没有对应的处理器，忽略"
                );
                let outcome = DispatchOutcome::Unrecognized {
                    status: event.current_state.clone(),
                };
                metrics::record_order_event("unknown", outcome.label());
                return outcome;
            }
        };

        let ctx = ReconcileContext {
            event,
            tracker_id: &tracker_id,
            settings: &self.settings,
            auth: &self.auth,
            collaborators: &self.collaborators,
            recorder: &self.recorder,
        };

        let result = match status {
            OrderStatus::PaymentApproved => payment_approved::handle(&ctx).await,
            OrderStatus::Canceled => canceled::handle(&ctx).await,
        };

        let outcome = match result {
            Ok(reconciliation) => {
                info!(
                    order_id = %event.order_id,
                    status = %status,
                    result = ?reconciliation,
                    tracker_id = %tracker_id,
                    "订单状态事件处理完成"
                );
                DispatchOutcome::Completed(reconciliation)
            }
            Err(e) => {
                error!(
                    order_id = %event.order_id,
                    status = %status,
                    error = %e,
                    code = e.code(),
                    tracker_id = %tracker_id,
                    "订单状态事件处理失败"
                );
                DispatchOutcome::Failed {
                    code: e.code(),
                    message: e.to_string(),
                }
            }
        };

        metrics::record_order_event(status.tag(), outcome.label());
        outcome
    }
}
