//! 订单状态处理器
//!
//! - `payment_approved`: 支付通过，识别场景后交给 `first_payment` / `recurrence` / `upgrade`
//! - `canceled`: 订单取消，向合同系统发送取消通知
//!
//! 处理器之间共享 `ReconcileContext`，其中的配置在每次处理时显式传入。

pub mod canceled;
pub mod first_payment;
pub mod payment_approved;
pub mod recurrence;
pub mod upgrade;

use order_sync_shared::config::{AuthConfig, ReconcileSettings};
use order_sync_shared::events::OrderEvent;
use tracing::info;

use crate::clients::Collaborators;
use crate::error::ReconcileError;
use crate::failure::FailureRecorder;
use crate::models::ContractEdit;

/// 单个事件的处理上下文
pub struct ReconcileContext<'a> {
    pub event: &'a OrderEvent,
    /// 串联同一事件全部日志的追踪 ID
    pub tracker_id: &'a str,
    pub settings: &'a ReconcileSettings,
    pub auth: &'a AuthConfig,
    pub collaborators: &'a Collaborators,
    pub recorder: &'a FailureRecorder,
}

/// 处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// 已在合同系统登记付款
    PaymentRegistered,
    /// 升级已应用到订阅
    UpgradeApplied { added: usize, updated: usize },
    /// 已向合同系统发送取消通知
    CancellationNotified,
    /// 缺少关联数据，未做任何变更
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// 订阅项上没有原始订单号
    MissingOriginalOrder,
    /// 原始订单号找不到对应的订单关联文档
    MissingOrderRelation,
}

impl Reconciliation {
    pub fn result_label(&self) -> &'static str {
        match self {
            Self::Skipped(_) => "skipped",
            _ => "success",
        }
    }
}

impl<'a> ReconcileContext<'a> {
    /// 记录合同编辑请求体，开启 `contract_edit_enabled` 时才真正提交
    ///
    /// 返回是否已提交。
    pub(crate) async fn submit_contract_edit(
        &self,
        token: &str,
        edit: &ContractEdit,
    ) -> Result<bool, ReconcileError> {
        info!(
            order_id = %self.event.order_id,
            tracker_id = self.tracker_id,
            contract_edit = %serde_json::to_string(edit).unwrap_or_default(),
            enabled = self.settings.contract_edit_enabled,
            "合同编辑请求体已生成"
        );

        if !self.settings.contract_edit_enabled {
            return Ok(false);
        }

        let response = self.collaborators.contracts.edit_contract(token, edit).await?;
        info!(
            order_id = %self.event.order_id,
            tracker_id = self.tracker_id,
            %response,
            "合同编辑已提交"
        );
        Ok(true)
    }
}
