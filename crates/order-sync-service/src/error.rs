//! 对账服务专用错误类型
//!
//! 在共享库 SyncError 基础上定义本服务特有的错误变体。
//! 外部调用失败统一以 `Shared` 透传，保留原始错误信息写入失败记录。

use order_sync_shared::error::SyncError;

/// 对账处理错误
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// 升级订单携带的自定义字段无法解析（数量不是整数、JSON 字段格式错误等）
    #[error("升级数据格式错误: {field} - {reason}")]
    MalformedUpgrade { field: String, reason: String },

    /// 状态标签没有登记处理器
    #[error("未登记的订单状态: {status}")]
    UnrecognizedStatus { status: String },

    #[error(transparent)]
    Shared(#[from] SyncError),
}

impl ReconcileError {
    pub fn malformed(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedUpgrade {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// 错误码，用于指标标签和日志检索
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedUpgrade { .. } => "MALFORMED_UPGRADE",
            Self::UnrecognizedStatus { .. } => "UNRECOGNIZED_STATUS",
            Self::Shared(e) => e.code(),
        }
    }
}
