//! 订单状态事件模型
//!
//! 定义订单状态变更事件的信封格式，以及本系统登记过处理器的状态标签。
//! 状态标签到处理器的映射在编译期由 `OrderStatus` 的穷举 match 决定，
//! 未登记的标签在解析阶段即被识别，不存在运行时查表落空的歧义。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// OrderStatus: 已登记的状态标签
// ---------------------------------------------------------------------------

/// 已登记处理器的订单状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    PaymentApproved,
    Canceled,
}

impl OrderStatus {
    /// 全部已登记状态，用于在未识别事件的告警日志中列出可用标签
    pub const ALL: [OrderStatus; 2] = [OrderStatus::PaymentApproved, OrderStatus::Canceled];

    /// 平台事件中的状态标签
    pub fn tag(&self) -> &'static str {
        match self {
            Self::PaymentApproved => "payment-approved",
            Self::Canceled => "canceled",
        }
    }

    /// 解析状态标签，未登记的标签返回 None
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "payment-approved" => Some(Self::PaymentApproved),
            "canceled" => Some(Self::Canceled),
            _ => None,
        }
    }

    /// 已登记的全部标签
    pub fn known_tags() -> Vec<&'static str> {
        Self::ALL.iter().map(OrderStatus::tag).collect()
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

// ---------------------------------------------------------------------------
// OrderEvent: 订单状态变更事件
// ---------------------------------------------------------------------------

/// 订单状态变更事件
///
/// 由平台广播的事件负载直接反序列化得到，处理期间不可变。
/// `current_change_date` 保留原始字符串，原样回传给合同系统。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEvent {
    pub order_id: String,
    pub current_state: String,
    pub current_change_date: String,
}

impl OrderEvent {
    pub fn new(
        order_id: impl Into<String>,
        current_state: impl Into<String>,
        current_change_date: impl Into<String>,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            current_state: current_state.into(),
            current_change_date: current_change_date.into(),
        }
    }

    /// 已登记的状态，未登记时为 None
    pub fn status(&self) -> Option<OrderStatus> {
        OrderStatus::from_tag(&self.current_state)
    }

    /// 解析变更时间，格式非法时返回 None
    pub fn changed_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.current_change_date)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// 生成本次处理的追踪 ID，串联同一事件的全部日志
    pub fn tracker_id(&self) -> String {
        format!(
            "{}-{}-{}",
            self.current_state,
            self.order_id,
            Uuid::now_v7().simple()
        )
    }
}
