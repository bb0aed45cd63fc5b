//! 场景识别
//!
//! 同一张订单可能同时带有升级自定义数据和订阅信息，判断顺序固定：
//! 升级 → 续费 → 首购（默认）。识别本身不会失败，升级字段的解析放在升级处理器内部，
//! 解析失败走统一的失败记录流程。

use std::collections::HashMap;

use crate::models::{OrderSnapshot, UPGRADE_APP_ID};

/// 支付通过事件的对账场景
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scenario {
    /// 套餐升级，携带 `upgradeplan` 应用的原始字段
    Upgrade(HashMap<String, String>),
    /// 订阅续费
    Recurrence { subscription_group_id: String },
    /// 首次购买
    FirstPayment,
}

impl Scenario {
    /// 指标与日志中使用的场景名
    pub fn name(&self) -> &'static str {
        match self {
            Self::Upgrade(_) => "upgrade",
            Self::Recurrence { .. } => "recurrence",
            Self::FirstPayment => "first_payment",
        }
    }
}

/// 识别订单快照对应的场景
pub fn classify(order: &OrderSnapshot) -> Scenario {
    if let Some(app) = order.custom_app(UPGRADE_APP_ID) {
        return Scenario::Upgrade(app.fields.clone());
    }

    if let Some(group_id) = order.subscription_group_id() {
        return Scenario::Recurrence {
            subscription_group_id: group_id.to_string(),
        };
    }

    Scenario::FirstPayment
}
