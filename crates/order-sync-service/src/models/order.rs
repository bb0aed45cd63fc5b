//! 订单快照
//!
//! 每个事件处理时从订单系统实时拉取，不做缓存。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// 升级订单在 customApps 中使用的应用 ID
pub const UPGRADE_APP_ID: &str = "upgradeplan";

/// 订单快照
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSnapshot {
    pub order_id: String,
    pub order_form_id: String,
    /// 订单总额（分）
    pub value: i64,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub custom_data: Option<CustomData>,
    #[serde(default)]
    pub subscription_data: Option<SubscriptionData>,
}

impl OrderSnapshot {
    /// 按 ID 查找自定义应用
    pub fn custom_app(&self, app_id: &str) -> Option<&CustomApp> {
        self.custom_data
            .as_ref()?
            .custom_apps
            .iter()
            .find(|app| app.id == app_id)
    }

    /// 订阅组 ID，空字符串视为不存在
    pub fn subscription_group_id(&self) -> Option<&str> {
        self.subscription_data
            .as_ref()?
            .subscription_group_id
            .as_deref()
            .filter(|id| !id.is_empty())
    }
}

/// 订单行
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderItem {
    /// SKU ID
    pub id: String,
    pub ref_id: String,
    pub name: String,
    /// 单价（分）
    pub price: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomData {
    #[serde(default)]
    pub custom_apps: Vec<CustomApp>,
}

/// 订单上挂载的自定义应用数据，字段值一律为字符串
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomApp {
    pub id: String,
    #[serde(default)]
    pub fields: HashMap<String, String>,
}

/// 订单的订阅信息
///
/// 平台返回的字段名首字母大写，同时兼容小驼峰写法。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionData {
    #[serde(
        rename = "SubscriptionGroupId",
        alias = "subscriptionGroupId",
        default
    )]
    pub subscription_group_id: Option<String>,
}
