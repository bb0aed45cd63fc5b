//! 升级请求
//!
//! 升级订单把升级参数放在 `upgradeplan` 自定义应用的字段里，字段值全部是字符串：
//! `quantity` 为十进制整数，`itemsToAdd` / `user` / `items` 为 JSON 编码的列表或对象，
//! 缺失时分别按 `[]`、`{}`、`[]` 处理。
//! 列表与对象内部的 SKU 编号和席位数由前端拼装，数字与字符串两种写法都接受。

use std::collections::HashMap;

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ReconcileError;

use super::{SubscriptionItem, UpdateSubscriptionItem};

/// 解析后的升级请求
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpgradeRequest {
    pub subscription_id: String,
    pub original_order_form_id: String,
    pub plan_id: String,
    /// 除用户席位外每个订阅项的目标数量
    pub quantity: i64,
    pub items_to_add: Vec<UpgradeItem>,
    pub user: UpgradeUser,
    /// 升级后签约项目的 refId 列表
    pub items: Vec<String>,
}

/// 需要新增到订阅中的 SKU
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeItem {
    #[serde(deserialize_with = "id_text")]
    pub sku_id: String,
}

/// 用户席位：`id` 为代表席位的 SKU，`quantity` 为升级后的席位数
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeUser {
    #[serde(deserialize_with = "id_text")]
    pub id: String,
    #[serde(deserialize_with = "lenient_count")]
    pub quantity: i64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Text(String),
    Number(i64),
}

/// `"12"` 与 `12` 都解析为 `"12"`
fn id_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match TextOrNumber::deserialize(deserializer)? {
        TextOrNumber::Text(text) => text,
        TextOrNumber::Number(n) => n.to_string(),
    })
}

/// `8` 与 `"8"` 都解析为 8
fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match TextOrNumber::deserialize(deserializer)? {
        TextOrNumber::Number(n) => Ok(n),
        TextOrNumber::Text(text) => text
            .trim()
            .parse()
            .map_err(|e| D::Error::custom(format!("数量 {text:?} 不是整数: {e}"))),
    }
}

impl UpgradeUser {
    pub fn sku_id(&self) -> Option<&str> {
        Some(self.id.as_str()).filter(|id| !id.is_empty())
    }
}

/// 一次订阅项数量修改
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedUpdate {
    pub item_id: String,
    pub sku_id: String,
    pub change: UpdateSubscriptionItem,
}

impl UpgradeRequest {
    /// 从自定义字段解析升级请求
    pub fn parse(fields: &HashMap<String, String>) -> Result<Self, ReconcileError> {
        let subscription_id = fields
            .get("subscriptionId")
            .filter(|id| !id.is_empty())
            .cloned()
            .ok_or_else(|| ReconcileError::malformed("subscriptionId", "字段缺失"))?;

        let quantity = fields
            .get("quantity")
            .ok_or_else(|| ReconcileError::malformed("quantity", "字段缺失"))?
            .trim()
            .parse::<i64>()
            .map_err(|e| ReconcileError::malformed("quantity", e.to_string()))?;

        Ok(Self {
            subscription_id,
            original_order_form_id: fields
                .get("originalOrderFormId")
                .cloned()
                .unwrap_or_default(),
            plan_id: fields.get("planId").cloned().unwrap_or_default(),
            quantity,
            items_to_add: decode_field(fields, "itemsToAdd", "[]")?,
            user: decode_field(fields, "user", "{}")?,
            items: decode_field(fields, "items", "[]")?,
        })
    }

    /// 计算需要修改数量的订阅项
    ///
    /// 用户席位 SKU 的目标数量为 `user.quantity`，其余为 `quantity`；
    /// 已经是目标数量的订阅项跳过。
    pub fn plan_updates(&self, items: &[SubscriptionItem]) -> Vec<PlannedUpdate> {
        let user_sku = self.user.sku_id();
        let current_seats = user_sku
            .and_then(|sku| items.iter().find(|item| item.sku_id == sku))
            .map(|item| item.quantity);

        items
            .iter()
            .filter_map(|item| {
                let is_seat = user_sku == Some(item.sku_id.as_str());
                let target = if is_seat {
                    if current_seats == Some(self.user.quantity) {
                        return None;
                    }
                    self.user.quantity
                } else {
                    if item.quantity == self.quantity {
                        return None;
                    }
                    self.quantity
                };

                Some(PlannedUpdate {
                    item_id: item.id.clone(),
                    sku_id: item.sku_id.clone(),
                    change: UpdateSubscriptionItem { quantity: target },
                })
            })
            .collect()
    }
}

fn decode_field<T: DeserializeOwned>(
    fields: &HashMap<String, String>,
    name: &str,
    default: &str,
) -> Result<T, ReconcileError> {
    let raw = fields
        .get(name)
        .map(String::as_str)
        .filter(|raw| !raw.is_empty())
        .unwrap_or(default);

    serde_json::from_str(raw).map_err(|e| ReconcileError::malformed(name, e.to_string()))
}
