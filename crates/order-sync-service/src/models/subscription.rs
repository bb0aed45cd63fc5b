//! 订阅记录与订阅项变更请求

use serde::{Deserialize, Serialize};

/// 订阅记录（由订阅系统持有，本服务只读取和修改其中的订阅项）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRecord {
    pub id: String,
    pub plan: SubscriptionPlan,
    #[serde(default)]
    pub items: Vec<SubscriptionItem>,
    #[serde(default)]
    pub next_purchase_date: String,
}

impl SubscriptionRecord {
    pub fn plan_id(&self) -> &str {
        &self.plan.id
    }

    /// 第一个带有原始订单号的订阅项上的原始订单号
    pub fn original_order_id(&self) -> Option<&str> {
        self.items
            .iter()
            .filter_map(|item| item.original_order_id.as_deref())
            .find(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    pub id: String,
}

/// 订阅项
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionItem {
    pub id: String,
    pub sku_id: String,
    pub quantity: i64,
    #[serde(default)]
    pub original_order_id: Option<String>,
}

/// 新增订阅项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddSubscriptionItem {
    pub sku_id: String,
    pub quantity: i64,
}

/// 修改订阅项数量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSubscriptionItem {
    pub quantity: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_subscription() {
        let json = r#"{
            "id": "sub-1",
            "status": "ACTIVE",
            "plan": {"id": "vtex.subscription.plano-pro", "frequency": {"periodicity": "MONTHLY", "interval": 1}},
            "items": [
                {"id": "i-1", "skuId": "7", "quantity": 3, "seller": "1"},
                {"id": "i-2", "skuId": "8", "quantity": 1, "originalOrderId": "1400-01"}
            ],
            "nextPurchaseDate": "2024-06-01T00:00:00Z"
        }"#;

        let sub: SubscriptionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(sub.plan_id(), "vtex.subscription.plano-pro");
        assert_eq!(sub.items.len(), 2);
        assert_eq!(sub.original_order_id(), Some("1400-01"));
    }

    #[test]
    fn test_original_order_id_skips_empty() {
        let sub = SubscriptionRecord {
            items: vec![
                SubscriptionItem {
                    original_order_id: Some(String::new()),
                    ..Default::default()
                },
                SubscriptionItem::default(),
            ],
            ..Default::default()
        };
        assert_eq!(sub.original_order_id(), None);
    }

    #[test]
    fn test_mutation_payloads() {
        let add = AddSubscriptionItem {
            sku_id: "42".to_string(),
            quantity: 5,
        };
        assert_eq!(
            serde_json::to_value(&add).unwrap(),
            serde_json::json!({"skuId": "42", "quantity": 5})
        );

        let update = UpdateSubscriptionItem { quantity: 2 };
        assert_eq!(
            serde_json::to_value(update).unwrap(),
            serde_json::json!({"quantity": 2})
        );
    }
}
