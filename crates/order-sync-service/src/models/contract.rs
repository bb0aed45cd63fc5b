//! 合同系统负载
//!
//! 合同系统接口使用葡萄牙语的 PascalCase 字段名，这里用 serde rename 对齐线上格式。

use serde::{Deserialize, Serialize};
use serde_json::Value;

use order_sync_shared::events::OrderEvent;

use super::{OrderItem, OrderSnapshot, SubscriptionRecord, UpgradeRequest, minor_to_major, plan_code};

/// 付款类型："1" 为常规付款
pub const PAYMENT_TYPE_REGULAR: &str = "1";
/// 通知类型："1" 为订单取消
pub const NOTIFICATION_TYPE_CANCELED: &str = "1";
/// 合同周期类型："1" 为月付
pub const CYCLE_TYPE_MONTHLY: &str = "1";

/// 付款登记负载
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractPaymentNotification {
    #[serde(rename = "Tipo")]
    pub payment_type: String,
    #[serde(rename = "OrderFormId")]
    pub order_form_id: String,
    #[serde(rename = "NumeroPedido")]
    pub order_number: String,
    /// 金额（元）
    #[serde(rename = "Valor")]
    pub value: f64,
    #[serde(rename = "Data")]
    pub date: String,
    #[serde(rename = "Mensagem")]
    pub message: Option<String>,
}

impl ContractPaymentNotification {
    /// 为事件对应的订单构造常规付款登记
    ///
    /// `order_form_id` 由调用方决定：首购使用当前订单的，续费使用原始订单的。
    pub fn for_order(order_form_id: impl Into<String>, event: &OrderEvent, value_minor: i64) -> Self {
        Self {
            payment_type: PAYMENT_TYPE_REGULAR.to_string(),
            order_form_id: order_form_id.into(),
            order_number: event.order_id.clone(),
            value: minor_to_major(value_minor),
            date: event.current_change_date.clone(),
            message: None,
        }
    }
}

/// 订单取消通知
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationNotice {
    #[serde(rename = "NotificacaoTipoId")]
    pub notification_type: String,
    #[serde(rename = "OrderFormId")]
    pub order_form_id: String,
    #[serde(rename = "Data")]
    pub date: String,
}

impl CancellationNotice {
    pub fn for_order(order: &OrderSnapshot, event: &OrderEvent) -> Self {
        Self {
            notification_type: NOTIFICATION_TYPE_CANCELED.to_string(),
            order_form_id: order.order_form_id.clone(),
            date: event.current_change_date.clone(),
        }
    }
}

/// 合同编辑负载
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractEdit {
    #[serde(rename = "CicloTipoId")]
    pub cycle_type: String,
    #[serde(rename = "ValorTotal")]
    pub total_value: f64,
    /// 合同有效期，取订阅的下次扣款日
    #[serde(rename = "Vigencia")]
    pub valid_until: String,
    #[serde(rename = "OrderFormId")]
    pub order_form_id: String,
    #[serde(rename = "PlanoContratado")]
    pub plan: String,
    #[serde(rename = "SubitensContratados")]
    pub sub_items: Value,
    #[serde(rename = "Configuracoes")]
    pub settings: ContractSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractSettings {
    #[serde(rename = "QuantidadeMaximaAvaliacoes")]
    pub max_evaluations: i64,
    #[serde(rename = "QuantidadeMaximaUsuariosAtivos")]
    pub max_active_users: i64,
    /// 已签约项目的 refId 列表，JSON 字符串
    #[serde(rename = "ItensContratadosIds")]
    pub contracted_item_ids: String,
    #[serde(rename = "userId")]
    pub user_sku_id: Option<String>,
    #[serde(rename = "Usuarios")]
    pub user_email: Option<String>,
}

impl ContractEdit {
    /// 续费场景的合同编辑
    ///
    /// `user_sku_id` 标识代表"用户席位"的 SKU：该订单行的数量计为最大活跃用户数，
    /// 其余订单行计为签约子项，第一行的数量计为最大评估数。
    pub fn for_recurrence(
        order: &OrderSnapshot,
        subscription: &SubscriptionRecord,
        original_order_form_id: &str,
        user_email: Option<&str>,
        user_sku_id: Option<&str>,
    ) -> Self {
        let is_user_seat = |item: &OrderItem| user_sku_id == Some(item.id.as_str());
        let (seats, contracted): (Vec<&OrderItem>, Vec<&OrderItem>) =
            order.items.iter().partition(|item| is_user_seat(item));

        let sub_items: serde_json::Map<String, Value> = contracted
            .iter()
            .map(|item| {
                (
                    item.id.clone(),
                    serde_json::json!({
                        "name": item.name,
                        "refId": item.ref_id,
                        "price": item.price,
                        "skuId": item.id,
                    }),
                )
            })
            .collect();
        let ref_ids: Vec<&str> = contracted.iter().map(|item| item.ref_id.as_str()).collect();

        Self {
            cycle_type: CYCLE_TYPE_MONTHLY.to_string(),
            total_value: minor_to_major(order.value),
            valid_until: subscription.next_purchase_date.clone(),
            order_form_id: original_order_form_id.to_string(),
            plan: plan_code(subscription.plan_id()).to_string(),
            sub_items: Value::Object(sub_items),
            settings: ContractSettings {
                max_evaluations: contracted.first().map_or(0, |item| item.quantity),
                max_active_users: seats.first().map_or(0, |item| item.quantity),
                contracted_item_ids: json_string(&ref_ids),
                user_sku_id: user_sku_id.map(str::to_string),
                user_email: user_email.map(str::to_string),
            },
        }
    }

    /// 升级场景的合同编辑
    ///
    /// 升级订单的总额要等价格模拟接入后才能确定，目前固定为 0。
    pub fn for_upgrade(
        subscription: &SubscriptionRecord,
        request: &UpgradeRequest,
        user_email: Option<&str>,
    ) -> Self {
        let items_json = json_string(&request.items);
        Self {
            cycle_type: CYCLE_TYPE_MONTHLY.to_string(),
            total_value: 0.0,
            valid_until: subscription.next_purchase_date.clone(),
            order_form_id: request.original_order_form_id.clone(),
            plan: plan_code(&request.plan_id).to_string(),
            sub_items: Value::String(items_json.clone()),
            settings: ContractSettings {
                max_evaluations: request.quantity,
                max_active_users: request.user.quantity,
                contracted_item_ids: items_json,
                user_sku_id: request.user.sku_id().map(str::to_string),
                user_email: user_email.map(str::to_string),
            },
        }
    }
}

/// 字符串列表编码为 JSON 数组字符串
fn json_string<S: Serialize>(values: &[S]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}

/// 合同系统令牌
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: u64,
}
