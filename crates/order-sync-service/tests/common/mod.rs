//! 集成测试公共设施
//!
//! `FakePlatform` 在内存中同时扮演订单、订阅、主数据、令牌与合同系统，
//! 记录每一次写入，供测试断言外部可见的副作用。

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use order_sync_service::clients::{
    Collaborators, ContractService, DocumentStore, OrderService, SubscriptionService,
    TokenService,
};
use order_sync_service::dispatcher::EventDispatcher;
use order_sync_service::models::{
    AccessToken, AddSubscriptionItem, CancellationNotice, ContractEdit,
    ContractPaymentNotification, DocumentQuery, OrderSnapshot, SubscriptionItem,
    SubscriptionRecord, UpdateSubscriptionItem,
};
use order_sync_shared::config::{AuthConfig, FailureLogConfig, ReconcileSettings};
use order_sync_shared::error::{Result, SyncError};
use parking_lot::Mutex;
use serde_json::{Value, json};

#[derive(Default)]
pub struct FakePlatform {
    orders: Mutex<HashMap<String, OrderSnapshot>>,
    subscriptions: Mutex<HashMap<String, SubscriptionRecord>>,
    /// 实体名 → 已有文档
    documents: Mutex<HashMap<String, Vec<Value>>>,
    payment_rejection: Mutex<Option<String>>,

    pub created: Mutex<Vec<(String, Value)>>,
    pub payments: Mutex<Vec<ContractPaymentNotification>>,
    pub edits: Mutex<Vec<ContractEdit>>,
    pub notices: Mutex<Vec<CancellationNotice>>,
    pub added: Mutex<Vec<(String, AddSubscriptionItem)>>,
    pub updated: Mutex<Vec<(String, String, i64)>>,
    pub tokens_issued: Mutex<usize>,
}

impl FakePlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_order(&self, order: OrderSnapshot) -> &Self {
        self.orders.lock().insert(order.order_id.clone(), order);
        self
    }

    pub fn with_subscription(&self, subscription: SubscriptionRecord) -> &Self {
        self.subscriptions
            .lock()
            .insert(subscription.id.clone(), subscription);
        self
    }

    pub fn with_document(&self, entity: &str, doc: Value) -> &Self {
        self.documents
            .lock()
            .entry(entity.to_string())
            .or_default()
            .push(doc);
        self
    }

    /// 让合同系统拒绝之后的所有付款登记
    pub fn reject_payments(&self, message: &str) -> &Self {
        *self.payment_rejection.lock() = Some(message.to_string());
        self
    }

    pub fn subscription(&self, id: &str) -> Option<SubscriptionRecord> {
        self.subscriptions.lock().get(id).cloned()
    }

    /// 写入指定实体的文档
    pub fn created_in(&self, entity: &str) -> Vec<Value> {
        self.created
            .lock()
            .iter()
            .filter(|(e, _)| e == entity)
            .map(|(_, doc)| doc.clone())
            .collect()
    }

    pub fn collaborators(self: &Arc<Self>) -> Collaborators {
        Collaborators {
            orders: self.clone(),
            tokens: self.clone(),
            subscriptions: self.clone(),
            contracts: self.clone(),
            documents: self.clone(),
        }
    }
}

/// 检索条件形如 `a=1` 或 `a=1 OR b=1`
fn matches_where(doc: &Value, clause: &str) -> bool {
    clause.split(" OR ").any(|cond| match cond.split_once('=') {
        Some((field, value)) => doc.get(field.trim()).and_then(Value::as_str) == Some(value.trim()),
        None => false,
    })
}

#[async_trait]
impl OrderService for FakePlatform {
    async fn get_order(&self, order_id: &str) -> Result<OrderSnapshot> {
        self.orders
            .lock()
            .get(order_id)
            .cloned()
            .ok_or_else(|| SyncError::NotFound {
                entity: "order".to_string(),
                id: order_id.to_string(),
            })
    }
}

#[async_trait]
impl TokenService for FakePlatform {
    async fn get_token(&self, _username: &str, _password: &str) -> Result<AccessToken> {
        let mut issued = self.tokens_issued.lock();
        *issued += 1;
        Ok(AccessToken {
            access_token: format!("token-{}", *issued),
            token_type: "bearer".to_string(),
            expires_in: 3600,
        })
    }
}

#[async_trait]
impl SubscriptionService for FakePlatform {
    async fn get_by_id(&self, subscription_id: &str) -> Result<SubscriptionRecord> {
        self.subscription(subscription_id)
            .ok_or_else(|| SyncError::NotFound {
                entity: "subscription".to_string(),
                id: subscription_id.to_string(),
            })
    }

    async fn add_item(&self, subscription_id: &str, item: AddSubscriptionItem) -> Result<()> {
        let mut subscriptions = self.subscriptions.lock();
        let subscription = subscriptions
            .get_mut(subscription_id)
            .ok_or_else(|| SyncError::external("subscriptions", "HTTP 404"))?;

        let id = format!("added-{}", subscription.items.len() + 1);
        subscription.items.push(SubscriptionItem {
            id,
            sku_id: item.sku_id.clone(),
            quantity: item.quantity,
            original_order_id: None,
        });
        self.added.lock().push((subscription_id.to_string(), item));
        Ok(())
    }

    async fn update_item(
        &self,
        subscription_id: &str,
        item_id: &str,
        change: UpdateSubscriptionItem,
    ) -> Result<()> {
        let mut subscriptions = self.subscriptions.lock();
        let item = subscriptions
            .get_mut(subscription_id)
            .and_then(|sub| sub.items.iter_mut().find(|item| item.id == item_id))
            .ok_or_else(|| SyncError::external("subscriptions", "HTTP 404"))?;

        item.quantity = change.quantity;
        self.updated.lock().push((
            subscription_id.to_string(),
            item_id.to_string(),
            change.quantity,
        ));
        Ok(())
    }
}

#[async_trait]
impl ContractService for FakePlatform {
    async fn register_payment(
        &self,
        _token: &str,
        notification: &ContractPaymentNotification,
    ) -> Result<Value> {
        if let Some(message) = self.payment_rejection.lock().clone() {
            return Err(SyncError::external("contract", message));
        }
        self.payments.lock().push(notification.clone());
        Ok(json!({"sucesso": true}))
    }

    async fn edit_contract(&self, _token: &str, edit: &ContractEdit) -> Result<Value> {
        self.edits.lock().push(edit.clone());
        Ok(json!({"sucesso": true}))
    }

    async fn send_notification(&self, _token: &str, notice: &CancellationNotice) -> Result<Value> {
        self.notices.lock().push(notice.clone());
        Ok(json!({"sucesso": true}))
    }
}

#[async_trait]
impl DocumentStore for FakePlatform {
    async fn create_document(&self, entity: &str, fields: Value) -> Result<Value> {
        let mut created = self.created.lock();
        created.push((entity.to_string(), fields));
        Ok(json!({"Id": format!("{entity}-{}", created.len())}))
    }

    async fn search_documents(&self, query: &DocumentQuery) -> Result<Vec<Value>> {
        let documents = self.documents.lock();
        let Some(docs) = documents.get(&query.entity) else {
            return Ok(Vec::new());
        };

        let from = (query.page.saturating_sub(1) * query.page_size) as usize;
        Ok(docs
            .iter()
            .filter(|doc| {
                query
                    .where_clause
                    .as_deref()
                    .is_none_or(|clause| matches_where(doc, clause))
            })
            .skip(from)
            .take(query.page_size as usize)
            .cloned()
            .collect())
    }
}

/// 测试用对账参数：不限速，小分页便于覆盖翻页
pub fn test_settings() -> ReconcileSettings {
    ReconcileSettings {
        throttle_interval_ms: 0,
        search_page_size: 2,
        ..ReconcileSettings::default()
    }
}

pub fn dispatcher(platform: &Arc<FakePlatform>, settings: ReconcileSettings) -> EventDispatcher {
    EventDispatcher::new(
        platform.collaborators(),
        settings,
        AuthConfig {
            username: "b2c-user".to_string(),
            password: "b2c-pass".to_string(),
            ..AuthConfig::default()
        },
        FailureLogConfig::default(),
    )
}
