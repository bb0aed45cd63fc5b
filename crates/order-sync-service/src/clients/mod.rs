//! 外部协作方客户端
//!
//! 处理器只依赖这里定义的窄接口，具体 HTTP 实现位于子模块中，
//! 测试时可以替换为 mock 或内存实现。

mod auth;
mod commerce;
mod contract;

pub use auth::TokenClient;
pub use commerce::CommerceClient;
pub use contract::ContractClient;

use std::sync::Arc;

use async_trait::async_trait;
use order_sync_shared::config::AppConfig;
use order_sync_shared::error::{Result, SyncError};
use serde_json::Value;

use crate::models::{
    AccessToken, AddSubscriptionItem, CancellationNotice, ContractEdit,
    ContractPaymentNotification, DocumentQuery, OrderSnapshot, SubscriptionRecord,
    UpdateSubscriptionItem,
};

// ---------------------------------------------------------------------------
// Trait 抽象
// ---------------------------------------------------------------------------

/// 订单系统
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderService: Send + Sync {
    async fn get_order(&self, order_id: &str) -> Result<OrderSnapshot>;
}

/// 合同系统令牌签发
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenService: Send + Sync {
    async fn get_token(&self, username: &str, password: &str) -> Result<AccessToken>;
}

/// 订阅系统
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionService: Send + Sync {
    async fn get_by_id(&self, subscription_id: &str) -> Result<SubscriptionRecord>;

    async fn add_item(&self, subscription_id: &str, item: AddSubscriptionItem) -> Result<()>;

    async fn update_item(
        &self,
        subscription_id: &str,
        item_id: &str,
        change: UpdateSubscriptionItem,
    ) -> Result<()>;
}

/// 合同系统，所有调用都携带 Bearer 令牌
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContractService: Send + Sync {
    async fn register_payment(
        &self,
        token: &str,
        notification: &ContractPaymentNotification,
    ) -> Result<Value>;

    async fn edit_contract(&self, token: &str, edit: &ContractEdit) -> Result<Value>;

    async fn send_notification(&self, token: &str, notice: &CancellationNotice) -> Result<Value>;
}

/// 主数据文档存储
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create_document(&self, entity: &str, fields: Value) -> Result<Value>;

    async fn search_documents(&self, query: &DocumentQuery) -> Result<Vec<Value>>;
}

// ---------------------------------------------------------------------------
// 协作方集合
// ---------------------------------------------------------------------------

/// 处理器依赖的全部外部协作方
#[derive(Clone)]
pub struct Collaborators {
    pub orders: Arc<dyn OrderService>,
    pub tokens: Arc<dyn TokenService>,
    pub subscriptions: Arc<dyn SubscriptionService>,
    pub contracts: Arc<dyn ContractService>,
    pub documents: Arc<dyn DocumentStore>,
}

impl Collaborators {
    /// 按配置创建 HTTP 客户端
    ///
    /// 订单、订阅、主数据三者同属电商平台，共用一个客户端。
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let http = build_http_client(config)?;
        let commerce = Arc::new(CommerceClient::new(http.clone(), &config.commerce));

        Ok(Self {
            orders: commerce.clone(),
            tokens: Arc::new(TokenClient::new(http.clone(), &config.auth)),
            subscriptions: commerce.clone(),
            contracts: Arc::new(ContractClient::new(http, &config.contract)),
            documents: commerce,
        })
    }
}

fn build_http_client(config: &AppConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.http.timeout())
        .build()
        .map_err(|e| SyncError::Internal(format!("创建 HTTP 客户端失败: {e}")))
}

// ---------------------------------------------------------------------------
// HTTP 辅助函数
// ---------------------------------------------------------------------------

/// 发送请求并检查状态码，非 2xx 时携带响应体转换为外部服务错误
pub(crate) async fn send_checked(
    service: &str,
    request: reqwest::RequestBuilder,
) -> Result<reqwest::Response> {
    let response = request.send().await.map_err(|e| map_reqwest_error(service, e))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(SyncError::external(
        service,
        format!("HTTP {}: {}", status.as_u16(), body),
    ))
}

/// 读取 JSON 响应体，空响应体视为 null
pub(crate) async fn read_json(service: &str, response: reqwest::Response) -> Result<Value> {
    let body = response
        .text()
        .await
        .map_err(|e| map_reqwest_error(service, e))?;

    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
}

pub(crate) fn map_reqwest_error(service: &str, err: reqwest::Error) -> SyncError {
    if err.is_timeout() {
        SyncError::ExternalServiceTimeout {
            service: service.to_string(),
        }
    } else {
        SyncError::external(service, err.to_string())
    }
}
