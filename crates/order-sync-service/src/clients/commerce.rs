//! 电商平台客户端（订单、订阅、主数据）
//!
//! 三类接口都通过 AppKey/AppToken 请求头鉴权，共用同一个基础地址。

use async_trait::async_trait;
use order_sync_shared::config::CommerceConfig;
use order_sync_shared::error::{Result, SyncError};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use super::{DocumentStore, OrderService, SubscriptionService, read_json, send_checked};
use crate::models::{
    AddSubscriptionItem, DocumentQuery, OrderSnapshot, SubscriptionRecord, UpdateSubscriptionItem,
};

const ORDERS: &str = "orders";
const SUBSCRIPTIONS: &str = "subscriptions";
const DOCUMENTS: &str = "documents";

pub struct CommerceClient {
    http: reqwest::Client,
    base_url: String,
    app_key: String,
    app_token: String,
}

impl CommerceClient {
    pub fn new(http: reqwest::Client, config: &CommerceConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            app_key: config.app_key.clone(),
            app_token: config.app_token.clone(),
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .header("Accept", "application/json")
            .header("X-VTEX-API-AppKey", &self.app_key)
            .header("X-VTEX-API-AppToken", &self.app_token)
    }
}

#[async_trait]
impl OrderService for CommerceClient {
    async fn get_order(&self, order_id: &str) -> Result<OrderSnapshot> {
        debug!(order_id, "拉取订单快照");
        let response = send_checked(
            ORDERS,
            self.request(Method::GET, &format!("/api/oms/pvt/orders/{order_id}")),
        )
        .await?;

        response
            .json()
            .await
            .map_err(|e| SyncError::external(ORDERS, format!("订单响应解析失败: {e}")))
    }
}

#[async_trait]
impl SubscriptionService for CommerceClient {
    async fn get_by_id(&self, subscription_id: &str) -> Result<SubscriptionRecord> {
        let response = send_checked(
            SUBSCRIPTIONS,
            self.request(
                Method::GET,
                &format!("/api/rns/pub/subscriptions/{subscription_id}"),
            ),
        )
        .await?;

        response
            .json()
            .await
            .map_err(|e| SyncError::external(SUBSCRIPTIONS, format!("订阅响应解析失败: {e}")))
    }

    async fn add_item(&self, subscription_id: &str, item: AddSubscriptionItem) -> Result<()> {
        send_checked(
            SUBSCRIPTIONS,
            self.request(
                Method::POST,
                &format!("/api/rns/pub/subscriptions/{subscription_id}/items"),
            )
            .json(&item),
        )
        .await?;
        Ok(())
    }

    async fn update_item(
        &self,
        subscription_id: &str,
        item_id: &str,
        change: UpdateSubscriptionItem,
    ) -> Result<()> {
        send_checked(
            SUBSCRIPTIONS,
            self.request(
                Method::PATCH,
                &format!("/api/rns/pub/subscriptions/{subscription_id}/items/{item_id}"),
            )
            .json(&change),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for CommerceClient {
    async fn create_document(&self, entity: &str, fields: Value) -> Result<Value> {
        let response = send_checked(
            DOCUMENTS,
            self.request(
                Method::POST,
                &format!("/api/dataentities/{entity}/documents"),
            )
            .json(&fields),
        )
        .await?;

        read_json(DOCUMENTS, response).await
    }

    async fn search_documents(&self, query: &DocumentQuery) -> Result<Vec<Value>> {
        let mut params = vec![("_fields", query.fields.join(","))];
        if let Some(clause) = &query.where_clause {
            params.push(("_where", clause.clone()));
        }

        let response = send_checked(
            DOCUMENTS,
            self.request(
                Method::GET,
                &format!("/api/dataentities/{}/search", query.entity),
            )
            .query(&params)
            .header("REST-Range", query.range_header()),
        )
        .await?;

        response
            .json()
            .await
            .map_err(|e| SyncError::external(DOCUMENTS, format!("检索响应解析失败: {e}")))
    }
}
