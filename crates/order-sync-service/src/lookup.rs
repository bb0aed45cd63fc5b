//! 主数据关联查询
//!
//! 续费需要根据原始订单号找到订单关联文档，升级需要根据订阅 ID 找到客户邮箱，
//! 两者都需要用套餐 ID 找到升级配对文档。

use order_sync_shared::error::{Result, SyncError};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::clients::DocumentStore;
use crate::models::{DocumentQuery, OrderRelation, UpgradePair};

/// 逐页读取实体的全部文档，直到遇到空页
pub async fn fetch_all_documents<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    entity: &str,
    fields: &[&str],
    page_size: u32,
) -> Result<Vec<T>> {
    if page_size == 0 {
        return Err(SyncError::InvalidArgument {
            field: "page_size".to_string(),
            message: "分页大小必须大于 0".to_string(),
        });
    }

    let mut documents = Vec::new();
    let mut page = 1;

    loop {
        let query = DocumentQuery::new(entity, fields).with_page(page, page_size);
        let batch = store.search_documents(&query).await?;
        if batch.is_empty() {
            break;
        }

        for doc in batch {
            documents.push(serde_json::from_value(doc)?);
        }
        page += 1;
    }

    debug!(entity, pages = page - 1, total = documents.len(), "实体文档读取完成");
    Ok(documents)
}

/// 按原始订单号查找订单关联文档
pub async fn find_order_relation(
    store: &dyn DocumentStore,
    entity: &str,
    order_id: &str,
    page_size: u32,
) -> Result<Option<OrderRelation>> {
    let relations: Vec<OrderRelation> =
        fetch_all_documents(store, entity, &OrderRelation::FIELDS, page_size).await?;

    Ok(relations
        .into_iter()
        .find(|relation| relation.order_id.as_deref() == Some(order_id)))
}

/// 查找基础套餐或升级套餐为 `plan_id` 的升级配对，取第一条
pub async fn find_upgrade_pair(
    store: &dyn DocumentStore,
    entity: &str,
    plan_id: &str,
    page_size: u32,
) -> Result<Option<UpgradePair>> {
    let query = DocumentQuery::new(entity, &UpgradePair::FIELDS)
        .with_where(UpgradePair::where_plan(plan_id))
        .with_page(1, page_size);

    let docs = store.search_documents(&query).await?;
    let Some(first) = docs.into_iter().next() else {
        return Ok(None);
    };
    Ok(Some(serde_json::from_value(first)?))
}

/// 按订阅 ID 查找客户邮箱
pub async fn find_subscriber_email(
    store: &dyn DocumentStore,
    entity: &str,
    subscription_id: &str,
    page_size: u32,
) -> Result<Option<String>> {
    let query = DocumentQuery::new(entity, &["email"])
        .with_where(format!("subscriptionId={subscription_id}"))
        .with_page(1, page_size);

    let docs = store.search_documents(&query).await?;
    Ok(docs
        .first()
        .and_then(|doc| doc.get("email"))
        .and_then(|email| email.as_str())
        .map(str::to_string))
}
