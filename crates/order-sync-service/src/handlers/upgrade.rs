//! 套餐升级：批量新增订阅项、调整订阅项数量
//!
//! 订阅接口有频率限制且不保证幂等，新增和修改都经过分批限速执行器提交。
//! 待处理状态的清理不在这里进行。

use std::collections::HashMap;

use order_sync_shared::observability::metrics;
use order_sync_shared::throttle::run_batched;
use tracing::info;

use super::{ReconcileContext, Reconciliation};
use crate::error::ReconcileError;
use crate::failure::FailureFeature;
use crate::lookup;
use crate::models::{AddSubscriptionItem, ContractEdit, PlannedUpdate, UpgradeItem, UpgradeRequest};

pub async fn handle(
    ctx: &ReconcileContext<'_>,
    fields: &HashMap<String, String>,
    token: &str,
) -> Result<Reconciliation, ReconcileError> {
    info!(
        order_id = %ctx.event.order_id,
        fields = ?fields,
        tracker_id = ctx.tracker_id,
        "升级处理开始"
    );

    // 升级订单的失败记录不带金额
    ctx.recorder
        .audit(
            FailureFeature::Upgrade,
            ctx.event,
            None,
            reconcile(ctx, fields, token),
        )
        .await
        .into_result()
}

async fn reconcile(
    ctx: &ReconcileContext<'_>,
    fields: &HashMap<String, String>,
    token: &str,
) -> Result<Reconciliation, ReconcileError> {
    let request = UpgradeRequest::parse(fields)?;
    info!(
        order_id = %ctx.event.order_id,
        subscription_id = %request.subscription_id,
        quantity = request.quantity,
        items_to_add = request.items_to_add.len(),
        user_sku_id = %request.user.id,
        user_quantity = request.user.quantity,
        tracker_id = ctx.tracker_id,
        "升级数据已解析"
    );

    let added = if request.items_to_add.is_empty() {
        0
    } else {
        add_items(ctx, &request).await?
    };

    let subscription = ctx
        .collaborators
        .subscriptions
        .get_by_id(&request.subscription_id)
        .await?;

    let updates = request.plan_updates(&subscription.items);
    let updated = update_items(ctx, &request.subscription_id, updates).await?;

    let email = lookup::find_subscriber_email(
        ctx.collaborators.documents.as_ref(),
        &ctx.settings.order_relation_entity,
        &request.subscription_id,
        ctx.settings.search_page_size,
    )
    .await?;
    info!(
        order_id = %ctx.event.order_id,
        subscription_id = %request.subscription_id,
        client_email = ?email,
        tracker_id = ctx.tracker_id,
        "客户邮箱已查询"
    );

    let edit = ContractEdit::for_upgrade(&subscription, &request, email.as_deref());
    ctx.submit_contract_edit(token, &edit).await?;

    info!(
        order_id = %ctx.event.order_id,
        subscription_id = %request.subscription_id,
        added,
        updated,
        tracker_id = ctx.tracker_id,
        "升级处理完成"
    );
    Ok(Reconciliation::UpgradeApplied { added, updated })
}

/// 分批新增订阅项，每项一次调用，数量统一为请求中的 `quantity`
async fn add_items(
    ctx: &ReconcileContext<'_>,
    request: &UpgradeRequest,
) -> Result<usize, ReconcileError> {
    let subscriptions = &ctx.collaborators.subscriptions;
    let subscription_id = request.subscription_id.as_str();
    let quantity = request.quantity;
    let tracker_id = ctx.tracker_id;

    info!(
        subscription_id,
        items = request.items_to_add.len(),
        tracker_id,
        "开始新增订阅项"
    );

    let summary = run_batched(
        request.items_to_add.clone(),
        ctx.settings.add_chunk_size,
        ctx.settings.throttle_interval(),
        |item: UpgradeItem| async move {
            subscriptions
                .add_item(
                    subscription_id,
                    AddSubscriptionItem {
                        sku_id: item.sku_id.clone(),
                        quantity,
                    },
                )
                .await?;
            metrics::record_subscription_mutation("add_item");
            info!(subscription_id, sku_id = %item.sku_id, tracker_id, "订阅项已新增");
            Ok::<_, ReconcileError>(())
        },
    )
    .await?;

    Ok(summary.total())
}

/// 分批修改订阅项数量
async fn update_items(
    ctx: &ReconcileContext<'_>,
    subscription_id: &str,
    updates: Vec<PlannedUpdate>,
) -> Result<usize, ReconcileError> {
    let subscriptions = &ctx.collaborators.subscriptions;
    let tracker_id = ctx.tracker_id;

    info!(subscription_id, items = updates.len(), tracker_id, "开始修改订阅项数量");

    let summary = run_batched(
        updates,
        ctx.settings.update_chunk_size,
        ctx.settings.throttle_interval(),
        |update: PlannedUpdate| async move {
            subscriptions
                .update_item(subscription_id, &update.item_id, update.change)
                .await?;
            metrics::record_subscription_mutation("update_item");
            info!(
                subscription_id,
                item_id = %update.item_id,
                sku_id = %update.sku_id,
                new_quantity = update.change.quantity,
                tracker_id,
                "订阅项数量已修改"
            );
            Ok::<_, ReconcileError>(())
        },
    )
    .await?;

    Ok(summary.total())
}
