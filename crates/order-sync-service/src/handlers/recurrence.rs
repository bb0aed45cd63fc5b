//! 续费：以原始订单的订单表单号登记本期付款
//!
//! 流程：读取订阅 → 取原始订单号 → 查订单关联文档 → 查升级配对（识别用户席位 SKU）
//! → 生成合同编辑请求体 → 登记付款。缺少原始订单号或关联文档时直接跳过，不写失败记录。

use tracing::{info, warn};

use super::{ReconcileContext, Reconciliation, SkipReason};
use crate::error::ReconcileError;
use crate::failure::FailureFeature;
use crate::lookup;
use crate::models::{ContractEdit, ContractPaymentNotification, OrderSnapshot, minor_to_major};

pub async fn handle(
    ctx: &ReconcileContext<'_>,
    order: &OrderSnapshot,
    subscription_id: &str,
    token: &str,
) -> Result<Reconciliation, ReconcileError> {
    info!(
        order_id = %ctx.event.order_id,
        subscription_id,
        tracker_id = ctx.tracker_id,
        "续费付款处理开始"
    );

    ctx.recorder
        .audit(
            FailureFeature::Recurrence,
            ctx.event,
            Some(minor_to_major(order.value)),
            reconcile(ctx, order, subscription_id, token),
        )
        .await
        .into_result()
}

async fn reconcile(
    ctx: &ReconcileContext<'_>,
    order: &OrderSnapshot,
    subscription_id: &str,
    token: &str,
) -> Result<Reconciliation, ReconcileError> {
    let settings = ctx.settings;
    let documents = ctx.collaborators.documents.as_ref();

    let subscription = ctx
        .collaborators
        .subscriptions
        .get_by_id(subscription_id)
        .await?;
    info!(
        order_id = %ctx.event.order_id,
        subscription_id,
        plan_id = subscription.plan_id(),
        tracker_id = ctx.tracker_id,
        "订阅已获取"
    );

    let Some(original_order_id) = subscription.original_order_id() else {
        warn!(
            order_id = %ctx.event.order_id,
            subscription_id,
            tracker_id = ctx.tracker_id,
            "订阅项中没有原始订单号，跳过"
        );
        return Ok(Reconciliation::Skipped(SkipReason::MissingOriginalOrder));
    };

    let relation = lookup::find_order_relation(
        documents,
        &settings.order_relation_entity,
        original_order_id,
        settings.search_page_size,
    )
    .await?;

    let Some((original_form_id, user_email)) = relation.and_then(|relation| {
        relation
            .order_form_id
            .filter(|id| !id.is_empty())
            .map(|form_id| (form_id, relation.email))
    }) else {
        warn!(
            order_id = %ctx.event.order_id,
            original_order_id,
            tracker_id = ctx.tracker_id,
            "原始订单没有关联文档，跳过"
        );
        return Ok(Reconciliation::Skipped(SkipReason::MissingOrderRelation));
    };

    info!(
        order_id = %ctx.event.order_id,
        original_form_id = %original_form_id,
        user_email = ?user_email,
        tracker_id = ctx.tracker_id,
        "原始订单关联文档已找到"
    );

    let pair = lookup::find_upgrade_pair(
        documents,
        &settings.upgrade_pair_entity,
        subscription.plan_id(),
        settings.search_page_size,
    )
    .await?;
    let user_sku_id = pair.and_then(|pair| pair.user_id);

    let edit = ContractEdit::for_recurrence(
        order,
        &subscription,
        &original_form_id,
        user_email.as_deref(),
        user_sku_id.as_deref(),
    );
    ctx.submit_contract_edit(token, &edit).await?;

    let notification =
        ContractPaymentNotification::for_order(original_form_id, ctx.event, order.value);
    let response = ctx
        .collaborators
        .contracts
        .register_payment(token, &notification)
        .await?;

    info!(
        order_id = %ctx.event.order_id,
        subscription_id,
        tracker_id = ctx.tracker_id,
        %response,
        "续费付款登记成功"
    );
    Ok(Reconciliation::PaymentRegistered)
}
