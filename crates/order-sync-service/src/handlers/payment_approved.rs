//! 支付通过：获取令牌与订单快照，识别场景后执行对应的对账流程
//!
//! 令牌与订单获取失败不写失败记录，错误直接返回给分发器。

use std::time::Instant;

use order_sync_shared::observability::metrics;
use tracing::info;

use super::{ReconcileContext, Reconciliation, first_payment, recurrence, upgrade};
use crate::classifier::{Scenario, classify};
use crate::error::ReconcileError;

pub async fn handle(ctx: &ReconcileContext<'_>) -> Result<Reconciliation, ReconcileError> {
    let event = ctx.event;
    info!(
        order_id = %event.order_id,
        current_change_date = %event.current_change_date,
        tracker_id = ctx.tracker_id,
        "支付通过处理开始"
    );

    let token = ctx
        .collaborators
        .tokens
        .get_token(&ctx.auth.username, &ctx.auth.password)
        .await?;
    info!(order_id = %event.order_id, tracker_id = ctx.tracker_id, "合同系统令牌已获取");

    let order = ctx.collaborators.orders.get_order(&event.order_id).await?;
    info!(
        order_id = %event.order_id,
        order_form_id = %order.order_form_id,
        has_custom_data = order.custom_data.is_some(),
        has_subscription_data = order.subscription_data.is_some(),
        tracker_id = ctx.tracker_id,
        "订单快照已获取"
    );

    let scenario = classify(&order);
    let scenario_name = scenario.name();
    info!(
        order_id = %event.order_id,
        scenario = scenario_name,
        tracker_id = ctx.tracker_id,
        "对账场景已识别"
    );

    let started = Instant::now();
    let token = token.access_token.as_str();
    let result = match &scenario {
        Scenario::Upgrade(fields) => upgrade::handle(ctx, fields, token).await,
        Scenario::Recurrence {
            subscription_group_id,
        } => recurrence::handle(ctx, &order, subscription_group_id, token).await,
        Scenario::FirstPayment => first_payment::handle(ctx, &order, token).await,
    };

    let label = match &result {
        Ok(reconciliation) => reconciliation.result_label(),
        Err(_) => "failed",
    };
    metrics::record_reconciliation(scenario_name, label, started.elapsed().as_secs_f64());

    result
}
