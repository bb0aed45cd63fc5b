//! 订单取消：向合同系统发送取消通知
//!
//! 取消流程不写失败记录，错误只由分发器记录日志。

use tracing::info;

use super::{ReconcileContext, Reconciliation};
use crate::error::ReconcileError;
use crate::models::CancellationNotice;

pub async fn handle(ctx: &ReconcileContext<'_>) -> Result<Reconciliation, ReconcileError> {
    let event = ctx.event;
    info!(
        order_id = %event.order_id,
        current_change_date = %event.current_change_date,
        tracker_id = ctx.tracker_id,
        "订单取消处理开始"
    );

    let order = ctx.collaborators.orders.get_order(&event.order_id).await?;
    info!(
        order_id = %event.order_id,
        order_form_id = %order.order_form_id,
        tracker_id = ctx.tracker_id,
        "订单快照已获取"
    );

    let token = ctx
        .collaborators
        .tokens
        .get_token(&ctx.auth.username, &ctx.auth.password)
        .await?;

    let notice = CancellationNotice::for_order(&order, event);
    let response = ctx
        .collaborators
        .contracts
        .send_notification(&token.access_token, &notice)
        .await?;

    info!(
        order_id = %event.order_id,
        order_form_id = %order.order_form_id,
        tracker_id = ctx.tracker_id,
        %response,
        "取消通知已发送"
    );
    Ok(Reconciliation::CancellationNotified)
}
