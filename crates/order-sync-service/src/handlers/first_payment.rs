//! 首购：以当前订单在合同系统登记一次付款

use tracing::info;

use super::{ReconcileContext, Reconciliation};
use crate::error::ReconcileError;
use crate::failure::FailureFeature;
use crate::models::{ContractPaymentNotification, OrderSnapshot, minor_to_major};

pub async fn handle(
    ctx: &ReconcileContext<'_>,
    order: &OrderSnapshot,
    token: &str,
) -> Result<Reconciliation, ReconcileError> {
    let notification =
        ContractPaymentNotification::for_order(&order.order_form_id, ctx.event, order.value);

    info!(
        order_id = %ctx.event.order_id,
        order_form_id = %order.order_form_id,
        value = notification.value,
        tracker_id = ctx.tracker_id,
        "首购付款登记开始"
    );

    ctx.recorder
        .audit(
            FailureFeature::FirstPayment,
            ctx.event,
            Some(minor_to_major(order.value)),
            async {
                let response = ctx
                    .collaborators
                    .contracts
                    .register_payment(token, &notification)
                    .await?;

                info!(
                    order_id = %ctx.event.order_id,
                    tracker_id = ctx.tracker_id,
                    %response,
                    "首购付款登记成功"
                );
                Ok::<_, ReconcileError>(Reconciliation::PaymentRegistered)
            },
        )
        .await
        .into_result()
}
