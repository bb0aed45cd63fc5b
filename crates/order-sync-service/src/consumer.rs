//! Kafka 消费者
//!
//! 将订单状态变更消息解码为 `OrderEvent` 并交给分发器。
//! 一条消息处理完毕才拉取下一条；处理器错误已在分发器内转换为日志，
//! 这里只有消息无法解码时才返回错误。

use order_sync_shared::config::KafkaConfig;
use order_sync_shared::error::SyncError;
use order_sync_shared::events::OrderEvent;
use order_sync_shared::kafka::{ConsumerMessage, KafkaConsumer};
use order_sync_shared::observability::tracing::set_parent_from_headers;
use tokio::sync::watch;
use tracing::{Instrument, error, info, info_span, warn};

use crate::dispatcher::{DispatchOutcome, EventDispatcher};

/// 订单状态事件消费者
pub struct OrderEventConsumer {
    consumer: KafkaConsumer,
    dispatcher: EventDispatcher,
    topic: String,
}

impl OrderEventConsumer {
    pub fn new(config: &KafkaConfig, dispatcher: EventDispatcher) -> Result<Self, SyncError> {
        let consumer = KafkaConsumer::new(config)?;
        Ok(Self {
            consumer,
            dispatcher,
            topic: config.order_status_topic.clone(),
        })
    }

    /// 启动消费循环，直到收到 shutdown 信号
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<(), SyncError> {
        let Self {
            consumer,
            dispatcher,
            topic,
        } = self;

        consumer.subscribe(&[topic.as_str()])?;
        info!(topic = %topic, "订单状态事件消费者已启动");

        let dispatcher = &dispatcher;
        consumer
            .start(shutdown, move |msg| async move {
                if let Err(e) = handle_message(dispatcher, &msg).await {
                    error!(
                        error = %e,
                        topic = %msg.topic,
                        partition = msg.partition,
                        offset = msg.offset,
                        "处理订单状态事件失败"
                    );
                }
                Ok(())
            })
            .await;

        info!("订单状态事件消费者已停止");
        Ok(())
    }
}

/// 处理单条 Kafka 消息：解码 → 在上游追踪上下文中分发
pub async fn handle_message(
    dispatcher: &EventDispatcher,
    msg: &ConsumerMessage,
) -> Result<DispatchOutcome, SyncError> {
    let event: OrderEvent = msg.deserialize_payload().map_err(|e| {
        warn!(
            error = %e,
            key = ?msg.key,
            offset = msg.offset,
            "订单状态事件反序列化失败，丢弃"
        );
        e
    })?;

    let span = info_span!(
        "order_status_event",
        order_id = %event.order_id,
        current_state = %event.current_state
    );
    set_parent_from_headers(&span, &msg.headers);

    Ok(dispatcher.dispatch(&event).instrument(span).await)
}
