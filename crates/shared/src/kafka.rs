//! Kafka 消费端
//!
//! 订单状态事件按分区顺序逐条处理。offset 由本模块在处理函数返回后显式登记，
//! 再由 librdkafka 的自动提交定时器批量提交：进程在处理中途退出时，
//! 当前消息会在重启后重新投递（至少一次）。

use std::collections::HashMap;

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::{BorrowedMessage, Headers, Message};
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::KafkaConfig;
use crate::error::SyncError;

/// 脱离 rdkafka 借用生命周期的消息副本
#[derive(Debug, Clone)]
pub struct ConsumerMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<String>,
    pub payload: Vec<u8>,
    pub timestamp: Option<i64>,
    /// UTF-8 消息头，用于恢复上游追踪上下文；非 UTF-8 的值被忽略
    pub headers: HashMap<String, String>,
}

impl From<&BorrowedMessage<'_>> for ConsumerMessage {
    fn from(msg: &BorrowedMessage<'_>) -> Self {
        let headers = msg
            .headers()
            .map(|headers| {
                headers
                    .iter()
                    .filter_map(|header| {
                        let value = std::str::from_utf8(header.value?).ok()?;
                        Some((header.key.to_string(), value.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            topic: msg.topic().to_string(),
            partition: msg.partition(),
            offset: msg.offset(),
            key: msg
                .key()
                .and_then(|key| std::str::from_utf8(key).ok())
                .map(str::to_string),
            payload: msg.payload().map(<[u8]>::to_vec).unwrap_or_default(),
            timestamp: msg.timestamp().to_millis(),
            headers,
        }
    }
}

impl ConsumerMessage {
    /// 按 JSON 解码负载
    pub fn deserialize_payload<T: DeserializeOwned>(&self) -> Result<T, SyncError> {
        serde_json::from_slice(&self.payload)
            .map_err(|e| SyncError::Kafka(format!("负载反序列化失败: {e}")))
    }
}

/// 消费者客户端配置
///
/// 关闭 `enable.auto.offset.store`：拉取消息时不再自动登记 offset，
/// 只有 `KafkaConsumer::start` 在处理函数返回后才登记，自动提交只会提交已处理完的位置。
pub fn client_config(config: &KafkaConfig) -> ClientConfig {
    let mut client = ClientConfig::new();
    client
        .set("bootstrap.servers", &config.brokers)
        .set("group.id", &config.consumer_group)
        .set("auto.offset.reset", &config.auto_offset_reset)
        .set("enable.auto.commit", "true")
        .set("enable.auto.offset.store", "false");
    client
}

pub struct KafkaConsumer {
    consumer: StreamConsumer,
}

impl KafkaConsumer {
    pub fn new(config: &KafkaConfig) -> Result<Self, SyncError> {
        let consumer: StreamConsumer = client_config(config)
            .create()
            .map_err(|e| SyncError::Kafka(format!("创建消费者失败: {e}")))?;

        info!(
            brokers = %config.brokers,
            group_id = %config.consumer_group,
            "Kafka 消费者已初始化"
        );
        Ok(Self { consumer })
    }

    pub fn subscribe(&self, topics: &[&str]) -> Result<(), SyncError> {
        self.consumer
            .subscribe(topics)
            .map_err(|e| SyncError::Kafka(format!("订阅 topic 失败: {e}")))?;

        info!(?topics, "已订阅 Kafka topics");
        Ok(())
    }

    /// 逐条处理消息直到关闭信号变为 `true`
    ///
    /// 关闭信号只在两条消息之间检查，正在执行的 handler 总会完整结束并登记 offset。
    /// handler 返回错误的消息同样登记，不会在重启后反复投递。
    pub async fn start<F, Fut>(self, mut shutdown: watch::Receiver<bool>, handler: F)
    where
        F: Fn(ConsumerMessage) -> Fut,
        Fut: std::future::Future<Output = Result<(), SyncError>>,
    {
        info!("Kafka 消费循环已启动");

        while !*shutdown.borrow() {
            let received = tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() {
                        warn!("关闭信号发送端已释放，Kafka 消费循环退出");
                        break;
                    }
                    continue;
                }
                received = self.consumer.recv() => received,
            };

            let borrowed = match received {
                Ok(borrowed) => borrowed,
                Err(e) => {
                    error!(error = %e, "接收 Kafka 消息出错");
                    continue;
                }
            };

            let msg = ConsumerMessage::from(&borrowed);
            debug!(
                topic = %msg.topic,
                partition = msg.partition,
                offset = msg.offset,
                "收到 Kafka 消息"
            );

            if let Err(e) = handler(msg).await {
                error!(error = %e, "处理 Kafka 消息失败");
            }
            self.mark_handled(&borrowed);
        }

        info!("收到关闭信号，Kafka 消费循环退出");
    }

    /// 登记已处理完的消息，由下一次自动提交带走
    fn mark_handled(&self, msg: &BorrowedMessage<'_>) {
        if let Err(e) = self.consumer.store_offset_from_message(msg) {
            warn!(
                error = %e,
                topic = msg.topic(),
                partition = msg.partition(),
                offset = msg.offset(),
                "登记 offset 失败，该消息可能在重启后重复投递"
            );
        }
    }
}
