//! 共享库
//!
//! 包含订单同步服务共用的配置、错误处理、事件模型、Kafka 消费、可观测性
//! 以及限速批量调用等基础设施代码。

pub mod config;
pub mod error;
pub mod events;
pub mod kafka;
pub mod observability;
pub mod throttle;
