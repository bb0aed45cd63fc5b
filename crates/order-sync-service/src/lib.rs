//! 订单状态对账服务
//!
//! 消费电商平台的订单状态变更事件，按状态分发到处理器：
//! 支付通过时识别首购 / 续费 / 升级三种场景并同步到合同系统，
//! 取消时向合同系统发送取消通知。外部调用失败会尽力写入失败记录后再向上传播。

pub mod classifier;
pub mod clients;
pub mod consumer;
pub mod dispatcher;
pub mod error;
pub mod failure;
pub mod handlers;
pub mod lookup;
pub mod models;
