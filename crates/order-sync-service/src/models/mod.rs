//! 领域模型
//!
//! 与外部系统交互的请求/响应结构，按所属系统拆分：
//! - `order`: 电商平台订单快照
//! - `subscription`: 订阅记录与订阅项变更
//! - `contract`: 合同系统的付款、编辑、通知负载及访问令牌
//! - `document`: 主数据文档（订单关联、升级配对）与检索条件
//! - `upgrade`: 升级订单自定义字段解析出的升级请求

mod contract;
mod document;
mod order;
mod subscription;
mod upgrade;

pub use contract::*;
pub use document::*;
pub use order::*;
pub use subscription::*;
pub use upgrade::*;

/// 将最小货币单位（分）换算为主单位（元）
///
/// 金额只在构造发往合同系统的负载时换算一次。
pub fn minor_to_major(value: i64) -> f64 {
    value as f64 / 100.0
}

/// 取套餐 ID 最后一个 `.` 之后的部分作为合同中的套餐编码
pub fn plan_code(plan_id: &str) -> &str {
    plan_id.rsplit('.').next().unwrap_or(plan_id)
}
