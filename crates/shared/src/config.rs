//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Kafka 配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KafkaConfig {
    pub brokers: String,
    pub consumer_group: String,
    pub auto_offset_reset: String,
    /// 订单状态变更事件所在 topic
    pub order_status_topic: String,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            consumer_group: "order-sync-service".to_string(),
            auto_offset_reset: "earliest".to_string(),
            order_status_topic: "orders.status-changed".to_string(),
        }
    }
}

/// 可观测性配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    /// 日志输出格式：json（结构化）或 pretty（人类可读）
    pub log_format: String,
    pub metrics_enabled: bool,
    pub metrics_port: u16,
    pub tracing_endpoint: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: true,
            metrics_port: 9090,
            tracing_endpoint: None,
        }
    }
}

/// 电商平台（订单、订阅、主数据）接入配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CommerceConfig {
    pub base_url: String,
    pub app_key: String,
    pub app_token: String,
}

impl Default for CommerceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://account.vtexcommercestable.com.br".to_string(),
            app_key: String::new(),
            app_token: String::new(),
        }
    }
}

/// 合同系统鉴权（ROPC 令牌）配置
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// 令牌端点所在的基础地址，请求会发往 `{token_url}/token`
    pub token_url: String,
    pub username: String,
    pub password: String,
    pub client_id: String,
    pub scope: String,
}

/// 合同系统配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ContractConfig {
    pub base_url: String,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8081".to_string(),
        }
    }
}

/// 出站 HTTP 客户端配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_seconds: 10 }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// 对账流程参数
///
/// 显式传入每次处理流程，处理器不从任何全局状态读取配置。
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconcileSettings {
    /// 新增订阅项时每批的请求数
    pub add_chunk_size: usize,
    /// 更新订阅项数量时每批的请求数
    pub update_chunk_size: usize,
    /// 相邻两次订阅变更调用的最小启动间隔（毫秒）
    pub throttle_interval_ms: u64,
    /// 原始订单关联文档所在实体
    pub order_relation_entity: String,
    /// 套餐升级配对文档所在实体
    pub upgrade_pair_entity: String,
    /// 文档检索分页大小
    pub search_page_size: u32,
    /// 是否真正调用合同编辑接口（默认只构建并记录请求体）
    pub contract_edit_enabled: bool,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            add_chunk_size: 40,
            update_chunk_size: 47,
            throttle_interval_ms: 1000,
            order_relation_entity: "OC".to_string(),
            upgrade_pair_entity: "PU".to_string(),
            search_page_size: 1000,
            contract_edit_enabled: false,
        }
    }
}

impl ReconcileSettings {
    pub fn throttle_interval(&self) -> Duration {
        Duration::from_millis(self.throttle_interval_ms)
    }
}

/// 失败记录配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FailureLogConfig {
    pub entity: String,
    /// 写入 momento 字段时相对 UTC 的小时偏移（平台本地时间为 UTC-3）
    pub utc_offset_hours: i64,
}

impl Default for FailureLogConfig {
    fn default() -> Self {
        Self {
            entity: "FL".to_string(),
            utc_offset_hours: -3,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    pub kafka: KafkaConfig,
    pub observability: ObservabilityConfig,
    pub commerce: CommerceConfig,
    pub auth: AuthConfig,
    pub contract: ContractConfig,
    pub http: HttpConfig,
    pub reconciliation: ReconcileSettings,
    pub failure_log: FailureLogConfig,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. config/default.toml（默认配置）
    /// 2. config/{environment}.toml（环境特定配置）
    /// 3. config/{service_name}.toml（服务特定配置）
    /// 4. 环境变量（ORDER_SYNC 前缀，`__` 分隔层级，如 ORDER_SYNC_COMMERCE__APP_KEY -> commerce.app_key）
    pub fn load(service_name: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("ORDER_SYNC_ENV").unwrap_or_else(|_| "development".to_string());

        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        let builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env.clone())?
            .add_source(File::from(Path::new(&config_dir).join("default.toml")).required(false))
            .add_source(
                File::from(Path::new(&config_dir).join(format!("{}.toml", env))).required(false),
            )
            .add_source(
                File::from(Path::new(&config_dir).join(format!("{}.toml", service_name)))
                    .required(false),
            )
            // 字段名本身含下划线（app_key），层级分隔必须使用双下划线
            .add_source(
                Environment::with_prefix("ORDER_SYNC")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.kafka.order_status_topic, "orders.status-changed");
        assert_eq!(config.http.timeout(), Duration::from_secs(10));
        assert!(!config.is_production());
    }

    #[test]
    fn test_default_reconcile_settings() {
        let settings = ReconcileSettings::default();
        assert_eq!(settings.add_chunk_size, 40);
        assert_eq!(settings.update_chunk_size, 47);
        assert_eq!(settings.throttle_interval(), Duration::from_secs(1));
        assert_eq!(settings.order_relation_entity, "OC");
        assert_eq!(settings.upgrade_pair_entity, "PU");
        assert_eq!(settings.search_page_size, 1000);
        assert!(!settings.contract_edit_enabled);
    }

    #[test]
    fn test_default_failure_log() {
        let failure_log = FailureLogConfig::default();
        assert_eq!(failure_log.entity, "FL");
        assert_eq!(failure_log.utc_offset_hours, -3);
    }

    #[test]
    fn test_partial_section_falls_back_to_defaults() {
        let config: AppConfig = Config::builder()
            .set_override("reconciliation.add_chunk_size", 10)
            .and_then(|b| b.set_override("commerce.app_key", "key-1"))
            .and_then(|b| b.build())
            .and_then(|c| c.try_deserialize())
            .unwrap();

        assert_eq!(config.reconciliation.add_chunk_size, 10);
        assert_eq!(config.reconciliation.update_chunk_size, 47);
        assert_eq!(config.commerce.app_key, "key-1");
        assert_eq!(config.failure_log.entity, "FL");
    }
}
