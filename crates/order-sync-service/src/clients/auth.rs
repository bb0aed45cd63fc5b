//! 合同系统令牌客户端
//!
//! 使用资源所有者密码模式（ROPC）换取访问令牌，每个事件处理时重新获取，不缓存。

use async_trait::async_trait;
use order_sync_shared::config::AuthConfig;
use order_sync_shared::error::{Result, SyncError};
use tracing::debug;

use super::{TokenService, send_checked};
use crate::models::AccessToken;

const SERVICE: &str = "token";

pub struct TokenClient {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    scope: String,
}

impl TokenClient {
    pub fn new(http: reqwest::Client, config: &AuthConfig) -> Self {
        Self {
            http,
            token_url: format!("{}/token", config.token_url.trim_end_matches('/')),
            client_id: config.client_id.clone(),
            scope: config.scope.clone(),
        }
    }
}

#[async_trait]
impl TokenService for TokenClient {
    async fn get_token(&self, username: &str, password: &str) -> Result<AccessToken> {
        debug!(url = %self.token_url, "申请合同系统访问令牌");

        let form = [
            ("username", username),
            ("password", password),
            ("grant_type", "password"),
            ("scope", self.scope.as_str()),
            ("client_id", self.client_id.as_str()),
            ("response_type", "token"),
        ];

        let response = send_checked(SERVICE, self.http.post(&self.token_url).form(&form)).await?;

        response
            .json()
            .await
            .map_err(|e| SyncError::external(SERVICE, format!("令牌响应解析失败: {e}")))
    }
}
