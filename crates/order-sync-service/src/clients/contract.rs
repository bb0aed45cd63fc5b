//! 合同系统客户端

use async_trait::async_trait;
use order_sync_shared::config::ContractConfig;
use order_sync_shared::error::Result;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::{ContractService, read_json, send_checked};
use crate::models::{CancellationNotice, ContractEdit, ContractPaymentNotification};

const SERVICE: &str = "contract";

pub struct ContractClient {
    http: reqwest::Client,
    base_url: String,
}

impl ContractClient {
    pub fn new(http: reqwest::Client, config: &ContractConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn post<B: Serialize + Sync>(&self, path: &str, token: &str, body: &B) -> Result<Value> {
        debug!(path, "调用合同系统");
        let response = send_checked(
            SERVICE,
            self.http
                .post(format!("{}{}", self.base_url, path))
                .bearer_auth(token)
                .json(body),
        )
        .await?;

        read_json(SERVICE, response).await
    }
}

#[async_trait]
impl ContractService for ContractClient {
    async fn register_payment(
        &self,
        token: &str,
        notification: &ContractPaymentNotification,
    ) -> Result<Value> {
        self.post("/api/Pagamento/SalvarPagamento", token, notification)
            .await
    }

    async fn edit_contract(&self, token: &str, edit: &ContractEdit) -> Result<Value> {
        self.post("/EditarContrato", token, edit).await
    }

    async fn send_notification(&self, token: &str, notice: &CancellationNotice) -> Result<Value> {
        self.post("/Notificacao", token, notice).await
    }
}
