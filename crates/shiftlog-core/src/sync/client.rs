//! HTTP client for the shiftlog sync API.

use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::payload::{
    DeleteHistoryRequest, DeleteHistoryResponse, ListRequest, ListResponse, SyncAck,
    SyncPushRequest,
};
use super::transport::SyncTransport;
use crate::config::ClientConfig;
use crate::util::{compact_text, is_http_url, normalize_text_option};
use crate::{Error, Result};

const SYNC_PATH: &str = "/v1/shifts/sync";
const LIST_PATH: &str = "/v1/shifts/list";
const DELETE_PATH: &str = "/v1/shifts/delete";

#[derive(Clone)]
pub struct HttpSyncClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpSyncClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { base_url, client })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(config.require_api_url()?, config.http_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}{path}", self.base_url);
        tracing::debug!(%url, "Sending sync request");

        let response = self
            .client
            .post(&url)
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = parse_api_error(status, &body);
            return Err(if status.is_client_error() {
                Error::Validation(message)
            } else {
                Error::Transport(message)
            });
        }

        response
            .json::<R>()
            .await
            .map_err(|e| Error::Transport(format!("invalid response from {url}: {e}")))
    }
}

impl SyncTransport for HttpSyncClient {
    async fn push(&self, request: &SyncPushRequest) -> Result<SyncAck> {
        self.post(SYNC_PATH, request).await
    }

    async fn list(&self, request: &ListRequest) -> Result<ListResponse> {
        self.post(LIST_PATH, request).await
    }

    async fn delete_history(
        &self,
        request: &DeleteHistoryRequest,
    ) -> Result<DeleteHistoryResponse> {
        self.post(DELETE_PATH, request).await
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.error.or(payload.message) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

fn normalize_base_url(raw: String) -> Result<String> {
    let base_url = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::InvalidInput("API URL must not be empty".to_string()))?;
    if is_http_url(&base_url) {
        Ok(base_url.trim_end_matches('/').to_string())
    } else {
        Err(Error::InvalidInput(
            "API URL must include http:// or https://".to_string(),
        ))
    }
}
