//! Reqwest-backed implementation of [`NotificationGateway`].

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use herald_common::error::AppError;

use crate::{GatewayMessage, GatewayReceipt, GatewayRecipient, NotificationGateway};

/// HTTP client for the hosted notification gateway.
///
/// Every call carries the per-call timeout from configuration; a timed-out
/// trigger surfaces as a `Gateway` error, which the dispatch engine treats as
/// a failed batch and moves on.
pub struct HttpGateway {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

/// Wire shape of a trigger response.
#[derive(Debug, Deserialize)]
struct TriggerResponse {
    success: bool,
    message_id: Option<String>,
    transaction_id: Option<String>,
    error: Option<String>,
}

impl HttpGateway {
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build gateway client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(key) = &self.api_key {
            builder = builder.header("authorization", format!("ApiKey {}", key));
        }
        builder
    }
}

#[async_trait]
impl NotificationGateway for HttpGateway {
    async fn trigger(
        &self,
        template_id: &str,
        recipients: &[GatewayRecipient],
        payload: &serde_json::Value,
    ) -> Result<GatewayReceipt, AppError> {
        let body = json!({
            "name": template_id,
            "to": recipients,
            "payload": payload,
        });

        let response = self
            .request(reqwest::Method::POST, "/v1/events/trigger")
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("Trigger request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::Gateway(format!(
                "Trigger rejected with {}: {}",
                status, detail
            )));
        }

        let parsed: TriggerResponse = response
            .json()
            .await
            .map_err(|e| AppError::Gateway(format!("Malformed trigger response: {}", e)))?;

        if !parsed.success {
            return Err(AppError::Gateway(
                parsed
                    .error
                    .unwrap_or_else(|| "Gateway reported failure without detail".to_string()),
            ));
        }

        match (parsed.message_id, parsed.transaction_id) {
            (Some(message_id), Some(transaction_id)) => {
                tracing::debug!(
                    template_id,
                    recipients = recipients.len(),
                    transaction_id = %transaction_id,
                    "Gateway trigger accepted"
                );
                Ok(GatewayReceipt {
                    message_id,
                    transaction_id,
                })
            }
            _ => Err(AppError::Gateway(
                "Gateway accepted trigger but omitted message/transaction id".to_string(),
            )),
        }
    }

    async fn list(&self, subscriber_id: &str) -> Result<Vec<GatewayMessage>, AppError> {
        let response = self
            .request(
                reqwest::Method::GET,
                &format!("/v1/subscribers/{}/messages", subscriber_id),
            )
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("List request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Gateway(format!(
                "List rejected with {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Gateway(format!("Malformed list response: {}", e)))
    }

    async fn delete_by_id(&self, transaction_id: &str) -> Result<(), AppError> {
        let response = self
            .request(
                reqwest::Method::DELETE,
                &format!("/v1/messages/{}", transaction_id),
            )
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("Delete request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!(
                "Gateway message {} not found",
                transaction_id
            )));
        }
        if !status.is_success() {
            return Err(AppError::Gateway(format!(
                "Delete rejected with {}",
                status
            )));
        }

        tracing::info!(transaction_id, "Gateway message deleted");
        Ok(())
    }
}
