//! Client for the external notification gateway.
//!
//! The gateway is an external collaborator: Herald only relies on the small
//! contract below — `trigger` one templated send per batch, `list` what a
//! subscriber has received, and `delete_by_id` for administrative cleanup.
//! The concrete wire protocol stays behind [`HttpGateway`]; the engine and
//! tests talk to the [`NotificationGateway`] trait.

pub mod client;

pub use client::HttpGateway;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use herald_common::error::AppError;

/// A recipient as the gateway sees it: pseudonymous subscriber id plus the
/// channel addresses the dispatch engine projected for this send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayRecipient {
    pub subscriber_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Generated login handle, carried only on onboarding sends so the
    /// gateway template can render per-recipient credentials.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_handle: Option<String>,
}

/// Acknowledgement returned by the gateway for one batch trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayReceipt {
    pub message_id: String,
    pub transaction_id: String,
}

/// One entry from a subscriber's message history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayMessage {
    pub transaction_id: String,
    pub template_id: String,
    pub subject: Option<String>,
}

/// Contract Herald needs from the notification gateway.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Submit one batch of recipients against a template. One call per batch;
    /// the caller owns sequencing and partial-failure accounting.
    async fn trigger(
        &self,
        template_id: &str,
        recipients: &[GatewayRecipient],
        payload: &serde_json::Value,
    ) -> Result<GatewayReceipt, AppError>;

    /// List messages delivered to a subscriber (administrative, off the
    /// steady-state dispatch path).
    async fn list(&self, subscriber_id: &str) -> Result<Vec<GatewayMessage>, AppError>;

    /// Delete a delivered message by its transaction id (administrative
    /// cleanup after an audit-record deletion).
    async fn delete_by_id(&self, transaction_id: &str) -> Result<(), AppError>;
}
