use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Employment status of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EmploymentStatus {
    Active,
    Inactive,
}

impl std::fmt::Display for EmploymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmploymentStatus::Active => write!(f, "active"),
            EmploymentStatus::Inactive => write!(f, "inactive"),
        }
    }
}

/// Role of an acting administrator.
///
/// `Root` sees and may target the full directory; `Manager` is scoped to
/// their subordinate subtree by the org authorization filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AdminRole {
    Root,
    Manager,
}

impl std::fmt::Display for AdminRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdminRole::Root => write!(f, "root"),
            AdminRole::Manager => write!(f, "manager"),
        }
    }
}

/// Delivery channel for an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    App,
    Sms,
    Email,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::App => write!(f, "app"),
            Channel::Sms => write!(f, "sms"),
            Channel::Email => write!(f, "email"),
        }
    }
}

/// Independently toggleable channel flags on a dispatch job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSelection {
    pub app: bool,
    pub sms: bool,
    pub email: bool,
}

impl ChannelSelection {
    /// The channels enabled by this selection, in dispatch order.
    pub fn enabled(&self) -> Vec<Channel> {
        let mut channels = Vec::new();
        if self.app {
            channels.push(Channel::App);
        }
        if self.sms {
            channels.push(Channel::Sms);
        }
        if self.email {
            channels.push(Channel::Email);
        }
        channels
    }

    pub fn is_empty(&self) -> bool {
        !self.app && !self.sms && !self.email
    }
}

/// Terminal state of a dispatched batch. Batches are only recorded once
/// they have been through the gateway, so there is no in-flight state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Sent,
    Failed,
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchStatus::Sent => write!(f, "sent"),
            BatchStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A directory entry. The supervisor relation is a denormalized *name pair*,
/// not a foreign key; an entry whose supervisor pair matches no directory
/// record is a root of the forest.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Employee {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub status: EmploymentStatus,
    pub supervisor_first_name: Option<String>,
    pub supervisor_last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// Generated login handle for the employee app.
    pub login_handle: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An administrator identity able to initiate dispatch jobs.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Admin {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub role: AdminRole,
    pub email: Option<String>,
    pub api_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Recurrence frequency for a recurring event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    Weekly,
    BiWeekly,
    Monthly,
}

/// Recurrence rule attached to an event: frequency plus an inclusive end date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub frequency: Recurrence,
    /// Last calendar date (inclusive) on which an occurrence may start.
    pub repeat_until: NaiveDate,
}

/// Structured fields of an event message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventFields {
    pub title: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub all_day: bool,
    pub recurrence: Option<RecurrenceRule>,
}

/// Tagged message payload of a dispatch job.
///
/// Explicit variants instead of an open-ended dictionary: channel eligibility
/// and audit shape differ per kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageBody {
    Notification {
        content: String,
    },
    Survey {
        /// Serialized question definition, stored verbatim for later re-render.
        definition: serde_json::Value,
    },
    Event {
        fields: EventFields,
    },
    /// Welcome message carrying each recipient's generated login handle.
    Onboarding,
}

impl MessageBody {
    /// Audit `kind` discriminant, also used as the gateway template selector.
    pub fn kind(&self) -> &'static str {
        match self {
            MessageBody::Notification { .. } => "notification",
            MessageBody::Survey { .. } => "survey",
            MessageBody::Event { .. } => "event",
            MessageBody::Onboarding => "onboarding",
        }
    }
}

/// An admin-initiated send request, ready for batch planning.
#[derive(Debug, Clone)]
pub struct DispatchJob {
    pub id: Uuid,
    pub subject: String,
    pub sender: String,
    pub body: MessageBody,
    pub channels: ChannelSelection,
    pub recipients: Vec<Employee>,
    pub created_at: DateTime<Utc>,
}

/// Outcome of one dispatched batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    /// 1-based batch index, for "Batch i of N" reporting.
    pub batch_index: usize,
    pub total_batches: usize,
    pub status: BatchStatus,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Audit row for a successfully dispatched message.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditRecord {
    pub id: Uuid,
    pub kind: String,
    pub sender: String,
    pub subject: String,
    pub body: serde_json::Value,
    /// Message id reported by the external gateway.
    pub message_id: Option<String>,
    /// Transaction id reported by the external gateway.
    pub transaction_id: Option<String>,
    pub recipient_count: i32,
    pub created_at: DateTime<Utc>,
}

/// An inbound HR question, the input stream of the daily digest.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct HrQuestion {
    pub id: Uuid,
    pub question: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub emailed: bool,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
}

/// Sent-marker for one calendar day's digest, keyed by date.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DigestRecord {
    pub digest_date: NaiveDate,
    pub item_count: i32,
    pub item_ids: Vec<Uuid>,
    /// SHA-256 over the sorted item ids, the "already sent" guard payload.
    pub checksum: String,
    pub sent_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_selection_enabled_order() {
        let sel = ChannelSelection {
            app: true,
            sms: false,
            email: true,
        };
        assert_eq!(sel.enabled(), vec![Channel::App, Channel::Email]);
    }

    #[test]
    fn test_channel_selection_empty() {
        assert!(ChannelSelection::default().is_empty());
        assert!(
            !ChannelSelection {
                sms: true,
                ..Default::default()
            }
            .is_empty()
        );
    }

    #[test]
    fn test_batch_status_display_matches_stored_form() {
        assert_eq!(BatchStatus::Sent.to_string(), "sent");
        assert_eq!(BatchStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn test_message_body_kind_tags() {
        let survey = MessageBody::Survey {
            definition: serde_json::json!({"questions": []}),
        };
        assert_eq!(survey.kind(), "survey");
        assert_eq!(MessageBody::Onboarding.kind(), "onboarding");
    }

    #[test]
    fn test_message_body_serde_tag() {
        let body = MessageBody::Notification {
            content: "Office closed Friday".to_string(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["kind"], "notification");
        assert_eq!(json["content"], "Office closed Friday");
    }
}
