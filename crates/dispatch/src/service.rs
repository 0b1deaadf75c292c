//! Dispatch service — the invocation surface of the pipeline.
//!
//! One entry point per message kind. Each call:
//! 1. Scopes the requested recipients to the acting admin's visible subtree
//!    (`NotAuthorized` short-circuits before any batch planning)
//! 2. Builds the dispatch job and runs the engine
//! 3. Persists the per-batch trail and, when at least one batch went out,
//!    the audit record
//!
//! An audit write failure after a successful send is surfaced on the outcome
//! instead of failing the call: the external send already happened and is
//! not rolled back.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use herald_common::error::AppError;
use herald_common::types::{
    Admin, BatchResult, ChannelSelection, DispatchJob, Employee, EventFields, MessageBody,
};
use herald_directory::visible_employees;
use herald_gateway::NotificationGateway;

use crate::audit::AuditSink;
use crate::engine::DispatchEngine;
use crate::roster::RosterService;

/// Result returned to the calling layer: cumulative textual status plus the
/// structured per-batch results.
#[derive(Debug, serde::Serialize)]
pub struct SendOutcome {
    pub job_id: Uuid,
    pub status: String,
    pub results: Vec<BatchResult>,
    /// Correlation id for survey sends.
    pub message_id: Option<String>,
    /// Set when the send succeeded but the audit write did not.
    pub audit_error: Option<String>,
}

/// Parameters of a plain notification send.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct NotificationParams {
    pub content: String,
    pub subject: String,
    pub sender: String,
    pub recipient_ids: Vec<Uuid>,
    pub channels: ChannelSelection,
}

/// Parameters of a survey send. Surveys go out on the app channel; the
/// question definition is stored verbatim for later re-render.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct SurveyParams {
    pub subject: String,
    pub sender: String,
    pub definition: serde_json::Value,
    pub recipient_ids: Vec<Uuid>,
}

/// Parameters of an event send.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct EventParams {
    pub fields: EventFields,
    pub recipient_ids: Vec<Uuid>,
}

/// Parameters of an onboarding send. Onboarding goes out over SMS and email:
/// the recipients cannot read the app channel before their first login.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct OnboardingParams {
    pub recipient_ids: Vec<Uuid>,
}

pub struct DispatchService {
    engine: DispatchEngine,
}

impl DispatchService {
    pub fn new(gateway: Arc<dyn NotificationGateway>, batch_size: usize) -> Self {
        Self {
            engine: DispatchEngine::new(gateway, batch_size),
        }
    }

    pub async fn send_notification(
        &self,
        pool: &PgPool,
        acting: &Admin,
        params: NotificationParams,
    ) -> Result<SendOutcome, AppError> {
        let recipients = self
            .authorize_recipients(pool, acting, &params.recipient_ids)
            .await?;
        let job = new_job(
            params.subject,
            params.sender,
            MessageBody::Notification {
                content: params.content,
            },
            params.channels,
            recipients,
        );
        self.run(pool, job).await
    }

    pub async fn send_survey(
        &self,
        pool: &PgPool,
        acting: &Admin,
        params: SurveyParams,
    ) -> Result<SendOutcome, AppError> {
        let recipients = self
            .authorize_recipients(pool, acting, &params.recipient_ids)
            .await?;
        let job = new_job(
            params.subject,
            params.sender,
            MessageBody::Survey {
                definition: params.definition,
            },
            ChannelSelection {
                app: true,
                sms: false,
                email: false,
            },
            recipients,
        );
        self.run(pool, job).await
    }

    pub async fn send_event(
        &self,
        pool: &PgPool,
        acting: &Admin,
        params: EventParams,
    ) -> Result<SendOutcome, AppError> {
        let recipients = self
            .authorize_recipients(pool, acting, &params.recipient_ids)
            .await?;
        let sender = acting
            .email
            .clone()
            .unwrap_or_else(|| format!("{} {}", acting.first_name, acting.last_name));
        let job = new_job(
            params.fields.title.clone(),
            sender,
            MessageBody::Event {
                fields: params.fields,
            },
            ChannelSelection {
                app: true,
                sms: false,
                email: false,
            },
            recipients,
        );
        self.run(pool, job).await
    }

    pub async fn send_onboarding(
        &self,
        pool: &PgPool,
        acting: &Admin,
        params: OnboardingParams,
    ) -> Result<SendOutcome, AppError> {
        let recipients = self
            .authorize_recipients(pool, acting, &params.recipient_ids)
            .await?;
        let job = new_job(
            "Welcome aboard".to_string(),
            "onboarding@herald".to_string(),
            MessageBody::Onboarding,
            ChannelSelection {
                app: false,
                sms: true,
                email: true,
            },
            recipients,
        );
        self.run(pool, job).await
    }

    /// Resolve the requested recipient ids against the acting admin's
    /// visible set.
    ///
    /// A requested employee outside the visible subtree is a loud
    /// `NotAuthorized`, not a silent narrowing: a caller targeting employees
    /// it cannot see is misconfigured and should hear about it.
    async fn authorize_recipients(
        &self,
        pool: &PgPool,
        acting: &Admin,
        recipient_ids: &[Uuid],
    ) -> Result<Vec<Employee>, AppError> {
        if recipient_ids.is_empty() {
            return Err(AppError::Validation(
                "Recipient list is empty".to_string(),
            ));
        }

        let directory = RosterService::all_employees(pool).await?;
        let visible = visible_employees(acting, &directory);
        let visible_by_id: HashMap<Uuid, &Employee> =
            visible.into_iter().map(|e| (e.id, e)).collect();

        let mut recipients = Vec::with_capacity(recipient_ids.len());
        for id in recipient_ids {
            match visible_by_id.get(id) {
                Some(employee) => recipients.push((*employee).clone()),
                None if directory.iter().any(|e| e.id == *id) => {
                    return Err(AppError::NotAuthorized(format!(
                        "Employee {} is outside your visible subtree",
                        id
                    )));
                }
                None => {
                    return Err(AppError::NotFound(format!("Employee {} not found", id)));
                }
            }
        }

        Ok(recipients)
    }

    /// Run the engine and persist the trail.
    async fn run(&self, pool: &PgPool, job: DispatchJob) -> Result<SendOutcome, AppError> {
        let report = self.engine.dispatch(&job, None).await?;

        let mut audit_error = None;

        if let Err(e) = AuditSink::record_batches(pool, &job, &report).await {
            RosterService::log_error(pool, "dispatch.record_batches", &e.to_string()).await;
            audit_error = Some(e.to_string());
        }

        if report.sent_batches() > 0
            && let Err(e) = AuditSink::record_send(pool, &job, &report).await
        {
            RosterService::log_error(pool, "dispatch.record_send", &e.to_string()).await;
            audit_error = Some(e.to_string());
        }

        let status = match &audit_error {
            Some(e) => format!("{} (audit write failed: {})", report.summary(), e),
            None => report.summary(),
        };

        Ok(SendOutcome {
            job_id: job.id,
            status,
            message_id: report.message_id.clone(),
            results: report.results,
            audit_error,
        })
    }
}

fn new_job(
    subject: String,
    sender: String,
    body: MessageBody,
    channels: ChannelSelection,
    recipients: Vec<Employee>,
) -> DispatchJob {
    DispatchJob {
        id: Uuid::new_v4(),
        subject,
        sender,
        body,
        channels,
        recipients,
        created_at: Utc::now(),
    }
}
