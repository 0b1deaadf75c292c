//! Dispatch engine — drives planned batches through the notification gateway.
//!
//! For each job:
//! 1. Project recipients per enabled channel (no phone → dropped from SMS,
//!    no email → dropped from email; app reaches everyone)
//! 2. Plan order-preserving batches over the eligible recipients
//! 3. Submit one gateway call per batch, strictly sequentially
//! 4. Record a `BatchResult` per batch; a failed batch is reported and the
//!    engine continues with the next one
//!
//! Sequential processing is deliberate: it keeps progress reporting
//! deterministic and respects the gateway's rate limits. There is no
//! mid-flight cancellation; a started job runs all planned batches.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;

use herald_common::error::AppError;
use herald_common::identity::{derive_subscriber_id, survey_message_id};
use herald_common::types::{BatchResult, BatchStatus, Channel, DispatchJob, Employee, MessageBody};
use herald_gateway::{GatewayReceipt, GatewayRecipient, NotificationGateway};

use crate::planner;
use crate::recurrence::expand_occurrences;

/// Aggregated outcome of one dispatch job.
#[derive(Debug)]
pub struct DispatchReport {
    /// Per-batch results in planned order.
    pub results: Vec<BatchResult>,
    /// Receipts of the batches the gateway accepted, in batch order.
    pub receipts: Vec<GatewayReceipt>,
    /// Correlation id attached to survey sends.
    pub message_id: Option<String>,
    /// Recipients eligible for at least one enabled channel.
    pub eligible_recipients: usize,
}

impl DispatchReport {
    pub fn sent_batches(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.status == BatchStatus::Sent)
            .count()
    }

    pub fn failed_batches(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.status == BatchStatus::Failed)
            .count()
    }

    /// Cumulative human-readable status for the calling layer.
    pub fn summary(&self) -> String {
        let total = self.results.len();
        if total == 0 {
            "No eligible recipients for the selected channels".to_string()
        } else if self.failed_batches() == 0 {
            format!("All {} batches sent successfully", total)
        } else {
            format!(
                "{} of {} batches sent, {} failed",
                self.sent_batches(),
                total,
                self.failed_batches()
            )
        }
    }
}

/// Engine driving a job's batches through the gateway.
pub struct DispatchEngine {
    gateway: Arc<dyn NotificationGateway>,
    batch_size: usize,
}

impl DispatchEngine {
    pub fn new(gateway: Arc<dyn NotificationGateway>, batch_size: usize) -> Self {
        Self {
            gateway,
            batch_size,
        }
    }

    /// Run a dispatch job to completion.
    ///
    /// Per-batch gateway failures are recorded in the result stream and never
    /// abort sibling batches. Errors returned from this function are
    /// job-level: an empty channel selection or recipient list, or a
    /// malformed recurrence rule, none of which reach the gateway.
    ///
    /// Each `BatchResult` is also pushed into `progress` (when provided) the
    /// moment its batch reaches a terminal state, so a caller can observe
    /// partial progress while the job runs.
    pub async fn dispatch(
        &self,
        job: &DispatchJob,
        progress: Option<&mpsc::UnboundedSender<BatchResult>>,
    ) -> Result<DispatchReport, AppError> {
        if job.channels.is_empty() {
            return Err(AppError::Validation(
                "At least one delivery channel must be selected".to_string(),
            ));
        }
        if job.recipients.is_empty() {
            return Err(AppError::Validation(
                "Recipient list is empty".to_string(),
            ));
        }

        let (payload, message_id) = self.build_payload(job)?;
        let with_handles = matches!(job.body, MessageBody::Onboarding);
        let eligible = project_recipients(&job.recipients, &job.channels.enabled(), with_handles);

        let batches = planner::plan(&eligible, self.batch_size);
        let total = batches.len();

        tracing::info!(
            job_id = %job.id,
            kind = job.body.kind(),
            requested = job.recipients.len(),
            eligible = eligible.len(),
            batches = total,
            "Dispatch started"
        );

        let mut results = Vec::with_capacity(total);
        let mut receipts = Vec::new();

        for batch in &batches {
            let batch_index = batch.index;
            let result = match self
                .gateway
                .trigger(job.body.kind(), &batch.recipients, &payload)
                .await
            {
                Ok(receipt) => {
                    tracing::info!(
                        job_id = %job.id,
                        "Batch {} of {} sent successfully",
                        batch_index,
                        total
                    );
                    receipts.push(receipt);
                    BatchResult {
                        batch_index,
                        total_batches: total,
                        status: BatchStatus::Sent,
                        error: None,
                        timestamp: Utc::now(),
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        job_id = %job.id,
                        "Batch {} of {} failed! Error: {}",
                        batch_index,
                        total,
                        e
                    );
                    BatchResult {
                        batch_index,
                        total_batches: total,
                        status: BatchStatus::Failed,
                        error: Some(e.to_string()),
                        timestamp: Utc::now(),
                    }
                }
            };

            if let Some(sink) = progress {
                // A closed receiver just means nobody is watching.
                let _ = sink.send(result.clone());
            }
            results.push(result);
        }

        Ok(DispatchReport {
            results,
            receipts,
            message_id,
            eligible_recipients: eligible.len(),
        })
    }

    /// Build the channel-agnostic gateway payload for a job, expanding
    /// recurring events and generating the survey correlation id.
    fn build_payload(
        &self,
        job: &DispatchJob,
    ) -> Result<(serde_json::Value, Option<String>), AppError> {
        let base = serde_json::json!({
            "subject": job.subject,
            "sender": job.sender,
        });

        let (mut payload, message_id) = match &job.body {
            MessageBody::Notification { content } => (
                serde_json::json!({ "content": content }),
                None,
            ),
            MessageBody::Survey { definition } => {
                let message_id = survey_message_id(&job.sender, &job.subject, job.created_at);
                (
                    serde_json::json!({
                        "definition": definition,
                        "message_id": message_id,
                    }),
                    Some(message_id),
                )
            }
            MessageBody::Event { fields } => {
                let occurrences = expand_occurrences(fields)?;
                (
                    serde_json::json!({
                        "title": fields.title,
                        "location": fields.location,
                        "description": fields.description,
                        "occurrences": occurrences,
                    }),
                    None,
                )
            }
            MessageBody::Onboarding => (serde_json::json!({ "onboarding": true }), None),
        };

        if let (Some(obj), Some(base_obj)) = (payload.as_object_mut(), base.as_object()) {
            for (k, v) in base_obj {
                obj.insert(k.clone(), v.clone());
            }
        }

        Ok((payload, message_id))
    }
}

/// Project recipients onto the enabled channels.
///
/// Channel eligibility is per-recipient, not all-or-nothing: a recipient
/// without a phone is silently dropped from the SMS payload but still
/// reaches the app or email channel. A recipient eligible for no enabled
/// channel is excluded from the job entirely. With `with_handles` set
/// (onboarding sends), each recipient carries their generated login handle
/// so the gateway template can render per-recipient credentials.
pub fn project_recipients(
    recipients: &[Employee],
    channels: &[Channel],
    with_handles: bool,
) -> Vec<GatewayRecipient> {
    recipients
        .iter()
        .filter_map(|employee| {
            let mut eligible = false;
            let mut phone = None;
            let mut email = None;

            for channel in channels {
                match channel {
                    Channel::App => eligible = true,
                    Channel::Sms => {
                        if let Some(p) = &employee.phone {
                            phone = Some(p.clone());
                            eligible = true;
                        }
                    }
                    Channel::Email => {
                        if let Some(e) = &employee.email {
                            email = Some(e.clone());
                            eligible = true;
                        }
                    }
                }
            }

            eligible.then(|| GatewayRecipient {
                subscriber_id: derive_subscriber_id(&employee.first_name, &employee.last_name),
                phone,
                email,
                login_handle: with_handles.then(|| employee.login_handle.clone()).flatten(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use herald_common::types::{ChannelSelection, EmploymentStatus};
    use std::sync::Mutex;
    use uuid::Uuid;

    /// Scripted gateway: fails the batch indices named in `fail_batches`.
    struct FakeGateway {
        fail_batches: Vec<usize>,
        calls: Mutex<usize>,
        seen_recipients: Mutex<Vec<usize>>,
        last_recipients: Mutex<Vec<GatewayRecipient>>,
        last_payload: Mutex<Option<serde_json::Value>>,
    }

    impl FakeGateway {
        fn new(fail_batches: Vec<usize>) -> Self {
            Self {
                fail_batches,
                calls: Mutex::new(0),
                seen_recipients: Mutex::new(Vec::new()),
                last_recipients: Mutex::new(Vec::new()),
                last_payload: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl NotificationGateway for FakeGateway {
        async fn trigger(
            &self,
            _template_id: &str,
            recipients: &[GatewayRecipient],
            payload: &serde_json::Value,
        ) -> Result<GatewayReceipt, AppError> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            let call = *calls;
            self.seen_recipients.lock().unwrap().push(recipients.len());
            *self.last_recipients.lock().unwrap() = recipients.to_vec();
            *self.last_payload.lock().unwrap() = Some(payload.clone());
            if self.fail_batches.contains(&call) {
                return Err(AppError::Gateway("simulated outage".to_string()));
            }
            Ok(GatewayReceipt {
                message_id: format!("msg-{}", call),
                transaction_id: format!("tx-{}", call),
            })
        }

        async fn list(
            &self,
            _subscriber_id: &str,
        ) -> Result<Vec<herald_gateway::GatewayMessage>, AppError> {
            Ok(vec![])
        }

        async fn delete_by_id(&self, _transaction_id: &str) -> Result<(), AppError> {
            Ok(())
        }
    }

    fn employee(first: &str, phone: Option<&str>, email: Option<&str>) -> Employee {
        Employee {
            id: Uuid::new_v4(),
            first_name: first.to_string(),
            last_name: "Test".to_string(),
            status: EmploymentStatus::Active,
            supervisor_first_name: None,
            supervisor_last_name: None,
            phone: phone.map(str::to_string),
            email: email.map(str::to_string),
            login_handle: None,
            created_at: Utc::now(),
        }
    }

    fn job(recipients: Vec<Employee>, channels: ChannelSelection) -> DispatchJob {
        DispatchJob {
            id: Uuid::new_v4(),
            subject: "Office closure".to_string(),
            sender: "hr@acme.test".to_string(),
            body: MessageBody::Notification {
                content: "Closed Friday".to_string(),
            },
            channels,
            recipients,
            created_at: Utc::now(),
        }
    }

    fn app_only() -> ChannelSelection {
        ChannelSelection {
            app: true,
            sms: false,
            email: false,
        }
    }

    #[tokio::test]
    async fn test_continues_past_failing_batch() {
        // 3 batches of 1, batch 2 fails: statuses must be sent, failed, sent.
        let gateway = Arc::new(FakeGateway::new(vec![2]));
        let engine = DispatchEngine::new(gateway, 1);
        let recipients = vec![
            employee("Ana", None, None),
            employee("Ben", None, None),
            employee("Cem", None, None),
        ];

        let report = engine.dispatch(&job(recipients, app_only()), None).await.unwrap();

        let statuses: Vec<BatchStatus> = report.results.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![BatchStatus::Sent, BatchStatus::Failed, BatchStatus::Sent]
        );
        assert_eq!(report.sent_batches(), 2);
        assert_eq!(report.failed_batches(), 1);
        assert!(report.results[1].error.as_deref().unwrap().contains("simulated outage"));
    }

    #[tokio::test]
    async fn test_progress_stream_receives_every_batch() {
        let gateway = Arc::new(FakeGateway::new(vec![]));
        let engine = DispatchEngine::new(gateway, 1);
        let recipients = vec![employee("Ana", None, None), employee("Ben", None, None)];

        let (tx, mut rx) = mpsc::unbounded_channel();
        engine
            .dispatch(&job(recipients, app_only()), Some(&tx))
            .await
            .unwrap();
        drop(tx);

        let mut streamed = Vec::new();
        while let Some(result) = rx.recv().await {
            streamed.push(result.batch_index);
        }
        assert_eq!(streamed, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_sms_only_drops_phoneless_recipients() {
        let gateway = Arc::new(FakeGateway::new(vec![]));
        let engine = DispatchEngine::new(gateway.clone(), 100);
        let recipients = vec![
            employee("Ana", Some("+491511111111"), None),
            employee("Ben", None, Some("ben@acme.test")),
            employee("Cem", Some("+491512222222"), None),
        ];
        let channels = ChannelSelection {
            app: false,
            sms: true,
            email: false,
        };

        let report = engine.dispatch(&job(recipients, channels), None).await.unwrap();

        assert_eq!(report.eligible_recipients, 2);
        assert_eq!(*gateway.seen_recipients.lock().unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn test_app_channel_reaches_contactless_recipients() {
        let gateway = Arc::new(FakeGateway::new(vec![]));
        let engine = DispatchEngine::new(gateway, 100);
        let recipients = vec![employee("Ana", None, None)];
        let channels = ChannelSelection {
            app: true,
            sms: true,
            email: true,
        };

        let report = engine.dispatch(&job(recipients, channels), None).await.unwrap();
        assert_eq!(report.eligible_recipients, 1);
        assert_eq!(report.sent_batches(), 1);
    }

    #[tokio::test]
    async fn test_empty_channel_selection_is_validation_error() {
        let gateway = Arc::new(FakeGateway::new(vec![]));
        let engine = DispatchEngine::new(gateway, 100);
        let recipients = vec![employee("Ana", None, None)];

        let result = engine
            .dispatch(&job(recipients, ChannelSelection::default()), None)
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_survey_dispatch_carries_message_id() {
        let gateway = Arc::new(FakeGateway::new(vec![]));
        let engine = DispatchEngine::new(gateway, 100);
        let mut survey_job = job(vec![employee("Ana", None, None)], app_only());
        survey_job.body = MessageBody::Survey {
            definition: serde_json::json!({"questions": ["How was onboarding?"]}),
        };

        let report = engine.dispatch(&survey_job, None).await.unwrap();
        let message_id = report.message_id.unwrap();
        assert_eq!(message_id.len(), 32);
    }

    #[tokio::test]
    async fn test_onboarding_recipients_carry_login_handles() {
        let gateway = Arc::new(FakeGateway::new(vec![]));
        let engine = DispatchEngine::new(gateway.clone(), 100);
        let mut ana = employee("Ana", Some("+491511111111"), Some("ana@acme.test"));
        ana.login_handle = Some("ana.test".to_string());
        let channels = ChannelSelection {
            app: false,
            sms: true,
            email: true,
        };
        let mut onboarding_job = job(vec![ana], channels);
        onboarding_job.body = MessageBody::Onboarding;

        engine.dispatch(&onboarding_job, None).await.unwrap();

        let sent = gateway.last_recipients.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].login_handle.as_deref(), Some("ana.test"));
        let payload = gateway.last_payload.lock().unwrap().clone().unwrap();
        assert_eq!(payload["onboarding"], serde_json::json!(true));
    }

    #[tokio::test]
    async fn test_regular_notification_omits_login_handles() {
        // Credentials only ride on onboarding sends, even when the
        // employee record carries a handle.
        let gateway = Arc::new(FakeGateway::new(vec![]));
        let engine = DispatchEngine::new(gateway.clone(), 100);
        let mut ana = employee("Ana", None, None);
        ana.login_handle = Some("ana.test".to_string());

        engine.dispatch(&job(vec![ana], app_only()), None).await.unwrap();

        let sent = gateway.last_recipients.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].login_handle.is_none());
    }

    #[tokio::test]
    async fn test_batches_processed_in_planned_order() {
        let gateway = Arc::new(FakeGateway::new(vec![]));
        let engine = DispatchEngine::new(gateway, 2);
        let recipients: Vec<Employee> =
            (0..5).map(|i| employee(&format!("E{}", i), None, None)).collect();

        let report = engine.dispatch(&job(recipients, app_only()), None).await.unwrap();
        let indices: Vec<usize> = report.results.iter().map(|r| r.batch_index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert!(report.results.iter().all(|r| r.total_batches == 3));
    }
}
