//! Audit sink — durable record of what was sent, to whom, with what outcome.
//!
//! Appends one `notifications` row per successfully dispatched job plus a
//! `dispatch_jobs`/`dispatch_batches` trail of per-batch outcomes. The
//! steady-state path is append-only; deletion is a distinct administrative
//! operation that also cleans up the gateway side.

use sqlx::PgPool;
use uuid::Uuid;

use herald_common::error::AppError;
use herald_common::types::{AuditRecord, DispatchJob, MessageBody};
use herald_gateway::NotificationGateway;

use crate::engine::DispatchReport;

pub struct AuditSink;

impl AuditSink {
    /// Record a dispatched job's audit row.
    ///
    /// Called only when at least one batch was accepted; carries the first
    /// receipt's gateway ids for correlation. Survey rows additionally store
    /// the recipient count and the serialized question definition so the
    /// survey can be re-rendered when results come in. Database errors are
    /// mapped to `Persistence`: the external send already happened and must
    /// not look like a dispatch failure.
    pub async fn record_send(
        pool: &PgPool,
        job: &DispatchJob,
        report: &DispatchReport,
    ) -> Result<AuditRecord, AppError> {
        let body = match &job.body {
            MessageBody::Survey { definition } => serde_json::json!({
                "definition": definition,
                "message_id": report.message_id,
            }),
            other => serde_json::to_value(other)
                .map_err(|e| AppError::Persistence(format!("Unserializable payload: {}", e)))?,
        };

        let receipt = report.receipts.first();

        let record: AuditRecord = sqlx::query_as(
            r#"
            INSERT INTO notifications (id, kind, sender, subject, body, message_id, transaction_id, recipient_count, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(job.body.kind())
        .bind(&job.sender)
        .bind(&job.subject)
        .bind(&body)
        .bind(receipt.map(|r| r.message_id.clone()))
        .bind(receipt.map(|r| r.transaction_id.clone()))
        .bind(report.eligible_recipients as i32)
        .fetch_one(pool)
        .await
        .map_err(|e| AppError::Persistence(format!("Audit write failed: {}", e)))?;

        tracing::info!(
            audit_id = %record.id,
            kind = record.kind,
            recipients = record.recipient_count,
            "Audit record written"
        );

        Ok(record)
    }

    /// Persist the job row and its per-batch outcomes, successes and
    /// failures alike, so partial failures stay inspectable.
    pub async fn record_batches(
        pool: &PgPool,
        job: &DispatchJob,
        report: &DispatchReport,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO dispatch_jobs (id, kind, subject, sender, recipient_count, batch_count, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(job.id)
        .bind(job.body.kind())
        .bind(&job.subject)
        .bind(&job.sender)
        .bind(report.eligible_recipients as i32)
        .bind(report.results.len() as i32)
        .bind(job.created_at)
        .execute(pool)
        .await
        .map_err(|e| AppError::Persistence(format!("Job write failed: {}", e)))?;

        for result in &report.results {
            sqlx::query(
                r#"
                INSERT INTO dispatch_batches (id, job_id, batch_index, total_batches, status, error, executed_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(job.id)
            .bind(result.batch_index as i32)
            .bind(result.total_batches as i32)
            .bind(result.status.to_string())
            .bind(&result.error)
            .bind(result.timestamp)
            .execute(pool)
            .await
            .map_err(|e| AppError::Persistence(format!("Batch write failed: {}", e)))?;
        }

        Ok(())
    }

    /// List audit records, newest first, optionally filtered by kind.
    pub async fn list_records(
        pool: &PgPool,
        kind: Option<&str>,
    ) -> Result<Vec<AuditRecord>, AppError> {
        let records: Vec<AuditRecord> = match kind {
            Some(kind) => {
                sqlx::query_as(
                    "SELECT * FROM notifications WHERE kind = $1 ORDER BY created_at DESC",
                )
                .bind(kind)
                .fetch_all(pool)
                .await?
            }
            None => {
                sqlx::query_as("SELECT * FROM notifications ORDER BY created_at DESC")
                    .fetch_all(pool)
                    .await?
            }
        };
        Ok(records)
    }

    /// Administrative deletion: remove an audit record and its gateway-side
    /// message. Off the steady-state path. Returns the deleted record.
    pub async fn delete_record(
        pool: &PgPool,
        gateway: &dyn NotificationGateway,
        record_id: Uuid,
    ) -> Result<AuditRecord, AppError> {
        let record: AuditRecord = sqlx::query_as("SELECT * FROM notifications WHERE id = $1")
            .bind(record_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Audit record {} not found", record_id)))?;

        if let Some(transaction_id) = &record.transaction_id {
            // Gateway cleanup first; a missing gateway message is fine, the
            // local record still goes.
            match gateway.delete_by_id(transaction_id).await {
                Ok(()) | Err(AppError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }

        sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(record_id)
            .execute(pool)
            .await?;

        tracing::info!(audit_id = %record_id, "Audit record deleted");
        Ok(record)
    }
}
