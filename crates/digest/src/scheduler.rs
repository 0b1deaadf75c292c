//! Digest scheduler — once-per-day digest runs with idempotency guards.
//!
//! A run for calendar day `D` (in the reporting zone):
//! 1. Takes the Redis `SET NX EX` run-lock for `D` (overlap guard)
//! 2. Checks `digest_records` for `D` — already sent and not forced → skip
//! 3. Loads the HR questions created inside `D`'s UTC window
//! 4. Renders the report and mails it via Resend
//! 5. Marks the questions emailed and upserts the `digest_records` row
//!
//! A mail failure writes no record, so the next cadence tick retries the
//! whole day. An empty day also writes no record.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use redis::aio::ConnectionManager;
use sqlx::PgPool;
use uuid::Uuid;

use herald_common::error::AppError;
use herald_common::identity::checksum_ids;
use herald_common::types::{DigestRecord, HrQuestion};
use herald_dispatch::roster::RosterService;

use crate::mailer::ResendMailer;
use crate::report;

/// Run-lock TTL. Long enough to cover a slow mail call, short enough that a
/// crashed run does not block the day for long.
const RUN_LOCK_SECONDS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DigestOutcome {
    /// Digest mailed and recorded.
    Sent { count: usize },
    /// Already sent today (or another run holds the lock).
    Skipped,
    /// No questions today; no mail, no record.
    Empty,
}

#[derive(Debug, Clone)]
pub struct DigestSettings {
    pub recipient: String,
    pub alert_recipient: Option<String>,
    pub zone: Tz,
    /// Local hour after which the scheduled run may fire.
    pub send_hour: u32,
    pub check_interval_secs: u64,
}

pub struct DigestScheduler {
    pool: PgPool,
    redis: ConnectionManager,
    mailer: ResendMailer,
    settings: DigestSettings,
}

impl DigestScheduler {
    pub fn new(
        pool: PgPool,
        redis: ConnectionManager,
        mailer: ResendMailer,
        settings: DigestSettings,
    ) -> Self {
        Self {
            pool,
            redis,
            mailer,
            settings,
        }
    }

    /// Cadence loop. Runs indefinitely until the task is cancelled.
    pub async fn run(&self) -> anyhow::Result<()> {
        tracing::info!(
            zone = %self.settings.zone,
            send_hour = self.settings.send_hour,
            interval_secs = self.settings.check_interval_secs,
            "Digest scheduler started"
        );

        loop {
            let local_now = Utc::now().with_timezone(&self.settings.zone);
            if local_now.hour() >= self.settings.send_hour {
                match self.run_once(false).await {
                    Ok(DigestOutcome::Sent { count }) => {
                        tracing::info!(count, "Daily digest sent");
                    }
                    Ok(DigestOutcome::Skipped) => {
                        tracing::debug!("Digest already handled for today");
                    }
                    Ok(DigestOutcome::Empty) => {
                        tracing::debug!("No HR questions today, nothing to send");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Digest run failed, retrying next cycle");
                    }
                }
            }

            tokio::time::sleep(Duration::from_secs(self.settings.check_interval_secs)).await;
        }
    }

    /// Run one digest cycle for today (in the reporting zone).
    ///
    /// `force == true` bypasses the already-sent check and re-sends, updating
    /// the existing record in place.
    pub async fn run_once(&self, force: bool) -> Result<DigestOutcome, AppError> {
        let date = Utc::now().with_timezone(&self.settings.zone).date_naive();
        let mut redis = self.redis.clone();

        let lock_key = format!("digest:run-lock:{}", date);
        // SET key "1" NX EX ttl — atomic check-and-set with TTL fallback
        let acquired: Option<String> = redis::cmd("SET")
            .arg(&lock_key)
            .arg("1")
            .arg("NX")
            .arg("EX")
            .arg(RUN_LOCK_SECONDS)
            .query_async(&mut redis)
            .await?;

        if acquired.is_none() {
            tracing::debug!(%date, "Another digest run holds the lock, skipping");
            return Ok(DigestOutcome::Skipped);
        }

        let outcome = self.run_locked(date, force).await;

        // The digest_records row is the durable guard; the lock only covers
        // the run itself. Release eagerly so a manual force-run is not stuck
        // behind the TTL. Errors leave the TTL to clean up.
        let _: Result<(), redis::RedisError> =
            redis::AsyncCommands::del(&mut redis, &lock_key).await;

        outcome
    }

    async fn run_locked(&self, date: NaiveDate, force: bool) -> Result<DigestOutcome, AppError> {
        let existing: Option<DigestRecord> =
            sqlx::query_as("SELECT * FROM digest_records WHERE digest_date = $1")
                .bind(date)
                .fetch_optional(&self.pool)
                .await?;

        if let Some(record) = existing
            && !force
        {
            tracing::debug!(%date, sent_at = %record.sent_at, "Digest already sent, skipping");
            return Ok(DigestOutcome::Skipped);
        }

        let (window_start, window_end) = day_window(date, self.settings.zone)?;
        let items: Vec<HrQuestion> = sqlx::query_as(
            "SELECT * FROM hr_questions WHERE created_at >= $1 AND created_at < $2 ORDER BY created_at",
        )
        .bind(window_start)
        .bind(window_end)
        .fetch_all(&self.pool)
        .await?;

        if items.is_empty() {
            return Ok(DigestOutcome::Empty);
        }

        let subject = report::subject(date, items.len());
        let html = report::render_html(date, &items, self.settings.zone);
        let csv = report::render_csv(&items, self.settings.zone);
        let csv_filename = format!("hr-questions-{}.csv", date);

        if let Err(e) = self
            .mailer
            .send_digest(
                &self.settings.recipient,
                &subject,
                &html,
                &csv_filename,
                &csv,
            )
            .await
        {
            RosterService::log_error(&self.pool, "digest.send", &e.to_string()).await;
            if let Some(alert) = &self.settings.alert_recipient {
                self.mailer
                    .send_alert(
                        alert,
                        &format!("HR digest delivery failed for {}", date),
                        &e.to_string(),
                    )
                    .await;
            }
            return Err(e);
        }

        let ids: Vec<Uuid> = items.iter().map(|q| q.id).collect();

        sqlx::query("UPDATE hr_questions SET emailed = true WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO digest_records (digest_date, item_count, item_ids, checksum, sent_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (digest_date)
            DO UPDATE SET item_count = $2, item_ids = $3, checksum = $4, sent_at = NOW()
            "#,
        )
        .bind(date)
        .bind(ids.len() as i32)
        .bind(&ids)
        .bind(checksum_ids(&ids))
        .execute(&self.pool)
        .await?;

        tracing::info!(%date, count = ids.len(), force, "Digest sent and recorded");
        Ok(DigestOutcome::Sent { count: ids.len() })
    }
}

/// UTC window covering one calendar day in the given zone, half-open
/// `[start, end)`. DST days resolve to the earliest valid local midnight.
pub fn day_window(date: NaiveDate, zone: Tz) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
    let start_local = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| AppError::Internal("Invalid digest date".to_string()))?;
    let next = date
        .succ_opt()
        .ok_or_else(|| AppError::Internal("Digest date out of range".to_string()))?;
    let end_local = next
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| AppError::Internal("Invalid digest date".to_string()))?;

    let start = zone
        .from_local_datetime(&start_local)
        .earliest()
        .ok_or_else(|| AppError::Internal(format!("No valid midnight for {} in {}", date, zone)))?;
    let end = zone
        .from_local_datetime(&end_local)
        .earliest()
        .ok_or_else(|| AppError::Internal(format!("No valid midnight for {} in {}", next, zone)))?;

    Ok((start.with_timezone(&Utc), end.with_timezone(&Utc)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_window_utc() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let (start, end) = day_window(date, chrono_tz::UTC).unwrap();
        assert_eq!(start.to_rfc3339(), "2024-06-03T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2024-06-04T00:00:00+00:00");
    }

    #[test]
    fn test_day_window_zoned_offset() {
        // Berlin summer time is UTC+2: local midnight is 22:00 UTC the day before
        let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let (start, end) = day_window(date, chrono_tz::Europe::Berlin).unwrap();
        assert_eq!(start.to_rfc3339(), "2024-06-02T22:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2024-06-03T22:00:00+00:00");
    }

    #[test]
    fn test_day_window_dst_transition_day_is_23_hours() {
        // Spring-forward day in Berlin: 02:00 jumps to 03:00
        let date = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let (start, end) = day_window(date, chrono_tz::Europe::Berlin).unwrap();
        assert_eq!((end - start).num_hours(), 23);
    }
}
