//! Daily HR-question digest.
//!
//! Once per calendar day (in the configured reporting zone) the scheduler
//! collects the day's HR questions, renders an HTML summary with a CSV
//! attachment, and mails it to the configured recipient. Runs are idempotent:
//! a `digest_records` row per date plus a Redis run-lock keep overlapping or
//! repeated firings from double-sending.

pub mod mailer;
pub mod report;
pub mod scheduler;
