//! Resend mailer — delivers the digest email over the Resend HTTP API.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Serialize;

use herald_common::error::AppError;

const RESEND_BASE_URL: &str = "https://api.resend.com";
const MAIL_TIMEOUT_SECS: u64 = 30;

#[derive(Serialize)]
struct Attachment<'a> {
    filename: &'a str,
    /// Base64-encoded file content, per the Resend attachment contract.
    content: String,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    html: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<Attachment<'a>>,
}

pub struct ResendMailer {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    from: String,
}

impl ResendMailer {
    pub fn new(api_key: String, from: String) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(MAIL_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            base_url: RESEND_BASE_URL.to_string(),
            api_key,
            from,
        }
    }

    /// Point the mailer at a different API endpoint (used by tests).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Send the digest mail: inline HTML body plus a CSV attachment.
    pub async fn send_digest(
        &self,
        to: &str,
        subject: &str,
        html: &str,
        csv_filename: &str,
        csv_content: &str,
    ) -> Result<(), AppError> {
        let request = SendRequest {
            from: &self.from,
            to: vec![to],
            subject,
            html: Some(html),
            text: None,
            attachments: vec![Attachment {
                filename: csv_filename,
                content: BASE64.encode(csv_content),
            }],
        };
        self.send(&request).await
    }

    /// Best-effort plain-text operator alert. Failures are logged, never
    /// propagated: the alert must not mask the failure it reports.
    pub async fn send_alert(&self, to: &str, subject: &str, body: &str) {
        let request = SendRequest {
            from: &self.from,
            to: vec![to],
            subject,
            html: None,
            text: Some(body),
            attachments: vec![],
        };

        if let Err(e) = self.send(&request).await {
            tracing::error!(error = %e, "Failed to send operator alert email");
        }
    }

    async fn send(&self, request: &SendRequest<'_>) -> Result<(), AppError> {
        let url = format!("{}/emails", self.base_url);

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("Mail request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::Gateway(format!(
                "Mail API returned {}: {}",
                status, detail
            )));
        }

        tracing::info!(subject = request.subject, "Email accepted by mail API");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_send_digest_posts_base64_attachment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .and(header("Authorization", "Bearer re_test"))
            .and(body_partial_json(serde_json::json!({
                "from": "herald@acme.test",
                "to": ["hr@acme.test"],
                "subject": "HR digest 2024-06-03 — 1 open question",
                "attachments": [{
                    "filename": "digest.csv",
                    "content": BASE64.encode("a,b\n1,2\n"),
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "mail-1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mailer = ResendMailer::new("re_test".to_string(), "herald@acme.test".to_string())
            .with_base_url(server.uri());
        mailer
            .send_digest(
                "hr@acme.test",
                "HR digest 2024-06-03 — 1 open question",
                "<html></html>",
                "digest.csv",
                "a,b\n1,2\n",
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_send_digest_maps_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(ResponseTemplate::new(422).set_body_string("invalid from"))
            .mount(&server)
            .await;

        let mailer = ResendMailer::new("re_test".to_string(), "bogus".to_string())
            .with_base_url(server.uri());
        let result = mailer
            .send_digest("hr@acme.test", "s", "<html></html>", "d.csv", "x")
            .await;

        match result {
            Err(AppError::Gateway(msg)) => assert!(msg.contains("422")),
            other => panic!("expected gateway error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_send_alert_swallows_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mailer = ResendMailer::new("re_test".to_string(), "herald@acme.test".to_string())
            .with_base_url(server.uri());
        // Must not panic or propagate
        mailer.send_alert("ops@acme.test", "digest failed", "detail").await;
    }
}
