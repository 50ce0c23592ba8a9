use anyhow::Context;

use crate::domain::repository::Mailer;
use crate::error::AuthServiceError;

const RESEND_URL: &str = "https://api.resend.com/emails";

#[derive(Clone)]
pub struct ResendCredentials {
    pub api_key: String,
    pub from: String,
}

/// Outbound mail via Resend. Without credentials (local development) the
/// code is logged instead of sent.
#[derive(Clone)]
pub struct ResendMailer {
    http: reqwest::Client,
    credentials: Option<ResendCredentials>,
}

impl ResendMailer {
    pub fn new(credentials: Option<ResendCredentials>) -> Self {
        Self {
            http: reqwest::Client::new(),
            credentials,
        }
    }
}

impl Mailer for ResendMailer {
    async fn send_code(&self, email: &str, code: &str) -> Result<(), AuthServiceError> {
        let Some(credentials) = &self.credentials else {
            tracing::info!(email, code, "mail credentials not configured, logging code");
            return Ok(());
        };

        let body = serde_json::json!({
            "from": credentials.from,
            "to": [email],
            "subject": "Din inloggningskod till Brännbollsarkivet",
            "text": format!(
                "Din inloggningskod är {code}. Den gäller i 10 minuter.\n\n\
                 Har du inte försökt logga in kan du ignorera det här mejlet."
            ),
        });

        self.http
            .post(RESEND_URL)
            .bearer_auth(&credentials.api_key)
            .json(&body)
            .send()
            .await
            .context("failed to reach mail provider")?
            .error_for_status()
            .context("mail provider rejected the send")?;
        Ok(())
    }
}
