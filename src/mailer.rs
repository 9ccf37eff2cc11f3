use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

/// An outgoing notification email.
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Mailer
///
/// Contract for outgoing mail. Sending is best-effort everywhere it is used:
/// a failed notification never fails the request that triggered it, so the
/// trait reports success as a plain bool and implementations log the details.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> bool;
}

pub type MailerState = Arc<dyn Mailer>;

/// HttpMailer
///
/// Delivers through an HTTP relay (the JSON transactional-mail API the portal
/// uses in production).
#[derive(Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    relay_url: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(relay_url: String, api_key: String, from: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            relay_url,
            api_key,
            from,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: OutgoingEmail) -> bool {
        #[derive(Serialize)]
        struct RelayPayload<'a> {
            from: &'a str,
            to: &'a str,
            subject: &'a str,
            body: &'a str,
        }

        let payload = RelayPayload {
            from: &self.from,
            to: &email.to,
            subject: &email.subject,
            body: &email.body,
        };

        let result = self
            .client
            .post(&self.relay_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                tracing::warn!("mail relay rejected message to {}: {}", email.to, resp.status());
                false
            }
            Err(err) => {
                tracing::warn!("mail relay unreachable: {err}");
                false
            }
        }
    }
}

/// NoopMailer
///
/// Stands in when no relay is configured (local runs and tests). Logs what it
/// would have sent.
#[derive(Clone, Default)]
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, email: OutgoingEmail) -> bool {
        tracing::info!("mail (noop): to={} subject={}", email.to, email.subject);
        true
    }
}
