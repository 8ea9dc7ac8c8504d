//! Mailgun HTTP API notifier.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use crate::config::MailgunConfig;
use crate::metrics::record_external_call;

use super::{Notification, Notifier, NotifyError, TechnicianDirectory};

/// Sends one message addressed to every technician via Mailgun.
pub struct MailgunNotifier {
    client: Client,
    config: MailgunConfig,
    directory: Arc<dyn TechnicianDirectory>,
}

impl MailgunNotifier {
    /// Create a new notifier with the given configuration.
    pub fn new(config: MailgunConfig, directory: Arc<dyn TechnicianDirectory>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            config,
            directory,
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/v3/{}/messages",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(&self.config.domain)
        )
    }

    fn form_fields(
        &self,
        notification: &Notification,
        recipients: &[String],
    ) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("from", self.config.from.clone()),
            ("subject", notification.subject.clone()),
            ("text", notification.body.clone()),
            ("v:ticket_id", notification.ticket_id.clone()),
        ];
        fields.extend(recipients.iter().map(|r| ("to", r.clone())));
        fields
    }
}

#[async_trait]
impl Notifier for MailgunNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let recipients = self.directory.technicians().await?;
        if recipients.is_empty() {
            debug!(ticket_id = %notification.ticket_id, "No technicians to notify");
            return Ok(());
        }

        let start = Instant::now();
        let result = self
            .client
            .post(self.messages_url())
            .basic_auth("api", Some(&self.config.api_key))
            .form(&self.form_fields(notification, &recipients))
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                record_external_call("mailgun", "send", false, start.elapsed());
                return Err(if e.is_timeout() {
                    NotifyError::Timeout
                } else if e.is_connect() {
                    NotifyError::ConnectionFailed(e.to_string())
                } else {
                    NotifyError::Rejected(e.to_string())
                });
            }
        };

        let success = response.status().is_success();
        record_external_call("mailgun", "send", success, start.elapsed());

        if !success {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        for recipient in &recipients {
            info!(
                ticket_id = %notification.ticket_id,
                recipient = %recipient,
                subject = %notification.subject,
                "Sent notification email"
            );
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mailgun"
    }
}
