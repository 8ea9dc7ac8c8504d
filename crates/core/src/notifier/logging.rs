//! Notifier that only writes to the log.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::{Notification, Notifier, NotifyError, TechnicianDirectory};

/// Logs one line per technician instead of sending mail.
pub struct LogNotifier {
    directory: Arc<dyn TechnicianDirectory>,
}

impl LogNotifier {
    pub fn new(directory: Arc<dyn TechnicianDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        for recipient in self.directory.technicians().await? {
            info!(
                ticket_id = %notification.ticket_id,
                recipient = %recipient,
                subject = %notification.subject,
                "Notification (log only)"
            );
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::StaticTechnicianDirectory;

    #[tokio::test]
    async fn test_log_notifier_always_succeeds() {
        let notifier = LogNotifier::new(Arc::new(StaticTechnicianDirectory::new(vec![
            "tech@example.com".to_string(),
        ])));
        let notification = Notification {
            subject: "New Ticket | ID: 1".to_string(),
            body: "body".to_string(),
            ticket_id: "1".to_string(),
        };
        assert!(notifier.notify(&notification).await.is_ok());
    }
}
