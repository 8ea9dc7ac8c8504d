//! Mock notifier for testing.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::notifier::{Notification, Notifier, NotifyError};

/// Mock implementation of the Notifier trait.
///
/// Records every delivered notification and fails for configured ticket ids.
#[derive(Debug, Clone, Default)]
pub struct MockNotifier {
    sent: Arc<RwLock<Vec<Notification>>>,
    attempts: Arc<RwLock<Vec<String>>>,
    failing_tickets: Arc<RwLock<HashSet<String>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications for `ticket_id` fail with a rejection.
    pub async fn fail_for_ticket(&self, ticket_id: &str) {
        self.failing_tickets
            .write()
            .await
            .insert(ticket_id.to_string());
    }

    /// Successfully delivered notifications, in order.
    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.read().await.clone()
    }

    /// Ticket ids of every notify call (successful or not), in order.
    pub async fn attempts(&self) -> Vec<String> {
        self.attempts.read().await.clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.attempts
            .write()
            .await
            .push(notification.ticket_id.clone());

        if self
            .failing_tickets
            .read()
            .await
            .contains(&notification.ticket_id)
        {
            return Err(NotifyError::Rejected(format!(
                "mock failure for {}",
                notification.ticket_id
            )));
        }

        self.sent.write().await.push(notification.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
