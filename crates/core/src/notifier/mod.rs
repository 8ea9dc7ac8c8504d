//! Technician notifications for newly admitted tickets.

mod directory;
mod logging;
mod mailgun;

pub use directory::{StaticTechnicianDirectory, TechnicianDirectory};
pub use logging::LogNotifier;
pub use mailgun::MailgunNotifier;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::config::{NotifierBackend, NotifierConfig};
use crate::ticket::Ticket;

#[derive(Debug, Clone, Error)]
pub enum NotifyError {
    #[error("Notifier connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Notifier request timed out")]
    Timeout,

    #[error("Notifier rejected message: {0}")]
    Rejected(String),

    #[error("Notifier configuration error: {0}")]
    Configuration(String),
}

/// One outgoing notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    /// Ticket the notification is about, for log correlation.
    pub ticket_id: String,
}

impl Notification {
    /// The "new ticket" notification sent to technicians on admission.
    pub fn new_ticket(ticket: &Ticket) -> Self {
        Self {
            subject: format!("New Ticket | ID: {}", ticket.id),
            body: format!(
                "Dear Technicians,\r\n\r\nA new Ticket has been raised by {} regarding `{}`",
                ticket.submitted_by_email, ticket.title
            ),
            ticket_id: ticket.id.clone(),
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a notification to every technician.
    ///
    /// Having no technicians to notify is not an error.
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;

    /// Backend name, for logs.
    fn name(&self) -> &'static str;
}

/// Build the configured notifier with a static technician list.
pub fn create_notifier(config: &NotifierConfig) -> Result<Arc<dyn Notifier>, NotifyError> {
    let directory: Arc<dyn TechnicianDirectory> =
        Arc::new(StaticTechnicianDirectory::new(config.technicians.clone()));

    match config.backend {
        NotifierBackend::Log => Ok(Arc::new(LogNotifier::new(directory))),
        NotifierBackend::Mailgun => {
            let mailgun = config.mailgun.clone().ok_or_else(|| {
                NotifyError::Configuration(
                    "notifier.mailgun must be set for the mailgun backend".to_string(),
                )
            })?;
            Ok(Arc::new(MailgunNotifier::new(mailgun, directory)))
        }
    }
}
