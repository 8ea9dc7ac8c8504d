//! Technician recipient lookup.

use async_trait::async_trait;

use super::NotifyError;

/// Resolves the set of technicians that receive notifications.
#[async_trait]
pub trait TechnicianDirectory: Send + Sync {
    async fn technicians(&self) -> Result<Vec<String>, NotifyError>;
}

/// Fixed technician list, typically from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticTechnicianDirectory {
    emails: Vec<String>,
}

impl StaticTechnicianDirectory {
    /// Blank entries are dropped and duplicates collapsed, keeping first-seen order.
    pub fn new(emails: Vec<String>) -> Self {
        let mut unique: Vec<String> = Vec::with_capacity(emails.len());
        for email in emails {
            let email = email.trim().to_string();
            if !email.is_empty() && !unique.contains(&email) {
                unique.push(email);
            }
        }
        Self { emails: unique }
    }
}

#[async_trait]
impl TechnicianDirectory for StaticTechnicianDirectory {
    async fn technicians(&self) -> Result<Vec<String>, NotifyError> {
        Ok(self.emails.clone())
    }
}
