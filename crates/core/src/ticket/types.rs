//! Core ticket data types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ============================================================================
// Priority
// ============================================================================

/// Ticket priority as stored on the ticket itself.
///
/// Decoding is lenient: any casing of `high`, `medium` or `low` is accepted,
/// and anything else (including `null`) becomes [`TicketPriority::Medium`].
/// Serialization always uses the capitalized form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum TicketPriority {
    High,
    #[default]
    Medium,
    Low,
}

impl TicketPriority {
    /// Parse free-form user input, falling back to `Medium`.
    pub fn from_input(input: &str) -> Self {
        match input.trim().to_lowercase().as_str() {
            "high" => TicketPriority::High,
            "low" => TicketPriority::Low,
            _ => TicketPriority::Medium,
        }
    }

    /// Canonical capitalized name.
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketPriority::High => "High",
            TicketPriority::Medium => "Medium",
            TicketPriority::Low => "Low",
        }
    }
}

impl fmt::Display for TicketPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TicketPriority {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TicketPriority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw
            .as_deref()
            .map(TicketPriority::from_input)
            .unwrap_or_default())
    }
}

// ============================================================================
// Status
// ============================================================================

/// Lifecycle status of a ticket.
///
/// `Queued` while it only exists on the broker, `Open` once admitted into the
/// live cache, `Closed` once archived.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum TicketStatus {
    #[default]
    Queued,
    Open,
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Queued => "Queued",
            TicketStatus::Open => "Open",
            TicketStatus::Closed => "Closed",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Ticket
// ============================================================================

/// A helpdesk ticket.
///
/// This is the shape carried in broker payloads, in the cache snapshot and in
/// the archive. `id` is the deduplication key and never changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    /// Globally unique identifier (UUID v4 string).
    #[serde(alias = "ticketId", alias = "TicketId")]
    pub id: String,
    #[serde(default, alias = "Title")]
    pub title: String,
    #[serde(default, alias = "Description")]
    pub description: String,
    #[serde(default, alias = "Priority")]
    pub priority: TicketPriority,
    #[serde(default, alias = "Status")]
    pub status: TicketStatus,
    /// When the ticket was submitted. Set once.
    #[serde(alias = "SubmittedAt")]
    pub submitted_at: DateTime<Utc>,
    /// Creator identity, also the archive partition key.
    #[serde(default, alias = "SubmittedByEmail")]
    pub submitted_by_email: String,
    /// Already-uploaded attachment URLs, in submission order.
    #[serde(default, alias = "ImageUrls")]
    pub image_urls: Vec<String>,
}

impl Ticket {
    /// Create a freshly submitted ticket with a new id and `Queued` status.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        priority: TicketPriority,
        submitted_by_email: impl Into<String>,
        image_urls: Vec<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            description: description.into(),
            priority,
            status: TicketStatus::Queued,
            submitted_at: Utc::now(),
            submitted_by_email: submitted_by_email.into(),
            image_urls,
        }
    }

    /// Return a copy with a different status.
    pub fn with_status(mut self, status: TicketStatus) -> Self {
        self.status = status;
        self
    }

    /// Encode as a broker payload (UTF-8 JSON).
    pub fn to_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Decode a broker payload.
    pub fn from_payload(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }
}
