//! Ticket model and priority attribute rules.

mod priority;
mod types;

pub use priority::{
    canonical_priority_attribute, normalize_priority_attribute, rank, PRIORITY_ATTRIBUTE,
    UNKNOWN_RANK,
};
pub use types::{Ticket, TicketPriority, TicketStatus};
