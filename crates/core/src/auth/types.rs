use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;

/// Header carrying the end user's email, set by the upstream identity proxy.
pub const USER_EMAIL_HEADER: &str = "x-user-email";

/// Request information for authentication
#[derive(Debug, Clone)]
pub struct AuthRequest {
    /// Header names are lower-cased.
    pub headers: HashMap<String, String>,
    pub source_ip: IpAddr,
}

impl AuthRequest {
    /// Email forwarded by the identity proxy, if present and non-blank.
    pub fn user_email(&self) -> Option<&str> {
        self.headers
            .get(USER_EMAIL_HEADER)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }
}

/// Authenticated identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub method: String,
    /// Submitter email; tickets can only be raised when this is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub claims: HashMap<String, serde_json::Value>,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self {
            user_id: "anonymous".to_string(),
            method: "none".to_string(),
            email: None,
            claims: HashMap::new(),
        }
    }

    /// Identity for a user known only by email.
    pub fn for_email(email: &str, method: &str) -> Self {
        Self {
            user_id: email.to_string(),
            method: method.to_string(),
            email: Some(email.to_string()),
            claims: HashMap::new(),
        }
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}
