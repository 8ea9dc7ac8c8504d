use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::pipeline::{DrainConfig, IngestConfig};

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub drain: DrainConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    /// Required when method = "api_key"
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    None,
    ApiKey,
}

/// Database configuration (SQLite file shared by the cache and the archive)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("ticketline.db")
}

// =============================================================================
// Broker
// =============================================================================

/// Message broker configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BrokerConfig {
    #[serde(default)]
    pub backend: BrokerBackend,
    /// Publish priority attributes as "High"/"Medium"/"Low" instead of the
    /// lower-cased input.
    #[serde(default)]
    pub capitalize_priority: bool,
    /// Pub/Sub configuration (required when backend = "pubsub")
    #[serde(default)]
    pub pubsub: Option<PubSubConfig>,
}

/// Available broker backends
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BrokerBackend {
    /// In-process queue, lost on restart
    #[default]
    Memory,
    /// Google Cloud Pub/Sub REST API (or its emulator)
    Pubsub,
}

/// Google Cloud Pub/Sub configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PubSubConfig {
    pub project_id: String,
    pub topic_id: String,
    pub subscription_id: String,
    /// API endpoint; point at the emulator for local runs
    #[serde(default = "default_pubsub_endpoint")]
    pub endpoint: String,
    /// OAuth2 bearer token (not needed for the emulator)
    #[serde(default)]
    pub access_token: Option<String>,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_pubsub_endpoint() -> String {
    "https://pubsub.googleapis.com".to_string()
}

fn default_timeout() -> u32 {
    30
}

// =============================================================================
// Cache
// =============================================================================

/// Open-ticket cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackend,
    /// Sliding expiration applied on every write (default: 7 days)
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            ttl_secs: default_cache_ttl(),
        }
    }
}

fn default_cache_ttl() -> u64 {
    7 * 24 * 60 * 60
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    Memory,
    #[default]
    Sqlite,
}

// =============================================================================
// Notifier
// =============================================================================

/// Technician notification configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NotifierConfig {
    #[serde(default)]
    pub backend: NotifierBackend,
    /// Technician email addresses that receive new-ticket notifications
    #[serde(default)]
    pub technicians: Vec<String>,
    /// Mailgun configuration (required when backend = "mailgun")
    #[serde(default)]
    pub mailgun: Option<MailgunConfig>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotifierBackend {
    /// Only log notifications
    #[default]
    Log,
    Mailgun,
}

/// Mailgun HTTP API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MailgunConfig {
    /// Sending domain (e.g. "mg.example.com")
    pub domain: String,
    pub api_key: String,
    /// Sender address
    pub from: String,
    #[serde(default = "default_mailgun_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_mailgun_url() -> String {
    "https://api.mailgun.net".to_string()
}

// =============================================================================
// Sanitized views
// =============================================================================

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub auth: SanitizedAuthConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub broker: SanitizedBrokerConfig,
    pub cache: CacheConfig,
    pub drain: DrainConfig,
    pub ingest: IngestConfig,
    pub notifier: SanitizedNotifierConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub method: String,
}

/// Sanitized broker config (access token hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedBrokerConfig {
    pub backend: BrokerBackend,
    pub capitalize_priority: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pubsub: Option<SanitizedPubSubConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedPubSubConfig {
    pub project_id: String,
    pub topic_id: String,
    pub subscription_id: String,
    pub endpoint: String,
    pub access_token_configured: bool,
    pub timeout_secs: u32,
}

/// Sanitized notifier config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedNotifierConfig {
    pub backend: NotifierBackend,
    pub technician_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mailgun: Option<SanitizedMailgunConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedMailgunConfig {
    pub domain: String,
    pub from: String,
    pub base_url: String,
    pub api_key_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            auth: SanitizedAuthConfig {
                method: match config.auth.method {
                    AuthMethod::None => "none".to_string(),
                    AuthMethod::ApiKey => "api_key".to_string(),
                },
            },
            server: config.server.clone(),
            database: config.database.clone(),
            broker: SanitizedBrokerConfig {
                backend: config.broker.backend,
                capitalize_priority: config.broker.capitalize_priority,
                pubsub: config.broker.pubsub.as_ref().map(|p| SanitizedPubSubConfig {
                    project_id: p.project_id.clone(),
                    topic_id: p.topic_id.clone(),
                    subscription_id: p.subscription_id.clone(),
                    endpoint: p.endpoint.clone(),
                    access_token_configured: p
                        .access_token
                        .as_ref()
                        .is_some_and(|t| !t.is_empty()),
                    timeout_secs: p.timeout_secs,
                }),
            },
            cache: config.cache.clone(),
            drain: config.drain.clone(),
            ingest: config.ingest.clone(),
            notifier: SanitizedNotifierConfig {
                backend: config.notifier.backend,
                technician_count: config.notifier.technicians.len(),
                mailgun: config.notifier.mailgun.as_ref().map(|m| SanitizedMailgunConfig {
                    domain: m.domain.clone(),
                    from: m.from.clone(),
                    base_url: m.base_url.clone(),
                    api_key_configured: !m.api_key.is_empty(),
                }),
            },
        }
    }
}
