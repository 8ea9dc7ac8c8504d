pub mod archive;
pub mod auth;
pub mod broker;
pub mod cache;
pub mod config;
pub mod metrics;
pub mod notifier;
pub mod pipeline;
pub mod testing;
pub mod ticket;

pub use archive::{ArchiveError, ArchiveStore, SqliteArchiveStore};
pub use auth::{
    create_authenticator, AuthError, AuthRequest, Authenticator, Identity, NoneAuthenticator,
};
pub use broker::{
    create_message_source, BrokerError, InMemoryBroker, MessageSource, PubSubClient,
    TicketPublisher,
};
pub use cache::{
    create_cache_store, CacheError, CacheStore, MemoryCacheStore, SqliteCacheStore, SNAPSHOT_KEY,
};
pub use config::{
    load_config, load_config_from_str, validate_config, AuthMethod, Config, ConfigError,
    SanitizedConfig,
};
pub use notifier::{create_notifier, Notification, Notifier, NotifyError};
pub use pipeline::{
    CloseOutcome, IngestLoop, IngestStatus, NewTicket, PipelineError, PipelineSettings,
    RefreshReport, SubmitError, SubmitOutcome, TicketPipeline,
};
pub use ticket::{Ticket, TicketPriority, TicketStatus};
