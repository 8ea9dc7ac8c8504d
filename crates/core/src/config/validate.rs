use super::{
    types::{AuthMethod, BrokerBackend, Config, NotifierBackend},
    ConfigError,
};

/// Validate configuration
/// Currently validates:
/// - Auth section exists (enforced by serde), api_key auth has a key
/// - Server port is not 0
/// - Drain window and pull size are positive
/// - Selected broker/notifier backends have their sections
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.auth.method == AuthMethod::ApiKey
        && config.auth.api_key.as_deref().is_none_or(str::is_empty)
    {
        return Err(ConfigError::ValidationError(
            "auth.api_key is required when auth.method = \"api_key\"".to_string(),
        ));
    }

    if config.drain.window_secs == 0 {
        return Err(ConfigError::ValidationError(
            "drain.window_secs must be greater than 0".to_string(),
        ));
    }
    if config.drain.max_messages_per_pull == 0 {
        return Err(ConfigError::ValidationError(
            "drain.max_messages_per_pull must be greater than 0".to_string(),
        ));
    }

    if config.broker.backend == BrokerBackend::Pubsub {
        let pubsub = config.broker.pubsub.as_ref().ok_or_else(|| {
            ConfigError::ValidationError(
                "[broker.pubsub] is required when broker.backend = \"pubsub\"".to_string(),
            )
        })?;
        for (field, value) in [
            ("project_id", &pubsub.project_id),
            ("topic_id", &pubsub.topic_id),
            ("subscription_id", &pubsub.subscription_id),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "broker.pubsub.{} cannot be empty",
                    field
                )));
            }
        }
    }

    if config.notifier.backend == NotifierBackend::Mailgun {
        let mailgun = config.notifier.mailgun.as_ref().ok_or_else(|| {
            ConfigError::ValidationError(
                "[notifier.mailgun] is required when notifier.backend = \"mailgun\"".to_string(),
            )
        })?;
        if mailgun.domain.is_empty() || mailgun.api_key.is_empty() {
            return Err(ConfigError::ValidationError(
                "notifier.mailgun.domain and notifier.mailgun.api_key are required".to_string(),
            ));
        }
    }

    Ok(())
}
