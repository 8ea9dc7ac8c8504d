use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Prefix of environment variables that override the config file.
pub const ENV_PREFIX: &str = "TICKETLINE_";

/// Separates nested sections in override names. Field names such as
/// `ttl_secs` contain single underscores, so a single `_` cannot be used.
const ENV_SECTION_SEPARATOR: &str = "__";

/// Load the ticketline config file, then apply environment overrides.
///
/// `TICKETLINE_DRAIN__WINDOW_SECS=3` overrides `[drain] window_secs` and
/// `TICKETLINE_BROKER__PUBSUB__ACCESS_TOKEN` supplies the Pub/Sub token
/// without writing it to disk.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split(ENV_SECTION_SEPARATOR))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Parse a config from TOML text only, ignoring the environment.
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}
