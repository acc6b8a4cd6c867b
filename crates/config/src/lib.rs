//! Configuration loading for the gateway: layered TOML + environment
//! variables, `.env` support, and boot-time validation.

pub mod loader;
pub mod settings;

pub use loader::load;
pub use settings::{ConfigValidationError, GatewaySettings, HighAvailabilityStrategy};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
