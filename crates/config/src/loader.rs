//! Layered configuration loading: embedded defaults, overridden by an
//! optional file, overridden again by `GATEWAY_`-prefixed environment
//! variables. `.env` is loaded first via `dotenvy` so secrets referenced
//! from the environment (backend API keys, tool header `$ENV_VAR`
//! expansions) are visible uniformly regardless of how they reached the
//! process.

use crate::settings::GatewaySettings;
use crate::ConfigError;
use std::path::Path;

const DEFAULT_CONFIG_PATH: &str = "config/gateway.toml";
const ENV_PREFIX: &str = "GATEWAY";

/// Load settings from `.env` + an optional config file path + the
/// environment, then run [`GatewaySettings::validate`].
pub fn load(config_path: Option<&Path>) -> Result<GatewaySettings, ConfigError> {
    // Populate std::env from a `.env` file if present. Absence is not
    // an error -- most deployments pass real environment variables.
    if let Err(err) = dotenvy::dotenv() {
        if !matches!(err, dotenvy::Error::Io(ref io) if io.kind() == std::io::ErrorKind::NotFound)
        {
            tracing::warn!(error = %err, "failed to load .env file");
        }
    }

    let path = config_path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH).to_path_buf());

    let mut builder = config::Config::builder();
    if path.exists() {
        builder = builder.add_source(config::File::from(path.as_path()));
    } else {
        tracing::info!(path = %path.display(), "no config file found, using defaults + environment only");
    }
    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true),
    );

    let raw = builder.build()?;
    let settings: GatewaySettings = raw.try_deserialize()?;
    settings
        .validate()
        .map_err(|e| ConfigError::InvalidValue {
            field: "GatewaySettings".to_string(),
            message: e.to_string(),
        })?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_from_explicit_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            primary_backend_name = "a"

            [[llm_backends]]
            name = "a"
            type = "openai-compatible"
            base_url = "https://a.example.com"
            default_model = "gpt-test"
            auto_load = true
            "#
        )
        .unwrap();

        let settings = load(Some(file.path())).unwrap();
        assert_eq!(settings.llm_backends.len(), 1);
        assert_eq!(settings.primary_backend_name.as_deref(), Some("a"));
        // untouched field still carries its default
        assert_eq!(settings.agent_model_prefix, "harpou-agent/");
    }

    #[test]
    fn missing_file_falls_back_to_defaults_and_then_fails_validation() {
        let result = load(Some(Path::new("/nonexistent/gateway.toml")));
        // No backends configured anywhere -> validation error, not a
        // file-not-found error, matching the "missing file is not
        // itself an error" policy above.
        assert!(result.is_err());
    }
}
