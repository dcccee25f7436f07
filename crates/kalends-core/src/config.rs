use std::path::PathBuf;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, FileFormat};
use serde::Deserialize;

use crate::error::{CoreError, CoreResult};

/// Lines handed to the assembler per cooperative turn when none is configured.
pub const DEFAULT_CHUNK_LINES: u32 = 500;

/// Enumeration cap applied to a single expansion call when none is configured.
pub const DEFAULT_MAX_INSTANCES: u16 = 10_000;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub timezone: TimezoneConfig,
    #[serde(default)]
    pub parser: ParserConfig,
    #[serde(default)]
    pub expansion: ExpansionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimezoneConfig {
    /// IANA zone used for floating values. Guessed from the host when unset.
    pub host_zone: Option<String>,
    /// JSON file replacing the built-in legacy alias table.
    pub alias_table: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParserConfig {
    pub chunk_lines: u32,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            chunk_lines: DEFAULT_CHUNK_LINES,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExpansionConfig {
    pub max_instances: u16,
    pub locale: String,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            max_instances: DEFAULT_MAX_INSTANCES,
            locale: "en".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Settings {
    /// ## Summary
    /// Returns a config builder pre-populated with every default.
    ///
    /// ## Errors
    /// Returns an error if a default cannot be registered.
    pub fn builder() -> CoreResult<ConfigBuilder<DefaultState>> {
        Ok(Config::builder()
            .set_default("parser.chunk_lines", i64::from(DEFAULT_CHUNK_LINES))?
            .set_default("expansion.max_instances", i64::from(DEFAULT_MAX_INSTANCES))?
            .set_default("expansion.locale", "en")?
            .set_default("logging.level", "info")?)
    }

    /// ## Summary
    /// Loads configuration from `kalends.toml` and `KALENDS__*` environment variables.
    /// Environment variables take precedence over the file.
    ///
    /// ## Errors
    /// Returns an error if building, deserializing or validating the configuration fails.
    pub fn load() -> CoreResult<Self> {
        let settings = Self::builder()?
            // TOML file
            .add_source(config::File::with_name("kalends").required(false))
            // Env vars, e.g. KALENDS__TIMEZONE__HOST_ZONE
            .add_source(
                config::Environment::with_prefix("KALENDS")
                    .prefix_separator("__")
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<Settings>()?;
        settings.validate()?;
        Ok(settings)
    }

    /// ## Summary
    /// Builds settings from an in-memory TOML document layered over the defaults.
    ///
    /// ## Errors
    /// Returns an error if the document is malformed or fails validation.
    pub fn from_toml_str(source: &str) -> CoreResult<Self> {
        let settings = Self::builder()?
            .add_source(config::File::from_str(source, FileFormat::Toml))
            .build()?
            .try_deserialize::<Settings>()?;
        settings.validate()?;
        Ok(settings)
    }

    /// ## Summary
    /// Rejects settings that would stall parsing or expansion.
    ///
    /// ## Errors
    /// Returns [`CoreError::ValidationError`] naming the offending key.
    pub fn validate(&self) -> CoreResult<()> {
        if self.parser.chunk_lines == 0 {
            return Err(CoreError::ValidationError(
                "parser.chunk_lines must be at least 1".to_string(),
            ));
        }
        if self.expansion.max_instances == 0 {
            return Err(CoreError::ValidationError(
                "expansion.max_instances must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> CoreResult<Settings> {
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!(error = %e, "No .env file loaded");
    }

    Settings::load()
}
