use anyhow::{Context, Result};
use chrono::{NaiveTime, Timelike};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

const APP_DIR_NAME: &str = "stormwatch";
const CONFIG_FILE_NAME: &str = "config.toml";
const RECORD_FILE_NAME: &str = "user.json";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory (not persisted)
    #[serde(skip, default = "default_config_dir")]
    pub config_dir: PathBuf,

    /// Weather provider settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Severity thresholds and storm vocabulary
    #[serde(default)]
    pub severity: SeverityConfig,

    /// Local time window in which the hourly forecast is also checked
    #[serde(default)]
    pub forecast_window: ForecastWindowConfig,

    /// SMS gateway settings
    #[serde(default)]
    pub sms: SmsConfig,

    /// Email relay settings
    #[serde(default)]
    pub email: EmailConfig,

    /// User record storage
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Base URL of the OpenWeather API (geocoding and One Call live under it)
    #[serde(default = "default_weather_api_base_url")]
    pub api_base_url: String,

    /// Interval between scheduled checks in minutes
    #[serde(default = "default_refresh_minutes")]
    pub refresh_minutes: u32,

    /// How many hourly forecast entries the morning check looks at
    #[serde(default = "default_forecast_hours")]
    pub forecast_hours: usize,

    /// HTTP request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_weather_api_base_url() -> String {
    "https://api.openweathermap.org".to_string()
}

fn default_refresh_minutes() -> u32 {
    30
}

fn default_forecast_hours() -> usize {
    12
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_weather_api_base_url(),
            refresh_minutes: default_refresh_minutes(),
            forecast_hours: default_forecast_hours(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Thresholds used by the severity classifier.
///
/// The cutoffs are tunable because there is no single agreed definition of
/// "severe"; the defaults are the Beaufort gale threshold and the usual
/// meteorological cutoff for heavy rain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityConfig {
    /// Terms that mark a description as a storm-type condition
    #[serde(default = "default_severe_keywords")]
    pub keywords: Vec<String>,

    /// Wind speed (m/s) above which conditions are severe
    #[serde(default = "default_wind_speed_threshold")]
    pub wind_speed_threshold_mps: f64,

    /// Precipitation (mm over the last hour) above which conditions are severe
    #[serde(default = "default_precipitation_threshold")]
    pub precipitation_threshold_mm: f64,
}

fn default_severe_keywords() -> Vec<String> {
    [
        "thunderstorm",
        "tornado",
        "hurricane",
        "extreme",
        "squall",
        "blizzard",
        "volcanic ash",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_wind_speed_threshold() -> f64 {
    17.2
}

fn default_precipitation_threshold() -> f64 {
    7.6
}

impl Default for SeverityConfig {
    fn default() -> Self {
        Self {
            keywords: default_severe_keywords(),
            wind_speed_threshold_mps: default_wind_speed_threshold(),
            precipitation_threshold_mm: default_precipitation_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastWindowConfig {
    /// Whether the morning forecast check runs at all
    #[serde(default = "default_forecast_enabled")]
    pub enabled: bool,

    /// Local hour at which the window opens (0-23)
    #[serde(default = "default_forecast_start_hour")]
    pub start_hour: u32,

    /// Local minute at which the window opens (0-59)
    #[serde(default)]
    pub start_minute: u32,

    /// Window length in minutes
    #[serde(default = "default_forecast_length")]
    pub length_minutes: u32,
}

fn default_forecast_enabled() -> bool {
    true
}

fn default_forecast_start_hour() -> u32 {
    5
}

fn default_forecast_length() -> u32 {
    30
}

impl Default for ForecastWindowConfig {
    fn default() -> Self {
        Self {
            enabled: default_forecast_enabled(),
            start_hour: default_forecast_start_hour(),
            start_minute: 0,
            length_minutes: default_forecast_length(),
        }
    }
}

impl ForecastWindowConfig {
    /// Returns true if `time` falls inside the window (both ends inclusive).
    /// Windows that run past midnight wrap around; a window of a day or more
    /// contains every time.
    pub fn contains(&self, time: NaiveTime) -> bool {
        const DAY_MINUTES: u32 = 24 * 60;

        if !self.enabled {
            return false;
        }
        if self.length_minutes >= DAY_MINUTES {
            return true;
        }
        let start = self.start_hour.min(23) * 60 + self.start_minute.min(59);
        let end = start + self.length_minutes;
        let now = time.hour() * 60 + time.minute();

        if end < DAY_MINUTES {
            (start..=end).contains(&now)
        } else {
            now >= start || now <= end - DAY_MINUTES
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    /// Base URL of the Twilio REST API
    #[serde(default = "default_sms_api_base_url")]
    pub api_base_url: String,
}

fn default_sms_api_base_url() -> String {
    "https://api.twilio.com".to_string()
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_sms_api_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// SMTP relay host (implicit TLS)
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,

    /// SMTP relay port
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    /// Subject line for alert emails
    #[serde(default = "default_email_subject")]
    pub subject: String,
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    465
}

fn default_email_subject() -> String {
    "Severe Weather Alert".to_string()
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            subject: default_email_subject(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Where the user record lives. Defaults to `<config_dir>/user.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_path: Option<PathBuf>,
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            weather: WeatherConfig::default(),
            severity: SeverityConfig::default(),
            forecast_window: ForecastWindowConfig::default(),
            sms: SmsConfig::default(),
            email: EmailConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, writing defaults there if the file is missing
    pub fn load_from(path: &Path) -> Result<Self> {
        let config_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(default_config_dir);

        if !path.exists() {
            let config = Self {
                config_dir,
                ..Self::default()
            };
            config.save_to(path)?;
            tracing::info!("Wrote default configuration to {}", path.display());
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;

        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
            .context("Failed to parse config file")?;
        config.config_dir = config_dir;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated(path: Option<&Path>) -> Result<(Self, ValidationResult)> {
        let config = match path {
            Some(p) => Self::load_from(p)?,
            None => Self::load()?,
        };
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    ///
    /// Returns a ValidationResult containing any errors or warnings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.weather.api_base_url, "weather.api_base_url", &mut result);
        self.validate_url(&self.sms.api_base_url, "sms.api_base_url", &mut result);

        if self.weather.refresh_minutes == 0 {
            result.add_error(
                "weather.refresh_minutes",
                "Refresh interval must be greater than 0",
            );
        } else if self.weather.refresh_minutes > 1440 {
            result.add_warning(
                "weather.refresh_minutes",
                "Refresh interval is more than 24 hours",
            );
        }

        if self.weather.forecast_hours > 48 {
            result.add_warning(
                "weather.forecast_hours",
                "The provider only returns 48 hourly entries; extra hours are ignored",
            );
        }

        if self.weather.request_timeout_secs == 0 {
            result.add_error(
                "weather.request_timeout_secs",
                "Request timeout must be greater than 0",
            );
        }

        // Thresholds
        let wind = self.severity.wind_speed_threshold_mps;
        if !wind.is_finite() || wind < 0.0 {
            result.add_error(
                "severity.wind_speed_threshold_mps",
                "Threshold must be a non-negative number",
            );
        }
        let precip = self.severity.precipitation_threshold_mm;
        if !precip.is_finite() || precip < 0.0 {
            result.add_error(
                "severity.precipitation_threshold_mm",
                "Threshold must be a non-negative number",
            );
        }
        if self.severity.keywords.iter().all(|k| k.trim().is_empty()) {
            result.add_warning(
                "severity.keywords",
                "No storm keywords configured - only wind and precipitation will trigger alerts",
            );
        }

        // Forecast window
        if self.forecast_window.start_hour > 23 {
            result.add_error("forecast_window.start_hour", "Hour must be between 0 and 23");
        }
        if self.forecast_window.start_minute > 59 {
            result.add_error(
                "forecast_window.start_minute",
                "Minute must be between 0 and 59",
            );
        }
        if self.forecast_window.length_minutes >= 24 * 60 {
            result.add_warning(
                "forecast_window.length_minutes",
                "Window covers the whole day - the forecast is checked on every cycle",
            );
        }

        // Email relay
        if self.email.smtp_host.trim().is_empty() {
            result.add_error("email.smtp_host", "SMTP host must not be empty");
        }
        if self.email.smtp_port == 0 {
            result.add_error("email.smtp_port", "Port cannot be 0");
        }
        if self.email.subject.trim().is_empty() {
            result.add_warning("email.subject", "Alert emails will have an empty subject");
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                // Check scheme
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                // Check host
                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if let Some(0) = url.port() {
                    result.add_error(field_name, "Port cannot be 0");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Path of the user record file
    pub fn record_path(&self) -> PathBuf {
        self.storage
            .record_path
            .clone()
            .unwrap_or_else(|| self.config_dir.join(RECORD_FILE_NAME))
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure config directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join(APP_DIR_NAME);

        Ok(config_dir.join(CONFIG_FILE_NAME))
    }
}

/// Email account used as the sender for alert emails.
#[derive(Debug, Clone)]
pub struct EmailCredentials {
    pub address: String,
    pub password: SecretString,
}

/// Twilio account used to send alert SMS.
#[derive(Debug, Clone)]
pub struct TwilioCredentials {
    pub account_sid: String,
    pub auth_token: SecretString,
    pub from_number: String,
}

/// Secrets read from the environment (and `.env`) once at startup.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub weather_api_key: SecretString,
    pub email: EmailCredentials,
    pub twilio: TwilioCredentials,
}

impl Credentials {
    pub const WEATHER_API_KEY: &'static str = "OPENWEATHER_API_KEY";
    pub const EMAIL_ADDRESS: &'static str = "EMAIL_ADDRESS";
    pub const EMAIL_PASSWORD: &'static str = "EMAIL_PASSWORD";
    pub const TWILIO_ACCOUNT_SID: &'static str = "TWILIO_ACCOUNT_SID";
    pub const TWILIO_AUTH_TOKEN: &'static str = "TWILIO_AUTH_TOKEN";
    pub const TWILIO_PHONE_NUMBER: &'static str = "TWILIO_PHONE_NUMBER";

    /// Load credentials from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingSetting` naming every variable that is
    /// unset or empty, or `ConfigError::Invalid` if a value is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build credentials from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        let mut required = |key: &'static str| -> String {
            match lookup(key).map(|v| v.trim().to_string()) {
                Some(value) if !value.is_empty() => value,
                _ => {
                    missing.push(key);
                    String::new()
                }
            }
        };

        let weather_api_key = required(Self::WEATHER_API_KEY);
        let email_address = required(Self::EMAIL_ADDRESS);
        let email_password = required(Self::EMAIL_PASSWORD);
        let account_sid = required(Self::TWILIO_ACCOUNT_SID);
        let auth_token = required(Self::TWILIO_AUTH_TOKEN);
        let from_number = required(Self::TWILIO_PHONE_NUMBER);

        if !missing.is_empty() {
            return Err(ConfigError::MissingSetting(missing.join(", ")));
        }

        if !email_address.contains('@') {
            return Err(ConfigError::Invalid(format!(
                "{} is not an email address",
                Self::EMAIL_ADDRESS
            )));
        }
        if !from_number.starts_with('+') {
            return Err(ConfigError::Invalid(format!(
                "{} must be in international format (leading '+')",
                Self::TWILIO_PHONE_NUMBER
            )));
        }

        Ok(Self {
            weather_api_key: SecretString::from(weather_api_key),
            email: EmailCredentials {
                address: email_address,
                password: SecretString::from(email_password),
            },
            twilio: TwilioCredentials {
                account_sid,
                auth_token: SecretString::from(auth_token),
                from_number,
            },
        })
    }
}
