pub mod app;
pub mod config;
pub mod error;

pub use app::App;
pub use config::{
    Config, Credentials, EmailConfig, EmailCredentials, ForecastWindowConfig, SeverityConfig,
    SmsConfig, StorageConfig, TwilioCredentials, ValidationResult, WeatherConfig,
};
pub use error::{AppError, ConfigError, NetworkError, ReqwestErrorExt, StorageError};

use anyhow::Result;

/// Initialize logging for the process
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    tracing::debug!("Stormwatch core initialized");
    Ok(())
}
