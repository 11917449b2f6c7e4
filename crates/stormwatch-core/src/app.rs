use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use crate::{Config, Credentials};

/// Process-wide configuration, loaded once at startup and shared read-only.
pub struct App {
    config: Arc<Config>,
    credentials: Arc<Credentials>,
}

impl App {
    /// Load and validate configuration and credentials.
    ///
    /// Any configuration fault is returned here so the process can stop
    /// before a check is ever attempted.
    pub fn new(config_path: Option<&Path>) -> Result<Self> {
        let (config, _validation) = Config::load_validated(config_path)?;
        let credentials = Credentials::from_env()?;

        tracing::info!(
            "Configuration loaded from {}",
            config.config_dir.display()
        );

        Ok(Self::from_parts(config, credentials))
    }

    /// Assemble an application from already-loaded parts.
    pub fn from_parts(config: Config, credentials: Credentials) -> Self {
        Self {
            config: Arc::new(config),
            credentials: Arc::new(credentials),
        }
    }

    /// Get reference to application config
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get reference to the startup credentials
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Shut down the application
    pub fn shutdown(&self) {
        tracing::info!("Shutting down");
    }
}
