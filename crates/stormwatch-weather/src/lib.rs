//! Weather service for Stormwatch
//!
//! Resolves a city through OpenWeather geocoding, fetches current conditions
//! and the hourly forecast, and classifies them for severity.

pub mod geocode;
pub mod provider;
pub mod severity;
pub mod types;

pub use provider::WeatherProvider;
pub use severity::{classify, AlertDecision, SeverityRule};
pub use types::*;
