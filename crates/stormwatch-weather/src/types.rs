use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stormwatch_core::{AppError, NetworkError, ReqwestErrorExt};

/// Weather condition categories mapped from OpenWeather condition ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    Thunderstorm,
    Drizzle,
    Rain,
    Snow,
    Atmosphere,
    Clear,
    Clouds,
    Extreme,
    #[default]
    Unknown,
}

impl WeatherCondition {
    /// Convert an OpenWeather condition id to a WeatherCondition
    /// See: https://openweathermap.org/weather-conditions
    pub fn from_owm_code(code: i32) -> Self {
        match code {
            200..=232 => Self::Thunderstorm,
            300..=321 => Self::Drizzle,
            500..=531 => Self::Rain,
            600..=622 => Self::Snow,
            701..=781 => Self::Atmosphere,
            800 => Self::Clear,
            801..=804 => Self::Clouds,
            900..=906 => Self::Extreme, // Legacy extreme-weather ids
            _ => Self::Unknown,
        }
    }

    /// Get a human-readable category name
    pub fn description(&self) -> &'static str {
        match self {
            Self::Thunderstorm => "Thunderstorm",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::Snow => "Snow",
            Self::Atmosphere => "Atmospheric Condition",
            Self::Clear => "Clear",
            Self::Clouds => "Clouds",
            Self::Extreme => "Extreme Weather",
            Self::Unknown => "Unknown",
        }
    }
}

/// Geographic coordinates resolved from a city name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
    /// Name as reported by the provider, e.g. "Abuja, NG"
    pub resolved_name: Option<String>,
}

/// Conditions at one instant, either observed or forecast.
///
/// Numeric fields are `None` when the provider did not report them; the
/// severity classifier skips unknown fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub description: String,
    pub condition: WeatherCondition,
    pub wind_speed_mps: Option<f64>,
    pub precipitation_mm: Option<f64>,
    pub temperature_c: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl WeatherSnapshot {
    /// Snapshot with only a description; everything else unknown.
    pub fn described(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            condition: WeatherCondition::Unknown,
            wind_speed_mps: None,
            precipitation_mm: None,
            temperature_c: None,
            timestamp: Utc::now(),
        }
    }
}

/// Current conditions plus the hourly forecast for one location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherReport {
    pub location: Coordinates,
    pub current: WeatherSnapshot,
    pub hourly: Vec<WeatherSnapshot>,
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("City not found: {0}")]
    Lookup(String),
    #[error("Transport error: {0}")]
    Transport(#[from] NetworkError),
    #[error("Weather API key was rejected")]
    InvalidApiKey,
    #[error("Weather API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for WeatherError {
    fn from(e: reqwest::Error) -> Self {
        WeatherError::Transport(e.into_network_error())
    }
}

impl From<WeatherError> for AppError {
    fn from(e: WeatherError) -> Self {
        match e {
            WeatherError::Lookup(city) => AppError::Lookup(city),
            WeatherError::Transport(net) => AppError::Transport(net),
            other => AppError::Provider(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_owm_code_thunderstorm() {
        assert_eq!(WeatherCondition::from_owm_code(200), WeatherCondition::Thunderstorm);
        assert_eq!(WeatherCondition::from_owm_code(232), WeatherCondition::Thunderstorm);
    }

    #[test]
    fn test_owm_code_drizzle_and_rain() {
        assert_eq!(WeatherCondition::from_owm_code(300), WeatherCondition::Drizzle);
        assert_eq!(WeatherCondition::from_owm_code(502), WeatherCondition::Rain);
        assert_eq!(WeatherCondition::from_owm_code(531), WeatherCondition::Rain);
    }

    #[test]
    fn test_owm_code_snow() {
        assert_eq!(WeatherCondition::from_owm_code(600), WeatherCondition::Snow);
        assert_eq!(WeatherCondition::from_owm_code(622), WeatherCondition::Snow);
    }

    #[test]
    fn test_owm_code_atmosphere() {
        assert_eq!(WeatherCondition::from_owm_code(701), WeatherCondition::Atmosphere);
        assert_eq!(WeatherCondition::from_owm_code(781), WeatherCondition::Atmosphere);
    }

    #[test]
    fn test_owm_code_clear_and_clouds() {
        assert_eq!(WeatherCondition::from_owm_code(800), WeatherCondition::Clear);
        assert_eq!(WeatherCondition::from_owm_code(801), WeatherCondition::Clouds);
        assert_eq!(WeatherCondition::from_owm_code(804), WeatherCondition::Clouds);
    }

    #[test]
    fn test_owm_code_legacy_extreme() {
        assert_eq!(WeatherCondition::from_owm_code(900), WeatherCondition::Extreme);
        assert_eq!(WeatherCondition::from_owm_code(906), WeatherCondition::Extreme);
    }

    #[test]
    fn test_owm_code_unknown() {
        assert_eq!(WeatherCondition::from_owm_code(999), WeatherCondition::Unknown);
        assert_eq!(WeatherCondition::from_owm_code(-1), WeatherCondition::Unknown);
    }

    #[test]
    fn test_condition_description() {
        assert_eq!(WeatherCondition::Atmosphere.description(), "Atmospheric Condition");
        assert_eq!(WeatherCondition::Thunderstorm.description(), "Thunderstorm");
    }

    #[test]
    fn test_weather_error_maps_to_fault_taxonomy() {
        let lookup: AppError = WeatherError::Lookup("Atlantis".into()).into();
        assert!(matches!(lookup, AppError::Lookup(ref c) if c == "Atlantis"));

        let transport: AppError = WeatherError::Transport(NetworkError::Timeout).into();
        assert!(matches!(transport, AppError::Transport(NetworkError::Timeout)));

        let key: AppError = WeatherError::InvalidApiKey.into();
        assert!(matches!(key, AppError::Provider(_)));
    }
}
