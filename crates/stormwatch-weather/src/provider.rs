//! OpenWeather One Call client.

use crate::geocode::lookup_city;
use crate::types::{Coordinates, WeatherCondition, WeatherError, WeatherReport, WeatherSnapshot};
use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use stormwatch_core::WeatherConfig;
use tracing::instrument;

const ONECALL_PATH: &str = "/data/3.0/onecall";

#[derive(Debug, Deserialize)]
struct OneCallResponse {
    current: Option<ApiConditions>,
    #[serde(default)]
    hourly: Vec<ApiConditions>,
}

#[derive(Debug, Deserialize)]
struct ApiConditions {
    dt: Option<i64>,
    temp: Option<f64>,
    wind_speed: Option<f64>,
    #[serde(default)]
    weather: Vec<ApiWeather>,
    rain: Option<ApiPrecipitation>,
    snow: Option<ApiPrecipitation>,
}

#[derive(Debug, Deserialize)]
struct ApiWeather {
    id: Option<i32>,
    main: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiPrecipitation {
    #[serde(rename = "1h")]
    one_hour: Option<f64>,
}

impl ApiConditions {
    /// One Call leaves out the `rain`/`snow` blocks when nothing falls, so an
    /// absent block counts as zero. A block without an hourly figure is unknown.
    fn precipitation_mm(&self) -> Option<f64> {
        let amount = |p: &Option<ApiPrecipitation>| match p {
            None => Some(0.0),
            Some(block) => block.one_hour,
        };
        match (amount(&self.rain), amount(&self.snow)) {
            (Some(rain), Some(snow)) => Some(rain + snow),
            (Some(x), None) | (None, Some(x)) if x > 0.0 => Some(x),
            _ => None,
        }
    }

    fn into_snapshot(self) -> WeatherSnapshot {
        let precipitation_mm = self.precipitation_mm();
        let primary = self.weather.into_iter().next();

        let (condition, description) = match primary {
            Some(w) => (
                w.id.map(WeatherCondition::from_owm_code).unwrap_or_default(),
                w.description.or(w.main).unwrap_or_default(),
            ),
            None => (WeatherCondition::Unknown, String::new()),
        };

        let timestamp = self
            .dt
            .and_then(|dt| DateTime::<Utc>::from_timestamp(dt, 0))
            .unwrap_or_else(Utc::now);

        WeatherSnapshot {
            description,
            condition,
            wind_speed_mps: self.wind_speed,
            precipitation_mm,
            temperature_c: self.temp,
            timestamp,
        }
    }
}

/// Map non-success statuses from OpenWeather onto `WeatherError`.
///
/// A 404 stays an `Api` error here; only the geocoding call knows it means
/// the city is unknown.
pub(crate) async fn check_status(response: Response) -> Result<Response, WeatherError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(WeatherError::InvalidApiKey),
        _ => Err(WeatherError::Api {
            status: status.as_u16(),
            message: text,
        }),
    }
}

#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Arc<Client>,
    base_url: String,
    api_key: SecretString,
}

impl WeatherProvider {
    /// Build a provider from the weather settings and the startup API key.
    pub fn new(config: &WeatherConfig, api_key: &SecretString) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key: api_key.clone(),
        })
    }

    /// Fetch current conditions for `city`.
    pub async fn fetch(&self, city: &str) -> Result<WeatherSnapshot, WeatherError> {
        Ok(self.fetch_report(city, 0).await?.current)
    }

    /// Fetch current conditions and up to `forecast_hours` hourly entries for `city`.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_report(
        &self,
        city: &str,
        forecast_hours: usize,
    ) -> Result<WeatherReport, WeatherError> {
        let location = lookup_city(&self.client, &self.base_url, &self.api_key, city).await?;
        let report = self.fetch_at(location, forecast_hours).await?;

        tracing::info!(
            "Weather for {}: {} ({} forecast hours)",
            city,
            report.current.description,
            report.hourly.len()
        );
        Ok(report)
    }

    /// Fetch conditions for already-resolved coordinates.
    pub async fn fetch_at(
        &self,
        location: Coordinates,
        forecast_hours: usize,
    ) -> Result<WeatherReport, WeatherError> {
        let url = format!("{}{}", self.base_url, ONECALL_PATH);
        let lat = location.latitude.to_string();
        let lon = location.longitude.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("appid", self.api_key.expose_secret()),
                ("units", "metric"),
                ("exclude", "minutely"),
            ])
            .send()
            .await?;

        let response = check_status(response).await?;
        let body: OneCallResponse = response
            .json()
            .await
            .map_err(|e| WeatherError::Parse(format!("forecast response: {}", e)))?;

        let current = body
            .current
            .ok_or_else(|| {
                WeatherError::Parse("forecast response has no current conditions".into())
            })?
            .into_snapshot();

        let hourly = body
            .hourly
            .into_iter()
            .take(forecast_hours)
            .map(ApiConditions::into_snapshot)
            .collect();

        Ok(WeatherReport {
            location,
            current,
            hourly,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(base_url: &str) -> WeatherProvider {
        let config = WeatherConfig {
            api_base_url: base_url.to_string(),
            ..WeatherConfig::default()
        };
        WeatherProvider::new(&config, &SecretString::from("test-key".to_string())).unwrap()
    }

    async fn mount_geocode(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"name": "Abuja", "lat": 9.06, "lon": 7.49, "country": "NG"}
            ])))
            .mount(server)
            .await;
    }

    fn hour(dt: i64, id: i32, description: &str) -> serde_json::Value {
        serde_json::json!({
            "dt": dt,
            "temp": 24.0,
            "wind_speed": 3.0,
            "weather": [{"id": id, "main": "x", "description": description}]
        })
    }

    #[tokio::test]
    async fn test_fetch_maps_current_conditions() {
        let mock_server = MockServer::start().await;
        mount_geocode(&mock_server).await;

        Mock::given(method("GET"))
            .and(path("/data/3.0/onecall"))
            .and(query_param("lat", "9.06"))
            .and(query_param("lon", "7.49"))
            .and(query_param("units", "metric"))
            .and(query_param("exclude", "minutely"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "current": {
                    "dt": 1_700_000_000,
                    "temp": 27.5,
                    "wind_speed": 4.1,
                    "weather": [{"id": 501, "main": "Rain", "description": "moderate rain"}],
                    "rain": {"1h": 2.5}
                },
                "hourly": []
            })))
            .mount(&mock_server)
            .await;

        let snapshot = provider(&mock_server.uri()).fetch("Abuja").await.unwrap();

        assert_eq!(snapshot.description, "moderate rain");
        assert_eq!(snapshot.condition, WeatherCondition::Rain);
        assert_eq!(snapshot.temperature_c, Some(27.5));
        assert_eq!(snapshot.wind_speed_mps, Some(4.1));
        assert_eq!(snapshot.precipitation_mm, Some(2.5));
        assert_eq!(snapshot.timestamp.timestamp(), 1_700_000_000);
    }

    #[tokio::test]
    async fn test_fetch_report_truncates_hourly() {
        let mock_server = MockServer::start().await;
        mount_geocode(&mock_server).await;

        let hourly: Vec<_> = (0..48)
            .map(|i| hour(1_700_000_000 + i * 3600, 800, "clear sky"))
            .collect();

        Mock::given(method("GET"))
            .and(path("/data/3.0/onecall"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "current": hour(1_700_000_000, 800, "clear sky"),
                "hourly": hourly
            })))
            .mount(&mock_server)
            .await;

        let report = provider(&mock_server.uri())
            .fetch_report("Abuja", 12)
            .await
            .unwrap();

        assert_eq!(report.hourly.len(), 12);
        assert_eq!(report.location.resolved_name.as_deref(), Some("Abuja, NG"));
        // No rain/snow blocks means nothing fell
        assert_eq!(report.current.precipitation_mm, Some(0.0));
    }

    #[tokio::test]
    async fn test_unknown_city_skips_forecast_call() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/data/3.0/onecall"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let result = provider(&mock_server.uri()).fetch("Nowhere").await;
        assert!(matches!(result, Err(WeatherError::Lookup(_))));
    }

    #[tokio::test]
    async fn test_invalid_api_key() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "cod": 401,
                "message": "Invalid API key"
            })))
            .mount(&mock_server)
            .await;

        let result = provider(&mock_server.uri()).fetch("Abuja").await;
        assert!(matches!(result, Err(WeatherError::InvalidApiKey)));
    }

    #[tokio::test]
    async fn test_server_error_is_api_error() {
        let mock_server = MockServer::start().await;
        mount_geocode(&mock_server).await;

        Mock::given(method("GET"))
            .and(path("/data/3.0/onecall"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = provider(&mock_server.uri()).fetch("Abuja").await;
        assert!(matches!(result, Err(WeatherError::Api { status: 503, .. })));
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_transport_error() {
        // Nothing listens on port 9 of localhost
        let result = provider("http://127.0.0.1:9").fetch("Abuja").await;
        assert!(matches!(result, Err(WeatherError::Transport(_))));
    }

    #[tokio::test]
    async fn test_missing_current_is_parse_error() {
        let mock_server = MockServer::start().await;
        mount_geocode(&mock_server).await;

        Mock::given(method("GET"))
            .and(path("/data/3.0/onecall"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "hourly": []
            })))
            .mount(&mock_server)
            .await;

        let result = provider(&mock_server.uri()).fetch("Abuja").await;
        assert!(matches!(result, Err(WeatherError::Parse(_))));
    }

    #[test]
    fn test_precipitation_sums_rain_and_snow() {
        let conditions: ApiConditions = serde_json::from_value(serde_json::json!({
            "rain": {"1h": 1.5},
            "snow": {"1h": 0.5}
        }))
        .unwrap();
        assert_eq!(conditions.precipitation_mm(), Some(2.0));
    }

    #[test]
    fn test_missing_fields_are_unknown() {
        let conditions: ApiConditions = serde_json::from_value(serde_json::json!({
            "rain": {}
        }))
        .unwrap();
        let snapshot = conditions.into_snapshot();
        assert_eq!(snapshot.precipitation_mm, None);
        assert_eq!(snapshot.wind_speed_mps, None);
        assert_eq!(snapshot.temperature_c, None);
        assert_eq!(snapshot.condition, WeatherCondition::Unknown);
        assert!(snapshot.description.is_empty());
    }

    #[tokio::test]
    async fn test_forecast_not_found_is_not_a_lookup_fault() {
        let mock_server = MockServer::start().await;
        mount_geocode(&mock_server).await;

        Mock::given(method("GET"))
            .and(path("/data/3.0/onecall"))
            .respond_with(ResponseTemplate::new(404).set_body_string("{\"cod\":\"404\"}"))
            .mount(&mock_server)
            .await;

        let result = provider(&mock_server.uri()).fetch("Abuja").await;
        assert!(matches!(result, Err(WeatherError::Api { status: 404, .. })));
    }
}
