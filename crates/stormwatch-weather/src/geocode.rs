//! Forward geocoding: convert a city name to coordinates.
//! Uses the OpenWeather direct geocoding endpoint with the same API key as
//! the forecast calls.

use crate::provider::check_status;
use crate::types::{Coordinates, WeatherError};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

const GEOCODING_PATH: &str = "/geo/1.0/direct";

#[derive(Debug, Deserialize)]
struct GeocodeEntry {
    name: Option<String>,
    lat: f64,
    lon: f64,
    country: Option<String>,
    state: Option<String>,
}

impl GeocodeEntry {
    fn display_name(&self) -> Option<String> {
        let name = self.name.as_deref().filter(|n| !n.is_empty())?;
        let suffix = self
            .state
            .as_deref()
            .filter(|s| !s.is_empty() && *s != name)
            .or(self.country.as_deref().filter(|c| !c.is_empty()));

        Some(match suffix {
            Some(s) => format!("{}, {}", name, s),
            None => name.to_string(),
        })
    }
}

/// Resolve `city` to coordinates.
///
/// An empty result from the provider means the city is unknown and yields
/// `WeatherError::Lookup`.
pub(crate) async fn lookup_city(
    client: &Client,
    base_url: &str,
    api_key: &SecretString,
    city: &str,
) -> Result<Coordinates, WeatherError> {
    let city = city.trim();
    if city.is_empty() {
        return Err(WeatherError::Lookup(String::new()));
    }

    let url = format!("{}{}", base_url.trim_end_matches('/'), GEOCODING_PATH);
    let response = client
        .get(&url)
        .query(&[
            ("q", city),
            ("limit", "1"),
            ("appid", api_key.expose_secret()),
        ])
        .send()
        .await?;

    if response.status() == StatusCode::NOT_FOUND {
        return Err(WeatherError::Lookup(city.to_string()));
    }
    let response = check_status(response).await?;
    let entries: Vec<GeocodeEntry> = response
        .json()
        .await
        .map_err(|e| WeatherError::Parse(format!("geocoding response: {}", e)))?;

    let entry = entries
        .into_iter()
        .next()
        .ok_or_else(|| WeatherError::Lookup(city.to_string()))?;

    let coordinates = Coordinates {
        latitude: entry.lat,
        longitude: entry.lon,
        resolved_name: entry.display_name(),
    };

    tracing::debug!(
        "Resolved {} to {:.4}, {:.4}",
        city,
        coordinates.latitude,
        coordinates.longitude
    );
    Ok(coordinates)
}
