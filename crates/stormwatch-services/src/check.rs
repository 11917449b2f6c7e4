//! One check cycle: fetch, classify, and alert when warranted.
//!
//! Steps run strictly in sequence. A failed fetch ends the cycle before the
//! classifier or dispatcher are reached, and a non-severe decision never
//! reaches the dispatcher.

use chrono::{Local, NaiveTime};
use serde::Serialize;
use stormwatch_core::{App, AppError, Config, ForecastWindowConfig, SeverityConfig};
use stormwatch_notify::{DispatchResult, Dispatcher};
use stormwatch_weather::{classify, AlertDecision, WeatherProvider, WeatherSnapshot};
use tracing::instrument;

use crate::record::UserRecord;

/// Whether a cycle also looks at the hourly forecast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForecastMode {
    /// Only inside the configured morning window
    #[default]
    Auto,
    Always,
    Never,
}

/// First severe hour found in the forecast
#[derive(Debug, Clone, Serialize)]
pub struct ForecastHit {
    /// 1 for the coming hour, 2 for the one after, and so on
    pub hours_ahead: usize,
    pub snapshot: WeatherSnapshot,
    pub decision: AlertDecision,
}

/// Everything one cycle observed and did
#[derive(Debug, Clone, Serialize)]
pub struct CheckOutcome {
    pub city: String,
    pub current: WeatherSnapshot,
    pub decision: AlertDecision,
    pub forecast_checked: bool,
    pub forecast: Option<ForecastHit>,
    /// Present only when an alert was sent
    pub dispatch: Option<DispatchResult>,
}

impl CheckOutcome {
    pub fn alerted(&self) -> bool {
        self.dispatch.is_some()
    }
}

pub struct AlertCheck {
    provider: WeatherProvider,
    dispatcher: Dispatcher,
    severity: SeverityConfig,
    window: ForecastWindowConfig,
    forecast_hours: usize,
}

impl AlertCheck {
    pub fn new(provider: WeatherProvider, dispatcher: Dispatcher, config: &Config) -> Self {
        Self {
            provider,
            dispatcher,
            severity: config.severity.clone(),
            window: config.forecast_window.clone(),
            forecast_hours: config.weather.forecast_hours,
        }
    }

    /// Wire up the real weather provider and delivery channels.
    ///
    /// # Errors
    ///
    /// Returns `AppError` if an HTTP client or the SMTP transport cannot be built.
    pub fn from_app(app: &App) -> Result<Self, AppError> {
        let config = app.config();
        let credentials = app.credentials();

        let provider = WeatherProvider::new(&config.weather, &credentials.weather_api_key)?;
        let dispatcher = Dispatcher::from_config(config, credentials)?;

        Ok(Self::new(provider, dispatcher, config))
    }

    /// Run a cycle using the local wall clock for the forecast window.
    pub async fn run(
        &self,
        record: &UserRecord,
        mode: ForecastMode,
    ) -> Result<CheckOutcome, AppError> {
        self.run_at(record, mode, Local::now().time()).await
    }

    /// Run a cycle as if the local time were `now`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Lookup` or `AppError::Transport` when the weather
    /// could not be fetched. Delivery failures are not errors; they are
    /// reported in the outcome's `DispatchResult`.
    #[instrument(skip(self, record), fields(city = %record.city), level = "info")]
    pub async fn run_at(
        &self,
        record: &UserRecord,
        mode: ForecastMode,
        now: NaiveTime,
    ) -> Result<CheckOutcome, AppError> {
        let forecast_checked = match mode {
            ForecastMode::Always => true,
            ForecastMode::Never => false,
            ForecastMode::Auto => self.window.contains(now),
        };
        let hours = if forecast_checked { self.forecast_hours } else { 0 };

        let report = self.provider.fetch_report(&record.city, hours).await?;
        let decision = classify(&report.current, &self.severity);

        let mut outcome = CheckOutcome {
            city: record.city.clone(),
            current: report.current,
            decision,
            forecast_checked,
            forecast: None,
            dispatch: None,
        };

        if outcome.decision.is_severe {
            tracing::warn!("Severe weather in {}: {}", record.city, outcome.decision.message);
            let message = current_alert_text(&record.city, &outcome.current, &outcome.decision);
            outcome.dispatch = Some(self.dispatcher.dispatch(&record.contact(), &message).await);
            return Ok(outcome);
        }

        if forecast_checked {
            outcome.forecast = first_severe_hour(&report.hourly, &self.severity);
            if let Some(hit) = &outcome.forecast {
                tracing::warn!(
                    "Severe weather forecast for {} in {} hour(s): {}",
                    record.city,
                    hit.hours_ahead,
                    hit.decision.message
                );
                let message = forecast_alert_text(&record.city, self.forecast_hours, hit);
                outcome.dispatch =
                    Some(self.dispatcher.dispatch(&record.contact(), &message).await);
                return Ok(outcome);
            }
        }

        tracing::info!("{}: {}", record.city, outcome.decision.message);
        Ok(outcome)
    }

    /// Send current conditions over both channels, severe or not.
    ///
    /// # Errors
    ///
    /// Returns `AppError` if the weather could not be fetched.
    pub async fn send_test_notification(
        &self,
        record: &UserRecord,
    ) -> Result<DispatchResult, AppError> {
        let current = self.provider.fetch(&record.city).await?;
        let message = test_notification_text(&record.city, &current);

        tracing::info!("Sending test notification for {}", record.city);
        Ok(self.dispatcher.dispatch(&record.contact(), &message).await)
    }
}

fn first_severe_hour(hourly: &[WeatherSnapshot], policy: &SeverityConfig) -> Option<ForecastHit> {
    hourly.iter().enumerate().find_map(|(i, snapshot)| {
        let decision = classify(snapshot, policy);
        decision.is_severe.then(|| ForecastHit {
            hours_ahead: i + 1,
            snapshot: snapshot.clone(),
            decision,
        })
    })
}

pub fn current_alert_text(
    city: &str,
    snapshot: &WeatherSnapshot,
    decision: &AlertDecision,
) -> String {
    format!(
        "Severe weather alert for {}!\nType: {}\nCondition: {}\n{}",
        city,
        snapshot.condition.description(),
        snapshot.description,
        decision.message
    )
}

pub fn forecast_alert_text(city: &str, forecast_hours: usize, hit: &ForecastHit) -> String {
    format!(
        "Severe weather expected in the next {} hours for {}!\nType: {}\nCondition: {}\n{}",
        forecast_hours,
        city,
        hit.snapshot.condition.description(),
        hit.snapshot.description,
        hit.decision.message
    )
}

pub fn test_notification_text(city: &str, snapshot: &WeatherSnapshot) -> String {
    let temperature = snapshot
        .temperature_c
        .map(|t| format!("{:.1}°C", t))
        .unwrap_or_else(|| "unknown".to_string());
    format!(
        "Weather Alert for {}:\nTemperature: {}\nWeather: {}",
        city, temperature, snapshot.description
    )
}
