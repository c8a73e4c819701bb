//! Fetch stage: one GET against the OpenWeather current-weather endpoint.

use std::time::Duration;

use crate::config::{ApiConfig, ConfigError, LocationConfig};
use crate::error::{PipelineError, Result};
use crate::record::RawObservation;

/// Path of the current-weather endpoint relative to the API base.
const CURRENT_WEATHER_PATH: &str = "/data/2.5/weather";

/// Source of raw weather observations.
///
/// The pipeline calls this instead of a concrete HTTP client so runs can be
/// driven from canned bodies in tests.
pub trait WeatherSource: Send + Sync {
    fn fetch(&self) -> impl std::future::Future<Output = Result<RawObservation>> + Send;
}

/// Client for `GET {base}/data/2.5/weather?lat=&lon=&appid=`.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: reqwest::Client,
    endpoint: String,
    latitude: f64,
    longitude: f64,
    api_key: String,
}

impl OpenWeatherClient {
    pub fn new(
        api: &ApiConfig,
        location: &LocationConfig,
        api_key: &str,
    ) -> std::result::Result<Self, ConfigError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = api.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| ConfigError::Invalid(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}{}",
                api.base_url.trim_end_matches('/'),
                CURRENT_WEATHER_PATH
            ),
            latitude: location.latitude,
            longitude: location.longitude,
            api_key: api_key.to_string(),
        })
    }

    /// Endpoint URL with the API key masked, for logging.
    pub fn redacted_url(&self) -> String {
        format!(
            "{}?lat={}&lon={}&appid=***",
            self.endpoint, self.latitude, self.longitude
        )
    }
}

impl WeatherSource for OpenWeatherClient {
    async fn fetch(&self) -> Result<RawObservation> {
        log::info!("GET {}", self.redacted_url());

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("lat", self.latitude.to_string()),
                ("lon", self.longitude.to_string()),
                ("appid", self.api_key.clone()),
            ])
            .send()
            .await
            .map_err(|e| PipelineError::Request {
                status: e.status().map(|s| s.as_u16()),
                // reqwest includes the full URL (and key) in its Display output
                message: e.without_url().to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| PipelineError::Request {
            status: Some(status.as_u16()),
            message: format!("failed to read body: {}", e.without_url()),
        })?;

        if !status.is_success() {
            return Err(PipelineError::Request {
                status: Some(status.as_u16()),
                message: body,
            });
        }

        log::debug!("Weather API response ({}): {}", status, body);
        Ok(RawObservation::new(body))
    }
}
