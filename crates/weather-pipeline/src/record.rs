//! Weather API payloads and the normalized record derived from them.

use serde::{Deserialize, Serialize};
use serde_json::Number;

use crate::error::{PipelineError, Result};

/// Unmodified response body of one weather API fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawObservation(String);

impl RawObservation {
    pub fn new(body: impl Into<String>) -> Self {
        Self(body.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Fixed-shape record persisted for every run.
///
/// Numeric fields keep the exact representation the API sent (`71` stays an
/// integer, `289.3` stays `289.3`), so no conversion or rounding happens
/// between the API and the stored blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub country: String,
    pub city: String,
    pub temperature: Number,
    pub humidity: Number,
    #[serde(rename = "timestamp")]
    pub observation_timestamp: i64,
}

impl NormalizedRecord {
    /// Extract the record from a raw API body.
    ///
    /// Fails with [`PipelineError::MalformedResponse`] when any of
    /// `sys.country`, `name`, `main.temp`, `main.humidity` or `dt` is missing
    /// or has the wrong type.
    pub fn from_raw(raw: &RawObservation) -> Result<Self> {
        let response: CurrentWeather = serde_json::from_str(raw.as_str())
            .map_err(|e| PipelineError::MalformedResponse(e.to_string()))?;
        Ok(response.into())
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| PipelineError::StagingWrite(e.to_string()))
    }
}

// OpenWeather `/data/2.5/weather` subset. Unknown fields are ignored.

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    sys: Sys,
    name: String,
    main: Main,
    dt: i64,
}

#[derive(Debug, Deserialize)]
struct Sys {
    country: String,
}

#[derive(Debug, Deserialize)]
struct Main {
    temp: Number,
    humidity: Number,
}

impl From<CurrentWeather> for NormalizedRecord {
    fn from(w: CurrentWeather) -> Self {
        Self {
            country: w.sys.country,
            city: w.name,
            temperature: w.main.temp,
            humidity: w.main.humidity,
            observation_timestamp: w.dt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PORTO: &str = r#"{"sys":{"country":"PT"},"name":"Porto","main":{"temp":289.3,"humidity":71},"dt":1700000000}"#;

    #[test]
    fn test_extracts_fields_verbatim() {
        let record = NormalizedRecord::from_raw(&RawObservation::new(PORTO)).unwrap();
        assert_eq!(record.country, "PT");
        assert_eq!(record.city, "Porto");
        assert_eq!(record.temperature.as_f64(), Some(289.3));
        assert_eq!(record.humidity.as_u64(), Some(71));
        assert_eq!(record.observation_timestamp, 1_700_000_000);
    }

    #[test]
    fn test_serializes_to_persisted_shape() {
        let record = NormalizedRecord::from_raw(&RawObservation::new(PORTO)).unwrap();
        let json = String::from_utf8(record.to_json().unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"country":"PT","city":"Porto","temperature":289.3,"humidity":71,"timestamp":1700000000}"#
        );
    }

    #[test]
    fn test_ignores_unrelated_fields() {
        let body = r#"{
            "coord": {"lon": -8.61, "lat": 41.15},
            "weather": [{"id": 800, "main": "Clear"}],
            "main": {"temp": 281.15, "feels_like": 279.0, "humidity": 87.5, "pressure": 1021},
            "sys": {"type": 2, "country": "PT", "sunrise": 1699945000},
            "name": "Porto",
            "dt": 1699999999,
            "cod": 200
        }"#;
        let record = NormalizedRecord::from_raw(&RawObservation::new(body)).unwrap();
        assert_eq!(record.humidity.as_f64(), Some(87.5));
        assert_eq!(record.observation_timestamp, 1_699_999_999);
    }

    #[test]
    fn test_missing_fields_are_malformed() {
        let cases = [
            r#"{"name":"Porto","main":{"temp":289.3,"humidity":71},"dt":1}"#,
            r#"{"sys":{},"name":"Porto","main":{"temp":289.3,"humidity":71},"dt":1}"#,
            r#"{"sys":{"country":"PT"},"main":{"temp":289.3,"humidity":71},"dt":1}"#,
            r#"{"sys":{"country":"PT"},"name":"Porto","main":{"humidity":71},"dt":1}"#,
            r#"{"sys":{"country":"PT"},"name":"Porto","main":{"temp":289.3},"dt":1}"#,
            r#"{"sys":{"country":"PT"},"name":"Porto","main":{"temp":289.3,"humidity":71}}"#,
        ];
        for body in cases {
            let err = NormalizedRecord::from_raw(&RawObservation::new(body)).unwrap_err();
            assert!(
                matches!(err, PipelineError::MalformedResponse(_)),
                "expected MalformedResponse for {body}, got {err:?}"
            );
        }
    }

    #[test]
    fn test_wrong_types_are_malformed() {
        let cases = [
            r#"{"sys":{"country":351},"name":"Porto","main":{"temp":289.3,"humidity":71},"dt":1}"#,
            r#"{"sys":{"country":"PT"},"name":"Porto","main":{"temp":"hot","humidity":71},"dt":1}"#,
            r#"{"sys":{"country":"PT"},"name":"Porto","main":{"temp":289.3,"humidity":null},"dt":1}"#,
            r#"{"sys":{"country":"PT"},"name":"Porto","main":{"temp":289.3,"humidity":71},"dt":1.5}"#,
            r#"{"sys":{"country":"PT"},"name":"Porto","main":{"temp":289.3,"humidity":71},"dt":"now"}"#,
        ];
        for body in cases {
            let err = NormalizedRecord::from_raw(&RawObservation::new(body)).unwrap_err();
            assert_eq!(err.kind(), "MalformedResponseError", "{body}");
        }
    }

    #[test]
    fn test_non_json_is_malformed() {
        let err = NormalizedRecord::from_raw(&RawObservation::new("<html>502</html>")).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedResponse(_)));
    }
}
