use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::weather::{
    City, CityWeatherCondition, Coordinates, Length, MonitoringParams, WeatherCode,
};

use super::{Registration, SourceResult, WeatherSource, WeatherSourceConfig};

const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

#[derive(Error, Debug)]
enum Error {
    #[error("http request error: {0}")]
    Http(#[source] reqwest::Error),

    #[error("invalid response body: {0}")]
    Body(#[source] reqwest::Error),

    #[error("invalid capture time {1}: {0}")]
    Time(#[source] chrono::ParseError, String),
}

#[derive(Deserialize, Debug)]
struct Current {
    time: String,

    #[serde(default, rename = "temperature_2m")]
    temperature: f64,

    #[serde(default, rename = "relative_humidity_2m")]
    relative_humidity: u8,

    #[serde(default, rename = "wind_speed_10m")]
    wind_speed: f64,

    #[serde(default)]
    weather_code: i32,

    #[serde(default)]
    cloud_cover: u8,

    #[serde(default)]
    precipitation: f64,

    #[serde(default)]
    visibility: f64,
}

#[derive(Deserialize, Debug)]
struct CurrentWeatherResponse {
    latitude: f64,

    longitude: f64,

    current: Current,
}

impl CurrentWeatherResponse {
    fn into_condition(self, city: &City) -> Result<CityWeatherCondition, Error> {
        let captured_at = NaiveDateTime::parse_from_str(&self.current.time, TIME_FORMAT)
            .map_err(|e| Error::Time(e, self.current.time.clone()))?;

        Ok(CityWeatherCondition {
            city: City {
                name: city.name.clone(),
                coordinates: Coordinates {
                    lat: self.latitude,
                    long: self.longitude,
                },
            },
            captured_at: Utc.from_utc_datetime(&captured_at),
            temperature: self.current.temperature,
            relative_humidity_percent: self.current.relative_humidity,
            wind_speed: self.current.wind_speed,
            weather_code: WeatherCode::from(self.current.weather_code),
            cloud_cover_percent: self.current.cloud_cover,
            precipitation: Length::from_fractional(self.current.precipitation, Length::MILLIMETER),
            visibility: Length::from_fractional(self.current.visibility, Length::METER),
        })
    }
}

/// Builds the forecast URL; `current` lists the tokens in key order.
fn format_url(base_url: &str, coordinates: &Coordinates, params: &MonitoringParams) -> String {
    let current = params.tokens().collect::<Vec<_>>().join(",");

    format!(
        "{base_url}?latitude={:.2}&longitude={:.2}&current={current}",
        coordinates.lat, coordinates.long
    )
}

struct OpenMeteo {
    client: reqwest::Client,

    base_url: String,
}

#[derive(Serialize, Deserialize)]
struct Config {
    base_url: Option<String>,

    timeout_secs: Option<u64>,
}

impl WeatherSourceConfig for Config {
    fn build(self) -> SourceResult<Box<dyn WeatherSource>> {
        let timeout = Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Box::new(OpenMeteo {
            client,
            base_url: self.base_url.unwrap_or(FORECAST_URL.to_string()),
        }))
    }
}

#[async_trait]
impl WeatherSource for OpenMeteo {
    async fn current_weather(
        &self,
        city: &City,
        params: &MonitoringParams,
    ) -> SourceResult<CityWeatherCondition> {
        let url = format_url(&self.base_url, &city.coordinates, params);

        debug!(city = %city.name, url = %url, "requesting current weather");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(Error::Http)?
            .json::<CurrentWeatherResponse>()
            .await
            .map_err(Error::Body)?;

        response.into_condition(city).map_err(Into::into)
    }
}

inventory::submit! {
    Registration::new::<Config>("open-meteo")
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{testing, weather::MonitoringParam};

    #[test]
    fn test_format_url() {
        let coordinates = Coordinates {
            lat: 41.19,
            long: 4.70,
        };

        assert_eq!(
            format_url(FORECAST_URL, &coordinates, &testing::params()),
            "https://api.open-meteo.com/v1/forecast?latitude=41.19&longitude=4.70&current=cloud_cover,precipitation,relative_humidity_2m,temperature_2m,visibility,weather_code,wind_speed_10m"
        );
    }

    #[test]
    fn test_format_url_one_param() {
        let coordinates = Coordinates {
            lat: 41.19,
            long: 4.70,
        };
        let mut params = MonitoringParams::new();
        params.insert(MonitoringParam::Temperature, "temperature_2m");

        assert_eq!(
            format_url(FORECAST_URL, &coordinates, &params),
            "https://api.open-meteo.com/v1/forecast?latitude=41.19&longitude=4.70&current=temperature_2m"
        );
    }

    #[test]
    fn test_format_url_rounds_coordinates() {
        let coordinates = Coordinates {
            lat: 52.5244,
            long: -0.1278,
        };
        let mut params = MonitoringParams::new();
        params.insert(MonitoringParam::CloudCover, "cloud_cover");

        assert_eq!(
            format_url("http://localhost:8080/v1/forecast", &coordinates, &params),
            "http://localhost:8080/v1/forecast?latitude=52.52&longitude=-0.13&current=cloud_cover"
        );
    }

    #[test]
    fn test_decode_response() {
        let body = r#"{
            "latitude": 52.52,
            "longitude": 13.419998,
            "generationtime_ms": 0.05,
            "utc_offset_seconds": 0,
            "timezone": "GMT",
            "current_units": {"time": "iso8601", "temperature_2m": "°C"},
            "current": {
                "time": "2025-05-03T12:58",
                "interval": 900,
                "temperature_2m": 12.5,
                "relative_humidity_2m": 20,
                "wind_speed_10m": 3.7,
                "weather_code": 0,
                "cloud_cover": 3,
                "precipitation": 3.0,
                "visibility": 40000.0
            }
        }"#;

        let response: CurrentWeatherResponse = serde_json::from_str(body).unwrap();
        let condition = response
            .into_condition(&City::new("Berlin", 52.52, 13.41))
            .unwrap();

        assert_eq!(
            condition,
            CityWeatherCondition {
                city: City::new("Berlin", 52.52, 13.419998),
                ..testing::berlin()
            }
        );
    }

    #[test]
    fn test_decode_partial_response() {
        let body = r#"{
            "latitude": 48.86,
            "longitude": 2.35,
            "current": {"time": "2025-05-03T13:03", "temperature_2m": 10.5, "weather_code": 42}
        }"#;

        let response: CurrentWeatherResponse = serde_json::from_str(body).unwrap();
        let condition = response
            .into_condition(&City::new("Paris", 48.86, 2.35))
            .unwrap();

        assert_eq!(condition.temperature, 10.5);
        assert_eq!(condition.weather_code, WeatherCode::Unknown(42));
        assert_eq!(condition.visibility, Length::default());
    }

    #[test]
    fn test_decode_invalid_time() {
        let body = r#"{
            "latitude": 48.86,
            "longitude": 2.35,
            "current": {"time": "yesterday"}
        }"#;

        let response: CurrentWeatherResponse = serde_json::from_str(body).unwrap();
        let result = response.into_condition(&City::new("Paris", 48.86, 2.35));

        assert!(matches!(result, Err(Error::Time(_, time)) if time == "yesterday"));
    }
}
