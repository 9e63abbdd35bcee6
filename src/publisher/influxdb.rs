use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use rinfluxdb::line_protocol::{FieldValue, Line, LineBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{
    publisher::Registration,
    weather::{CityWeatherCondition, Conditions},
};

use super::{Publisher, PublisherConfig, PublisherResult};

const MEASUREMENT: &str = "current_weather";

#[derive(Error, Debug)]
enum Error {
    #[error("failed to send request")]
    Request(#[source] reqwest::Error),

    #[error("write request resulted in a non-success status code {0} with error: {1}")]
    Write(StatusCode, String),
}

fn line(condition: &CityWeatherCondition) -> Line {
    LineBuilder::new(MEASUREMENT)
        .insert_tag("city", condition.city.name.clone())
        .insert_field("latitude", FieldValue::Float(condition.city.coordinates.lat))
        .insert_field("longitude", FieldValue::Float(condition.city.coordinates.long))
        .insert_field("temperature", FieldValue::Float(condition.temperature))
        .insert_field(
            "relative_humidity_percent",
            FieldValue::Integer(condition.relative_humidity_percent.into()),
        )
        .insert_field("wind_speed", FieldValue::Float(condition.wind_speed))
        .insert_field(
            "weather_code",
            FieldValue::Integer(i32::from(condition.weather_code).into()),
        )
        .insert_field(
            "cloud_cover_percent",
            FieldValue::Integer(condition.cloud_cover_percent.into()),
        )
        .insert_field(
            "precipitation_millimeters",
            FieldValue::Integer(condition.precipitation.millimeters()),
        )
        .insert_field(
            "visibility_millimeters",
            FieldValue::Integer(condition.visibility.millimeters()),
        )
        .set_timestamp(condition.captured_at)
        .build()
}

fn body(conditions: &Conditions) -> String {
    conditions
        .iter()
        .map(|c| line(c).to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

struct InfluxDB {
    client: reqwest::Client,

    host: Url,

    token: String,

    org: String,

    bucket: String,
}

#[async_trait]
impl Publisher for InfluxDB {
    async fn publish(&self, conditions: &Conditions) -> PublisherResult<()> {
        debug!("sending {} lines", conditions.len());

        let response = self
            .client
            .post(self.host.clone())
            .bearer_auth(&self.token)
            .query(&[("org", &self.org), ("bucket", &self.bucket)])
            .body(body(conditions))
            .send()
            .await
            .map_err(Error::Request)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Write(
                status,
                response
                    .text()
                    .await
                    .unwrap_or("Failed to retrieve response text".to_string()),
            )
            .into());
        }

        Ok(())
    }
}

#[derive(Deserialize, Serialize, Debug)]
struct Config {
    host: String,

    token: String,

    org: String,

    bucket: String,
}

impl PublisherConfig for Config {
    fn build(self) -> PublisherResult<Box<dyn Publisher>> {
        Ok(Box::new(InfluxDB {
            client: reqwest::Client::new(),

            host: self.host.parse()?,

            token: self.token,

            org: self.org,

            bucket: self.bucket,
        }))
    }
}

inventory::submit! {
    Registration::new::<Config>("influxdb")
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing;

    #[test]
    fn test_one_line_per_condition() {
        let body = body(&Conditions::from(vec![testing::berlin(), testing::paris()]));
        let lines: Vec<_> = body.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("current_weather,city=Berlin "));
        assert!(lines[1].starts_with("current_weather,city=Paris "));
        // rinfluxdb writes integer fields without the `i` suffix
        assert!(lines[0].contains("weather_code=0,"));
        assert!(lines[1].contains(" cloud_cover_percent=29,"));
        assert!(lines[0].ends_with(" 1746277080000000000"));
    }

    #[test]
    fn test_invalid_host() {
        let value: toml::Value =
            toml::from_str("host = \"not a url\"\ntoken = \"t\"\norg = \"o\"\nbucket = \"b\"")
                .unwrap();
        let result = Registration::build("influxdb", value);

        assert!(matches!(result, Err(crate::publisher::Error::Config(_, name)) if name == "influxdb"));
    }
}
