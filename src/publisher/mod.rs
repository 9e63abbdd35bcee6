use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    source::BoxError,
    weather::{CityWeatherCondition, Conditions, Coordinates},
};

mod console;
mod influxdb;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unknown publisher {0}")]
    Unknown(String),

    #[error("invalid TOML: {0}")]
    Toml(#[source] toml::de::Error),

    #[error("invalid configuration for {1}: {0}")]
    Config(#[source] BoxError, String),
}

pub type PublisherResult<T> = std::result::Result<T, BoxError>;

#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, conditions: &Conditions) -> PublisherResult<()>;
}

pub trait PublisherConfig {
    fn build(self) -> PublisherResult<Box<dyn Publisher>>;
}

/// Wire representation of one city's condition in a published event.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct ConditionEvent {
    pub city: String,

    pub coordinates: Coordinates,

    pub captured_at: DateTime<Utc>,

    pub temperature: f64,

    pub relative_humidity_percent: u32,

    pub wind_speed: f64,

    pub weather_code: i32,

    pub cloud_cover_percent: u32,

    pub precipitation_millimeters: i64,

    pub visibility_millimeters: i64,
}

impl From<&CityWeatherCondition> for ConditionEvent {
    fn from(c: &CityWeatherCondition) -> Self {
        Self {
            city: c.city.name.clone(),
            coordinates: c.city.coordinates,
            captured_at: c.captured_at,
            temperature: c.temperature,
            relative_humidity_percent: c.relative_humidity_percent.into(),
            wind_speed: c.wind_speed,
            weather_code: c.weather_code.into(),
            cloud_cover_percent: c.cloud_cover_percent.into(),
            precipitation_millimeters: c.precipitation.millimeters(),
            visibility_millimeters: c.visibility.millimeters(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct ConditionsEvent {
    pub conditions: Vec<ConditionEvent>,
}

impl From<&Conditions> for ConditionsEvent {
    fn from(conditions: &Conditions) -> Self {
        Self {
            conditions: conditions.iter().map(ConditionEvent::from).collect(),
        }
    }
}

pub struct Registration {
    name: &'static str,

    builder: fn(&str, toml::Value) -> Result<Box<dyn Publisher>, Error>,
}

impl Registration {
    pub const fn new<'a, PC>(name: &'static str) -> Self
    where
        PC: PublisherConfig + serde::Deserialize<'a>,
    {
        let builder = |name: &str, value: toml::Value| {
            let config: PC = value.try_into().map_err(Error::Toml)?;
            config
                .build()
                .map_err(|e| Error::Config(e, name.to_string()))
        };

        Self { name, builder }
    }

    pub fn build(name: &str, value: toml::Value) -> Result<Box<dyn Publisher>, Error> {
        let registrations: HashMap<&'static str, &Registration> = inventory::iter::<Registration>()
            .map(|r| (r.name, r))
            .collect();

        registrations
            .get(name)
            .ok_or(Error::Unknown(name.to_string()))
            .and_then(|r| {
                let builder = r.builder;

                builder(name, value)
            })
    }
}

inventory::collect!(Registration);
