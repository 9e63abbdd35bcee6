use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::weather::{City, CityWeatherCondition, MonitoringParams};

pub mod open_meteo;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unknown source {0}")]
    Unknown(String),

    #[error("invalid configuration: {0}")]
    Toml(#[source] toml::de::Error),

    #[error("invalid configuration for {1}: {0}")]
    Config(#[source] BoxError, String),
}

pub type SourceResult<T> = std::result::Result<T, BoxError>;

/// Fetches the current conditions of a single city.
///
/// Implementations are called concurrently from several collection workers.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn current_weather(
        &self,
        city: &City,
        params: &MonitoringParams,
    ) -> SourceResult<CityWeatherCondition>;
}

pub trait WeatherSourceConfig {
    fn build(self) -> SourceResult<Box<dyn WeatherSource>>;
}

pub struct Registration {
    name: &'static str,

    builder: fn(&str, toml::Value) -> Result<Box<dyn WeatherSource>, Error>,
}

impl Registration {
    pub const fn new<'a, WSC>(name: &'static str) -> Self
    where
        WSC: WeatherSourceConfig + serde::Deserialize<'a>,
    {
        let builder = |name: &str, value: toml::Value| {
            let config: WSC = value.try_into().map_err(Error::Toml)?;
            config
                .build()
                .map_err(|e| Error::Config(e, name.to_string()))
        };

        Self { name, builder }
    }

    pub fn build(name: &str, value: toml::Value) -> Result<Box<dyn WeatherSource>, Error> {
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
