use crate::{
    publisher::{self, Publisher},
    scheduler::Schedule,
    service::WeatherService,
    source, storage,
    topology::{Component, Topology},
    weather::{City, MonitoringParams},
};
use std::{collections::HashMap, path::Path, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum Error {
    #[error("error reading file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("invalid toml format: {0}")]
    Toml(#[source] toml::de::Error),

    #[error("worker_pool_size must be at least 1")]
    WorkerPoolSize,

    #[error("{0} must be greater than zero")]
    Interval(&'static str),

    #[error("invalid coordinates {1} for city {0}")]
    Coordinates(String, String),

    #[error("city {0} is listed more than once")]
    DuplicateCity(String),

    #[error("expected exactly one {0}, found {1}")]
    Count(&'static str, usize),

    #[error("invalid source {1}: {0}")]
    Source(#[source] source::Error, String),

    #[error("invalid storage {1}: {0}")]
    Storage(#[source] storage::Error, String),

    #[error("invalid publisher {1}: {0}")]
    Publisher(#[source] publisher::Error, String),
}

#[derive(Serialize, Deserialize, Debug)]
struct CityRaw {
    name: String,

    lat: f64,

    long: f64,
}

#[derive(Serialize, Deserialize, Debug)]
struct ConfigRaw {
    worker_pool_size: usize,

    collect_every_secs: u64,

    send_every_secs: u64,

    collect_timeout_secs: Option<u64>,

    #[serde(default)]
    cities: Vec<CityRaw>,

    monitoring_params: MonitoringParams,

    #[serde(default)]
    source: HashMap<String, toml::Value>,

    #[serde(default)]
    storage: HashMap<String, toml::Value>,

    #[serde(default)]
    publishers: HashMap<String, toml::Value>,
}

impl ConfigRaw {
    fn to_config(self) -> Result<Config, Error> {
        if self.worker_pool_size < 1 {
            return Err(Error::WorkerPoolSize);
        }

        let cities = Self::parse_cities(self.cities)?;

        Ok(Config {
            worker_pool_size: self.worker_pool_size,
            collect_every: Self::parse_secs(self.collect_every_secs, "collect_every_secs")?,
            send_every: Self::parse_secs(self.send_every_secs, "send_every_secs")?,
            collect_timeout: self
                .collect_timeout_secs
                .map(|secs| Self::parse_secs(secs, "collect_timeout_secs"))
                .transpose()?,
            cities,
            monitoring_params: self.monitoring_params,
            source: Self::single(self.source, "source")?,
            storage: Self::single(self.storage, "storage")?,
            publishers: self.publishers,
        })
    }

    fn parse_secs(secs: u64, name: &'static str) -> Result<Duration, Error> {
        match secs {
            0 => Err(Error::Interval(name)),
            secs => Ok(Duration::from_secs(secs)),
        }
    }

    fn parse_cities(raw: Vec<CityRaw>) -> Result<Vec<City>, Error> {
        let mut cities: Vec<City> = Vec::with_capacity(raw.len());

        for c in raw {
            let city = City::new(c.name, c.lat, c.long);

            if !city.coordinates.is_valid() {
                return Err(Error::Coordinates(city.name, city.coordinates.to_string()));
            }

            if cities.iter().any(|other| other.name == city.name) {
                return Err(Error::DuplicateCity(city.name));
            }

            cities.push(city);
        }

        Ok(cities)
    }

    fn single(
        components: HashMap<String, toml::Value>,
        kind: &'static str,
    ) -> Result<(String, toml::Value), Error> {
        let count = components.len();

        match components.into_iter().next() {
            Some(component) if count == 1 => Ok(component),
            _ => Err(Error::Count(kind, count)),
        }
    }
}

#[derive(Debug)]
struct Config {
    worker_pool_size: usize,

    collect_every: Duration,

    send_every: Duration,

    collect_timeout: Option<Duration>,

    cities: Vec<City>,

    monitoring_params: MonitoringParams,

    source: (String, toml::Value),

    storage: (String, toml::Value),

    publishers: HashMap<String, toml::Value>,
}

pub fn read(file: impl AsRef<Path>) -> Result<Topology, Error> {
    let content = std::fs::read_to_string(file).map_err(Error::ReadFile)?;
    parse(&content)
}

pub fn parse(content: &str) -> Result<Topology, Error> {
    let config_raw: ConfigRaw = toml::from_str(content).map_err(Error::Toml)?;
    let config = config_raw.to_config()?;

    if config.cities.is_empty() {
        warn!("no cities configured, collection runs will be empty");
    }

    if config.monitoring_params.is_empty() {
        warn!("no monitoring params configured, only capture times will be collected");
    }

    if config.publishers.is_empty() {
        warn!("no publishers configured, stored conditions will not be sent anywhere");
    }

    let (name, value) = config.source;
    let source = Component::new(
        name.clone(),
        source::Registration::build(&name, value).map_err(|e| Error::Source(e, name.clone()))?,
    );

    let (name, value) = config.storage;
    let storage = Component::new(
        name.clone(),
        storage::Registration::build(&name, value).map_err(|e| Error::Storage(e, name.clone()))?,
    );

    let publishers: Vec<Component<dyn Publisher>> = config
        .publishers
        .into_iter()
        .map(|(k, v)| {
            let component = publisher::Registration::build(&k, v)
                .map_err(|e| Error::Publisher(e, k.clone()))?;

            Ok::<_, Error>(Component::new(k, component))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Topology {
        service: WeatherService {
            cities: config.cities,
            params: Arc::new(config.monitoring_params),
            worker_pool_size: config.worker_pool_size,
            collect_timeout: config.collect_timeout,
            source,
            storage,
            publishers,
        },
        collect: Schedule::new("collect", config.collect_every),
        send: Schedule::new("send", config.send_every),
    })
}
