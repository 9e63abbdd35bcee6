use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::{source::BoxError, weather::Conditions};

mod memory;
mod sqlite;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unknown storage {0}")]
    Unknown(String),

    #[error("invalid TOML: {0}")]
    Toml(#[source] toml::de::Error),

    #[error("invalid configuration for {1}: {0}")]
    Config(#[source] BoxError, String),
}

pub type StorageResult<T> = std::result::Result<T, BoxError>;

/// Keeps the latest known condition of every city.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Prepares the backing store. Safe to call more than once.
    async fn init(&self) -> StorageResult<()> {
        Ok(())
    }

    /// Inserts or replaces the condition of every city in `conditions`.
    async fn save_conditions(&self, conditions: &Conditions) -> StorageResult<()>;

    async fn get_conditions(&self) -> StorageResult<Conditions>;
}

pub trait StorageConfig {
    fn build(self) -> StorageResult<Box<dyn Storage>>;
}

pub struct Registration {
    name: &'static str,

    builder: fn(&str, toml::Value) -> Result<Box<dyn Storage>, Error>,
}

impl Registration {
    pub const fn new<'a, SC>(name: &'static str) -> Self
    where
        SC: StorageConfig + serde::Deserialize<'a>,
    {
        let builder = |name: &str, value: toml::Value| {
            let config: SC = value.try_into().map_err(Error::Toml)?;
            config
                .build()
                .map_err(|e| Error::Config(e, name.to_string()))
        };

        Self { name, builder }
    }

    pub fn build(name: &str, value: toml::Value) -> Result<Box<dyn Storage>, Error> {
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
