use std::num::TryFromIntError;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tracing::debug;

use crate::{
    storage::Registration,
    weather::{City, CityWeatherCondition, Conditions, Coordinates, Length, WeatherCode},
};

use super::{Storage, StorageConfig, StorageResult};

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

const CREATE_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS current_weather_conditions (
        city_name                 TEXT PRIMARY KEY NOT NULL,
        latitude                  REAL NOT NULL,
        longitude                 REAL NOT NULL,
        captured_at               TEXT NOT NULL,
        temperature               REAL NOT NULL,
        relative_humidity_percent INTEGER NOT NULL,
        wind_speed                REAL NOT NULL,
        weather_code              INTEGER NOT NULL,
        cloud_cover_percent       INTEGER NOT NULL,
        precipitation_millimeters INTEGER NOT NULL,
        visibility_millimeters    INTEGER NOT NULL
    )";

const UPSERT: &str = "
    INSERT INTO current_weather_conditions (
        city_name,
        latitude,
        longitude,
        captured_at,
        temperature,
        relative_humidity_percent,
        wind_speed,
        weather_code,
        cloud_cover_percent,
        precipitation_millimeters,
        visibility_millimeters
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT (city_name) DO UPDATE SET
        latitude                  = excluded.latitude,
        longitude                 = excluded.longitude,
        captured_at               = excluded.captured_at,
        temperature               = excluded.temperature,
        relative_humidity_percent = excluded.relative_humidity_percent,
        wind_speed                = excluded.wind_speed,
        weather_code              = excluded.weather_code,
        cloud_cover_percent       = excluded.cloud_cover_percent,
        precipitation_millimeters = excluded.precipitation_millimeters,
        visibility_millimeters    = excluded.visibility_millimeters";

const SELECT_ALL: &str = "
    SELECT
        city_name,
        latitude,
        longitude,
        captured_at,
        temperature,
        relative_humidity_percent,
        wind_speed,
        weather_code,
        cloud_cover_percent,
        precipitation_millimeters,
        visibility_millimeters
    FROM current_weather_conditions";

#[derive(Error, Debug)]
enum Error {
    #[error("invalid connection settings: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("unable to create schema: {0}")]
    Schema(#[source] sqlx::Error),

    #[error("unable to save conditions: {0}")]
    Write(#[source] sqlx::Error),

    #[error("unable to read conditions: {0}")]
    Read(#[source] sqlx::Error),

    #[error("stored value of {1} out of range: {0}")]
    Range(#[source] TryFromIntError, &'static str),
}

#[derive(sqlx::FromRow)]
struct Row {
    city_name: String,
    latitude: f64,
    longitude: f64,
    captured_at: DateTime<Utc>,
    temperature: f64,
    relative_humidity_percent: i64,
    wind_speed: f64,
    weather_code: i32,
    cloud_cover_percent: i64,
    precipitation_millimeters: i64,
    visibility_millimeters: i64,
}

impl Row {
    fn into_condition(self) -> Result<CityWeatherCondition, Error> {
        Ok(CityWeatherCondition {
            city: City {
                name: self.city_name,
                coordinates: Coordinates {
                    lat: self.latitude,
                    long: self.longitude,
                },
            },
            captured_at: self.captured_at,
            temperature: self.temperature,
            relative_humidity_percent: u8::try_from(self.relative_humidity_percent)
                .map_err(|e| Error::Range(e, "relative_humidity_percent"))?,
            wind_speed: self.wind_speed,
            weather_code: WeatherCode::from(self.weather_code),
            cloud_cover_percent: u8::try_from(self.cloud_cover_percent)
                .map_err(|e| Error::Range(e, "cloud_cover_percent"))?,
            precipitation: Length::from_millimeters(self.precipitation_millimeters),
            visibility: Length::from_millimeters(self.visibility_millimeters),
        })
    }
}

struct Sqlite {
    pool: SqlitePool,
}

#[async_trait]
impl Storage for Sqlite {
    async fn init(&self) -> StorageResult<()> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .map_err(Error::Schema)?;

        Ok(())
    }

    async fn save_conditions(&self, conditions: &Conditions) -> StorageResult<()> {
        if conditions.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(Error::Write)?;

        for condition in conditions.iter() {
            sqlx::query(UPSERT)
                .bind(&condition.city.name)
                .bind(condition.city.coordinates.lat)
                .bind(condition.city.coordinates.long)
                .bind(condition.captured_at)
                .bind(condition.temperature)
                .bind(i64::from(condition.relative_humidity_percent))
                .bind(condition.wind_speed)
                .bind(i32::from(condition.weather_code))
                .bind(i64::from(condition.cloud_cover_percent))
                .bind(condition.precipitation.millimeters())
                .bind(condition.visibility.millimeters())
                .execute(&mut *tx)
                .await
                .map_err(Error::Write)?;
        }

        tx.commit().await.map_err(Error::Write)?;

        debug!("saved {} conditions", conditions.len());

        Ok(())
    }

    async fn get_conditions(&self) -> StorageResult<Conditions> {
        let rows: Vec<Row> = sqlx::query_as(SELECT_ALL)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Read)?;

        let conditions = rows
            .into_iter()
            .map(Row::into_condition)
            .collect::<Result<Conditions, _>>()?;

        Ok(conditions)
    }
}

#[derive(Deserialize, Serialize, Debug)]
struct Config {
    url: String,

    max_connections: Option<u32>,
}

impl StorageConfig for Config {
    fn build(self) -> StorageResult<Box<dyn Storage>> {
        let pool = SqlitePoolOptions::new()
            .max_connections(self.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS))
            .connect_lazy(&self.url)
            .map_err(Error::Connect)?;

        Ok(Box::new(Sqlite { pool }))
    }
}

inventory::submit! {
    Registration::new::<Config>("sqlite")
}
