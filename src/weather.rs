use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, collections::BTreeMap, fmt, str::FromStr};
use thiserror::Error;

#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq)]
pub struct Coordinates {
    pub lat: f64,

    pub long: f64,
}

impl Coordinates {
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.long)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lat, self.long)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct City {
    pub name: String,

    pub coordinates: Coordinates,
}

impl City {
    pub fn new(name: impl Into<String>, lat: f64, long: f64) -> Self {
        Self {
            name: name.into(),
            coordinates: Coordinates { lat, long },
        }
    }
}

/// A measurement that can be requested from a weather source.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase", try_from = "String")]
pub enum MonitoringParam {
    Temperature,
    RelativeHumidity,
    WindSpeed,
    WeatherCode,
    CloudCover,
    Precipitation,
    Visibility,
}

impl MonitoringParam {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::RelativeHumidity => "relativeHumidity",
            Self::WindSpeed => "windSpeed",
            Self::WeatherCode => "weatherCode",
            Self::CloudCover => "cloudCover",
            Self::Precipitation => "precipitation",
            Self::Visibility => "visibility",
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("unknown monitoring param {0}")]
pub struct UnknownParam(String);

impl FromStr for MonitoringParam {
    type Err = UnknownParam;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "temperature" => Ok(Self::Temperature),
            "relativeHumidity" => Ok(Self::RelativeHumidity),
            "windSpeed" => Ok(Self::WindSpeed),
            "weatherCode" => Ok(Self::WeatherCode),
            "cloudCover" => Ok(Self::CloudCover),
            "precipitation" => Ok(Self::Precipitation),
            "visibility" => Ok(Self::Visibility),
            other => Err(UnknownParam(other.to_string())),
        }
    }
}

// Config keys reach the deserializer as plain strings, not enum variants.
impl TryFrom<String> for MonitoringParam {
    type Error = UnknownParam;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

// Ordered by key name so that iteration over `MonitoringParams` is stable.
impl Ord for MonitoringParam {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl PartialOrd for MonitoringParam {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Maps every requested measurement to the provider specific token.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(transparent)]
pub struct MonitoringParams(BTreeMap<MonitoringParam, String>);

impl MonitoringParams {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, param: MonitoringParam, token: impl Into<String>) {
        self.0.insert(param, token.into());
    }

    pub fn get(&self, param: MonitoringParam) -> Option<&str> {
        self.0.get(&param).map(String::as_str)
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.0.values().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(MonitoringParam, String)> for MonitoringParams {
    fn from_iter<T: IntoIterator<Item = (MonitoringParam, String)>>(iter: T) -> Self {
        Self(BTreeMap::from_iter(iter))
    }
}

/// WMO weather interpretation code.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(from = "i32", into = "i32")]
pub enum WeatherCode {
    ClearSky,
    MainlyClear,
    PartlyCloudy,
    Overcast,
    Fog,
    DepositingRimeFog,
    DrizzleLight,
    DrizzleModerate,
    DrizzleDense,
    FreezingDrizzleLight,
    FreezingDrizzleDense,
    RainSlight,
    RainModerate,
    RainHeavy,
    FreezingRainLight,
    FreezingRainHeavy,
    SnowFallSlight,
    SnowFallModerate,
    SnowFallHeavy,
    SnowGrains,
    RainShowersSlight,
    RainShowersModerate,
    RainShowersViolent,
    SnowShowersSlight,
    SnowShowersHeavy,
    ThunderstormSlight,
    ThunderstormHailSlight,
    ThunderstormHailHeavy,
    Unknown(i32),
}

impl From<i32> for WeatherCode {
    fn from(code: i32) -> Self {
        match code {
            0 => Self::ClearSky,
            1 => Self::MainlyClear,
            2 => Self::PartlyCloudy,
            3 => Self::Overcast,
            45 => Self::Fog,
            48 => Self::DepositingRimeFog,
            51 => Self::DrizzleLight,
            53 => Self::DrizzleModerate,
            55 => Self::DrizzleDense,
            56 => Self::FreezingDrizzleLight,
            57 => Self::FreezingDrizzleDense,
            61 => Self::RainSlight,
            63 => Self::RainModerate,
            65 => Self::RainHeavy,
            66 => Self::FreezingRainLight,
            67 => Self::FreezingRainHeavy,
            71 => Self::SnowFallSlight,
            73 => Self::SnowFallModerate,
            75 => Self::SnowFallHeavy,
            77 => Self::SnowGrains,
            80 => Self::RainShowersSlight,
            81 => Self::RainShowersModerate,
            82 => Self::RainShowersViolent,
            85 => Self::SnowShowersSlight,
            86 => Self::SnowShowersHeavy,
            95 => Self::ThunderstormSlight,
            96 => Self::ThunderstormHailSlight,
            99 => Self::ThunderstormHailHeavy,
            other => Self::Unknown(other),
        }
    }
}

impl From<WeatherCode> for i32 {
    fn from(code: WeatherCode) -> Self {
        match code {
            WeatherCode::ClearSky => 0,
            WeatherCode::MainlyClear => 1,
            WeatherCode::PartlyCloudy => 2,
            WeatherCode::Overcast => 3,
            WeatherCode::Fog => 45,
            WeatherCode::DepositingRimeFog => 48,
            WeatherCode::DrizzleLight => 51,
            WeatherCode::DrizzleModerate => 53,
            WeatherCode::DrizzleDense => 55,
            WeatherCode::FreezingDrizzleLight => 56,
            WeatherCode::FreezingDrizzleDense => 57,
            WeatherCode::RainSlight => 61,
            WeatherCode::RainModerate => 63,
            WeatherCode::RainHeavy => 65,
            WeatherCode::FreezingRainLight => 66,
            WeatherCode::FreezingRainHeavy => 67,
            WeatherCode::SnowFallSlight => 71,
            WeatherCode::SnowFallModerate => 73,
            WeatherCode::SnowFallHeavy => 75,
            WeatherCode::SnowGrains => 77,
            WeatherCode::RainShowersSlight => 80,
            WeatherCode::RainShowersModerate => 81,
            WeatherCode::RainShowersViolent => 82,
            WeatherCode::SnowShowersSlight => 85,
            WeatherCode::SnowShowersHeavy => 86,
            WeatherCode::ThunderstormSlight => 95,
            WeatherCode::ThunderstormHailSlight => 96,
            WeatherCode::ThunderstormHailHeavy => 99,
            WeatherCode::Unknown(other) => other,
        }
    }
}

/// A length stored as a whole number of millimeters.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Length(i64);

impl Length {
    pub const MILLIMETER: Length = Length(1);
    pub const CENTIMETER: Length = Length(10);
    pub const METER: Length = Length(1_000);
    pub const KILOMETER: Length = Length(1_000_000);

    pub const fn from_millimeters(mm: i64) -> Self {
        Self(mm)
    }

    /// Converts a fractional amount of `unit`, rounding to the nearest millimeter.
    pub fn from_fractional(value: f64, unit: Length) -> Self {
        Self((value * unit.0 as f64).round() as i64)
    }

    pub const fn millimeters(&self) -> i64 {
        self.0
    }
}

impl std::ops::Mul<Length> for i64 {
    type Output = Length;

    fn mul(self, rhs: Length) -> Length {
        Length(self * rhs.0)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CityWeatherCondition {
    pub city: City,

    pub captured_at: DateTime<Utc>,

    pub temperature: f64,

    pub relative_humidity_percent: u8,

    pub wind_speed: f64,

    pub weather_code: WeatherCode,

    pub cloud_cover_percent: u8,

    pub precipitation: Length,

    pub visibility: Length,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(transparent)]
pub struct Conditions(Vec<CityWeatherCondition>);

impl From<Vec<CityWeatherCondition>> for Conditions {
    fn from(conditions: Vec<CityWeatherCondition>) -> Self {
        Self(conditions)
    }
}

impl FromIterator<CityWeatherCondition> for Conditions {
    fn from_iter<T: IntoIterator<Item = CityWeatherCondition>>(iter: T) -> Self {
        Conditions(Vec::from_iter(iter))
    }
}

impl IntoIterator for Conditions {
    type Item = CityWeatherCondition;

    type IntoIter = <Vec<CityWeatherCondition> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl Conditions {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CityWeatherCondition> {
        self.0.iter()
    }

    /// Sorts by city name, for callers that need a stable order.
    pub fn sorted_by_city(mut self) -> Self {
        self.0.sort_by(|a, b| a.city.name.cmp(&b.city.name));
        self
    }
}
