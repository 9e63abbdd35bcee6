use chrono::{TimeZone, Utc};

use crate::weather::{
    City, CityWeatherCondition, Length, MonitoringParam, MonitoringParams, WeatherCode,
};

pub fn cities() -> Vec<City> {
    vec![
        City::new("Berlin", 52.52, 13.41),
        City::new("Paris", 48.86, 2.35),
        City::new("London", 41.90, -0.13),
    ]
}

pub fn params() -> MonitoringParams {
    [
        (MonitoringParam::Temperature, "temperature_2m"),
        (MonitoringParam::RelativeHumidity, "relative_humidity_2m"),
        (MonitoringParam::WindSpeed, "wind_speed_10m"),
        (MonitoringParam::WeatherCode, "weather_code"),
        (MonitoringParam::CloudCover, "cloud_cover"),
        (MonitoringParam::Precipitation, "precipitation"),
        (MonitoringParam::Visibility, "visibility"),
    ]
    .into_iter()
    .map(|(k, v)| (k, v.to_string()))
    .collect()
}

pub fn berlin() -> CityWeatherCondition {
    CityWeatherCondition {
        city: City::new("Berlin", 52.52, 13.41),
        captured_at: Utc.with_ymd_and_hms(2025, 5, 3, 12, 58, 0).unwrap(),
        temperature: 12.5,
        relative_humidity_percent: 20,
        wind_speed: 3.7,
        weather_code: WeatherCode::ClearSky,
        cloud_cover_percent: 3,
        precipitation: 3 * Length::MILLIMETER,
        visibility: 40 * Length::KILOMETER,
    }
}

pub fn paris() -> CityWeatherCondition {
    CityWeatherCondition {
        city: City::new("Paris", 48.86, 2.35),
        captured_at: Utc.with_ymd_and_hms(2025, 5, 3, 13, 3, 0).unwrap(),
        temperature: 10.5,
        relative_humidity_percent: 13,
        wind_speed: 4.2,
        weather_code: WeatherCode::PartlyCloudy,
        cloud_cover_percent: 29,
        precipitation: 15 * Length::MILLIMETER,
        visibility: 31 * Length::KILOMETER,
    }
}

pub fn london() -> CityWeatherCondition {
    CityWeatherCondition {
        city: City::new("London", 41.90, -0.13),
        captured_at: Utc.with_ymd_and_hms(2025, 5, 3, 13, 5, 0).unwrap(),
        temperature: 11.8,
        relative_humidity_percent: 20,
        wind_speed: 6.2,
        weather_code: WeatherCode::Fog,
        cloud_cover_percent: 75,
        precipitation: 40 * Length::MILLIMETER,
        visibility: 5 * Length::KILOMETER,
    }
}

/// Fixed condition for the three reference cities, a generic one for any other.
pub fn condition_for(city: &City) -> CityWeatherCondition {
    match city.name.as_str() {
        "Berlin" => berlin(),
        "Paris" => paris(),
        "London" => london(),
        _ => CityWeatherCondition {
            city: city.clone(),
            ..berlin()
        },
    }
}
