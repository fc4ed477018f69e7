//! OpenWeather current-conditions extraction

use super::types::WeatherRecord;
use crate::error::{Error, Result};
use chrono::NaiveDateTime;
use serde::Deserialize;

/// Format of [`WeatherRecord::request_datetime`]
pub const REQUEST_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `F = (K - 273.15) * 9/5 + 32`
pub fn kelvin_to_fahrenheit(kelvin: f64) -> f64 {
    (kelvin - 273.15) * 9.0 / 5.0 + 32.0
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    id: i64,
    name: String,
    coord: Coord,
    sys: Sys,
    weather: Vec<Condition>,
    main: Main,
    wind: Wind,
}

#[derive(Debug, Deserialize)]
struct Coord {
    lon: f64,
    lat: f64,
}

#[derive(Debug, Deserialize)]
struct Sys {
    country: String,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct Main {
    temp: f64,
    temp_min: f64,
    temp_max: f64,
    humidity: i64,
}

#[derive(Debug, Deserialize)]
struct Wind {
    speed: f64,
}

/// Parse a current-weather response into exactly one record
///
/// Malformed JSON or a missing field is a [`Decode`](Error::Decode) error.
pub fn extract_weather_record(body: &str, requested_at: NaiveDateTime) -> Result<WeatherRecord> {
    let current: CurrentWeather = serde_json::from_str(body)
        .map_err(|e| Error::decode(format!("Invalid weather response: {e}")))?;

    let description = current
        .weather
        .into_iter()
        .next()
        .map(|c| c.description)
        .ok_or_else(|| Error::decode("Invalid weather response: empty 'weather' list"))?;

    Ok(WeatherRecord {
        request_datetime: requested_at.format(REQUEST_DATETIME_FORMAT).to_string(),
        city_name: current.name,
        city_id: current.id,
        city_country: current.sys.country,
        longitude: current.coord.lon,
        latitude: current.coord.lat,
        weather_description: description,
        temp_fahrenheit: kelvin_to_fahrenheit(current.main.temp),
        temp_min_fahrenheit: kelvin_to_fahrenheit(current.main.temp_min),
        temp_max_fahrenheit: kelvin_to_fahrenheit(current.main.temp_max),
        humidity: current.main.humidity,
        wind_speed: current.wind.speed,
    })
}
