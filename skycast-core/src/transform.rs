//! Pure mapping from the provider's record to the display shape.

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};

use crate::{
    error::TransformError,
    model::{IconCategory, WeatherViewModel},
};

/// One entry of the provider's condition list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCondition {
    pub description: String,
    pub icon: String,
}

/// Current conditions in the flat provider layout.
///
/// Both response shapes normalize into this record before transforming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawWeather {
    /// Report time, seconds since the epoch.
    pub dt: i64,
    pub temp: f64,
    pub humidity: f64,
    pub clouds: f64,
    pub wind_speed: f64,
    pub weather: Vec<RawCondition>,
}

const ICON_TABLE: [(&str, IconCategory); 18] = [
    ("01d", IconCategory::Sunny),
    ("02d", IconCategory::Cloudy),
    ("03d", IconCategory::Cloudy),
    ("04d", IconCategory::Cloudy),
    ("09d", IconCategory::Showers),
    ("10d", IconCategory::Rain),
    ("11d", IconCategory::Thunderstorms),
    ("13d", IconCategory::WindySnow),
    ("50d", IconCategory::Fog),
    ("01n", IconCategory::Sunny),
    ("02n", IconCategory::Cloudy),
    ("03n", IconCategory::Cloudy),
    ("04n", IconCategory::Cloudy),
    ("09n", IconCategory::Showers),
    ("10n", IconCategory::Rain),
    ("11n", IconCategory::Thunderstorms),
    ("13n", IconCategory::WindySnow),
    ("50n", IconCategory::Fog),
];

/// Map a provider icon code to its category. Unknown codes are sunny.
pub fn icon_category(code: &str) -> IconCategory {
    ICON_TABLE
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, category)| *category)
        .unwrap_or_default()
}

/// Round up to the next whole degree.
pub fn format_temperature(celsius: f64) -> String {
    // `+ 0.0` folds the negative zero produced by ceil(-0.4)
    format!("{}°C", celsius.ceil() + 0.0)
}

/// Short 24-hour time of day for a report timestamp.
pub fn format_time<Tz>(timestamp: i64, tz: &Tz) -> Result<String, TransformError>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let utc = DateTime::from_timestamp(timestamp, 0)
        .ok_or(TransformError::InvalidTimestamp(timestamp))?;

    Ok(utc.with_timezone(tz).format("%H:%M").to_string())
}

/// Transform a raw record, rendering the time in the local zone.
pub fn transform(raw: &RawWeather) -> Result<WeatherViewModel, TransformError> {
    transform_in(raw, &Local)
}

/// Transform a raw record, rendering the time in `tz`.
pub fn transform_in<Tz>(raw: &RawWeather, tz: &Tz) -> Result<WeatherViewModel, TransformError>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let condition = raw.weather.first().ok_or(TransformError::MissingCondition)?;

    Ok(WeatherViewModel {
        icon: icon_category(&condition.icon),
        time: format_time(raw.dt, tz)?,
        wind: format!("{} km/h", raw.wind_speed),
        cloud: format!("{}%", raw.clouds),
        humidity: format!("{}%", raw.humidity),
        temperature: format_temperature(raw.temp),
        description: condition.description.clone(),
    })
}
