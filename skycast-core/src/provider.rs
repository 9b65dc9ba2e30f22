use crate::{
    Config,
    error::FetchError,
    model::Coordinates,
    provider::openweather::OpenWeatherSource,
    transform::{RawCondition, RawWeather},
};
use async_trait::async_trait;
use serde::Deserialize;
use std::{fmt::Debug, sync::Arc};

pub mod openweather;

/// Everything a source needs for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherQuery {
    pub coords: Coordinates,
    pub api_key: String,
}

/// Which layout the weather endpoint answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResponseShape {
    /// `/onecall`: the record is wrapped under `current`.
    #[default]
    OneCall,
    /// `/weather`: flat body with nested `main`, `wind` and `clouds`.
    Current,
}

impl ResponseShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseShape::OneCall => "onecall",
            ResponseShape::Current => "current",
        }
    }

    pub const fn all() -> &'static [ResponseShape] {
        &[ResponseShape::OneCall, ResponseShape::Current]
    }

    /// Endpoint path appended to the configured base URL.
    pub fn path(&self) -> &'static str {
        match self {
            ResponseShape::OneCall => "onecall",
            ResponseShape::Current => "weather",
        }
    }

    /// Query parameters beyond key and coordinates.
    pub fn extra_params(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            ResponseShape::OneCall => {
                &[("units", "metric"), ("exclude", "minutely,daily,alerts")]
            }
            ResponseShape::Current => &[("units", "metric")],
        }
    }

    /// Parse a response body of this shape into the flat record.
    pub fn normalize(&self, body: &str) -> Result<RawWeather, FetchError> {
        match self {
            ResponseShape::OneCall => {
                let parsed: OneCallResponse = serde_json::from_str(body)?;
                Ok(parsed.current)
            }
            ResponseShape::Current => {
                let parsed: CurrentResponse = serde_json::from_str(body)?;
                Ok(parsed.into())
            }
        }
    }
}

impl std::fmt::Display for ResponseShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ResponseShape {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "onecall" => Ok(ResponseShape::OneCall),
            "current" => Ok(ResponseShape::Current),
            _ => Err(anyhow::anyhow!(
                "Unknown response shape '{value}'. Supported shapes: onecall, current."
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OneCallResponse {
    current: RawWeather,
}

#[derive(Debug, Deserialize)]
struct CurrentMain {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct CurrentWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct CurrentClouds {
    all: f64,
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    dt: i64,
    main: CurrentMain,
    wind: CurrentWind,
    clouds: CurrentClouds,
    weather: Vec<RawCondition>,
}

impl From<CurrentResponse> for RawWeather {
    fn from(res: CurrentResponse) -> Self {
        RawWeather {
            dt: res.dt,
            temp: res.main.temp,
            humidity: res.main.humidity,
            clouds: res.clouds.all,
            wind_speed: res.wind.speed,
            weather: res.weather,
        }
    }
}

#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    /// Fetch current conditions once. No retry.
    async fn current(&self, query: &WeatherQuery) -> Result<RawWeather, FetchError>;
}

/// Construct the weather source described by config.
pub fn source_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherSource>> {
    let shape = config.response_shape()?;
    let source = OpenWeatherSource::new(config.endpoint(), shape)?;

    Ok(Arc::new(source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn response_shape_as_str_roundtrip() {
        for shape in ResponseShape::all() {
            let parsed = ResponseShape::try_from(shape.as_str()).expect("roundtrip should succeed");
            assert_eq!(*shape, parsed);
        }
        assert_eq!(ResponseShape::try_from("OneCall").unwrap(), ResponseShape::OneCall);
    }

    #[test]
    fn unknown_shape_error() {
        let err = ResponseShape::try_from("hourly").unwrap_err();
        assert!(err.to_string().contains("Unknown response shape"));
    }

    #[test]
    fn onecall_body_unwraps_current() {
        let body = json!({
            "lat": 52.1,
            "lon": 4.3,
            "timezone": "Europe/Amsterdam",
            "current": {
                "dt": 1_700_000_000,
                "temp": 20.4,
                "feels_like": 19.0,
                "humidity": 55,
                "clouds": 10,
                "wind_speed": 5,
                "weather": [{"id": 800, "main": "Clear", "description": "clear sky", "icon": "01d"}]
            },
            "hourly": []
        })
        .to_string();

        let raw = ResponseShape::OneCall.normalize(&body).unwrap();
        assert_eq!(raw.dt, 1_700_000_000);
        assert_eq!(raw.temp, 20.4);
        assert_eq!(raw.humidity, 55.0);
        assert_eq!(raw.weather[0].icon, "01d");
    }

    #[test]
    fn current_body_flattens_nested_fields() {
        let body = json!({
            "dt": 1_700_000_000,
            "name": "Leiden",
            "main": {"temp": 11.2, "humidity": 81, "pressure": 1012},
            "wind": {"speed": 4.1, "deg": 220},
            "clouds": {"all": 75},
            "weather": [{"description": "broken clouds", "icon": "04n"}]
        })
        .to_string();

        let raw = ResponseShape::Current.normalize(&body).unwrap();
        assert_eq!(raw.temp, 11.2);
        assert_eq!(raw.humidity, 81.0);
        assert_eq!(raw.wind_speed, 4.1);
        assert_eq!(raw.clouds, 75.0);
        assert_eq!(raw.weather[0].description, "broken clouds");
    }

    #[test]
    fn missing_fields_fail_explicitly() {
        let body = json!({"current": {"dt": 1, "temp": 2.0}}).to_string();
        let err = ResponseShape::OneCall.normalize(&body).unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));

        let err = ResponseShape::Current.normalize("not json").unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[test]
    fn shapes_use_their_own_endpoints() {
        assert_eq!(ResponseShape::OneCall.path(), "onecall");
        assert_eq!(ResponseShape::Current.path(), "weather");
        assert!(
            ResponseShape::OneCall
                .extra_params()
                .contains(&("exclude", "minutely,daily,alerts"))
        );
        assert!(!ResponseShape::Current.extra_params().iter().any(|(k, _)| *k == "exclude"));
    }

    #[test]
    fn source_from_config_rejects_unknown_shape() {
        let cfg = Config {
            shape: Some("nope".into()),
            ..Config::default()
        };
        let err = source_from_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("Unknown response shape"));
    }

    #[test]
    fn source_from_config_works_with_defaults() {
        assert!(source_from_config(&Config::default()).is_ok());
    }
}
