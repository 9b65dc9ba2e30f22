use serde::{Deserialize, Serialize};

/// A resolved device position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Symbolic weather glyph category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum IconCategory {
    #[default]
    Sunny,
    Cloudy,
    Showers,
    Rain,
    Thunderstorms,
    WindySnow,
    Fog,
}

impl IconCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            IconCategory::Sunny => "sunny",
            IconCategory::Cloudy => "cloudy",
            IconCategory::Showers => "showers",
            IconCategory::Rain => "rain",
            IconCategory::Thunderstorms => "thunderstorms",
            IconCategory::WindySnow => "windySnow",
            IconCategory::Fog => "fog",
        }
    }

    /// Terminal glyph for the category. Showers and rain share one.
    pub fn glyph(&self) -> &'static str {
        match self {
            IconCategory::Sunny => "☀",
            IconCategory::Cloudy => "☁",
            IconCategory::Showers | IconCategory::Rain => "🌧",
            IconCategory::Thunderstorms => "⛈",
            IconCategory::WindySnow => "❄",
            IconCategory::Fog => "🌫",
        }
    }
}

impl std::fmt::Display for IconCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display-ready current conditions. Every field is already formatted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherViewModel {
    pub icon: IconCategory,
    pub time: String,
    pub wind: String,
    pub cloud: String,
    pub humidity: String,
    pub temperature: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FetchStatus {
    #[default]
    Idle,
    Pending,
    Resolved,
    Rejected,
}

impl FetchStatus {
    pub fn is_settled(&self) -> bool {
        matches!(self, FetchStatus::Resolved | FetchStatus::Rejected)
    }
}

/// Observable state of the weather fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FetchState {
    pub status: FetchStatus,
    pub data: Option<WeatherViewModel>,
    pub error: Option<String>,
}

impl FetchState {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn pending() -> Self {
        Self {
            status: FetchStatus::Pending,
            data: None,
            error: None,
        }
    }

    pub fn resolved(data: WeatherViewModel) -> Self {
        Self {
            status: FetchStatus::Resolved,
            data: Some(data),
            error: None,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            status: FetchStatus::Rejected,
            data: None,
            error: Some(error.into()),
        }
    }
}
