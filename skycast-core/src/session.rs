use serde::Serialize;
use tracing::{info, warn};

use crate::{
    fetcher::WeatherFetcher,
    location::{PositionProvider, PositionState},
    model::{FetchState, FetchStatus, WeatherViewModel},
};

/// Shown when the position resolved but the fetcher had nothing to request with.
pub const NOT_REQUESTED_MESSAGE: &str =
    "Weather was not requested: coordinates must be non-zero and an API key must be set";

/// What the presentation layer should show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "lowercase")]
pub enum DisplayState {
    Loading,
    Error(String),
    Ready(WeatherViewModel),
}

/// Combine both component states. A geolocation error wins over a fetch error.
pub fn display_state(position: &PositionState, fetch: &FetchState) -> DisplayState {
    if let Some(err) = position.error.as_ref().or(fetch.error.as_ref()) {
        return DisplayState::Error(err.clone());
    }

    match &fetch.data {
        Some(data) => DisplayState::Ready(data.clone()),
        None => DisplayState::Loading,
    }
}

/// One application session: position first, then the weather for it.
#[derive(Debug)]
pub struct WeatherSession {
    position: PositionProvider,
    fetcher: WeatherFetcher,
    last_position: PositionState,
}

impl WeatherSession {
    pub fn new(position: PositionProvider, fetcher: WeatherFetcher) -> Self {
        Self {
            position,
            fetcher,
            last_position: PositionState::default(),
        }
    }

    pub fn fetcher(&self) -> &WeatherFetcher {
        &self.fetcher
    }

    /// Run a full fetch cycle and return the resulting display.
    pub async fn run(&mut self) -> DisplayState {
        let position = self.position.resolve().await;

        if let Some(coords) = position.coords {
            self.fetcher.set_coordinates(Some(coords.latitude), Some(coords.longitude));
        }
        self.last_position = position;

        let fetch = self.fetcher.settled().await;
        info!(status = ?fetch.status, "session settled");

        if fetch.status == FetchStatus::Idle && self.last_position.error.is_none() {
            warn!(coords = ?self.last_position.coords, "fetcher stayed idle");
            return DisplayState::Error(NOT_REQUESTED_MESSAGE.to_string());
        }

        self.display()
    }

    pub fn display(&self) -> DisplayState {
        display_state(&self.last_position, &self.fetcher.state())
    }
}
