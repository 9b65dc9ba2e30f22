//! Core library for the `skycast` current-weather display.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The position provider and its geolocation backends
//! - The weather fetcher and the two OpenWeather response shapes
//! - The pure transform into display-ready values
//!
//! It is used by `skycast-cli`, but can also be embedded in other front ends.

pub mod config;
pub mod error;
pub mod fetcher;
pub mod location;
pub mod model;
pub mod provider;
pub mod session;
pub mod suggest;
pub mod transform;

pub use config::Config;
pub use error::{FetchError, LocationError, TransformError};
pub use fetcher::WeatherFetcher;
pub use location::{Geolocator, PositionProvider, PositionState, geolocator_from_config};
pub use model::{Coordinates, FetchState, FetchStatus, IconCategory, WeatherViewModel};
pub use provider::{ResponseShape, WeatherSource, source_from_config};
pub use session::{DisplayState, WeatherSession, display_state};
pub use suggest::{SuggestedEdit, submit_suggestion};
pub use transform::{RawWeather, transform};
