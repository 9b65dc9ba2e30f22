//! Position provider: permission, then a single position lookup.

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::fmt::Debug;
use tracing::{debug, info, warn};

use crate::{
    Config,
    error::{LocationError, PERMISSION_DENIED_MESSAGE},
    model::Coordinates,
};

pub const DEFAULT_IP_LOOKUP_URL: &str = "http://ip-api.com/json/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

/// Host geolocation service.
#[async_trait]
pub trait Geolocator: Send + Sync + Debug {
    async fn request_permission(&self) -> Permission;

    async fn current_position(&self) -> anyhow::Result<Coordinates>;
}

/// Outcome of a position lookup, with the error already reduced to a message.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PositionState {
    pub coords: Option<Coordinates>,
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct PositionProvider {
    geolocator: Box<dyn Geolocator>,
}

impl PositionProvider {
    pub fn new(geolocator: Box<dyn Geolocator>) -> Self {
        Self { geolocator }
    }

    /// Ask for permission, then for the position once. Failures are final.
    pub async fn locate(&self) -> Result<Coordinates, LocationError> {
        if self.geolocator.request_permission().await == Permission::Denied {
            warn!("location permission denied");
            return Err(LocationError::PermissionDenied(PERMISSION_DENIED_MESSAGE.to_string()));
        }

        let coords = self.geolocator.current_position().await.map_err(|err| {
            warn!(error = %err, "location unavailable");
            LocationError::Unavailable(err.to_string())
        })?;

        info!(lat = coords.latitude, lon = coords.longitude, "position resolved");
        Ok(coords)
    }

    pub async fn resolve(&self) -> PositionState {
        match self.locate().await {
            Ok(coords) => PositionState {
                coords: Some(coords),
                error: None,
            },
            Err(err) => PositionState {
                coords: None,
                error: Some(err.to_string()),
            },
        }
    }
}

/// Coordinates known up front (command line or config).
#[derive(Debug, Clone, Copy)]
pub struct FixedGeolocator {
    coords: Coordinates,
}

impl FixedGeolocator {
    pub fn new(coords: Coordinates) -> Self {
        Self { coords }
    }
}

#[async_trait]
impl Geolocator for FixedGeolocator {
    async fn request_permission(&self) -> Permission {
        Permission::Granted
    }

    async fn current_position(&self) -> anyhow::Result<Coordinates> {
        Ok(self.coords)
    }
}

/// Approximate position from the public IP address.
///
/// Permission is granted only when the user opted in to the lookup.
#[derive(Debug, Clone)]
pub struct IpGeolocator {
    url: String,
    allowed: bool,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

impl IpGeolocator {
    pub fn new(url: impl Into<String>, allowed: bool) -> Self {
        Self {
            url: url.into(),
            allowed,
            http: Client::new(),
        }
    }
}

#[async_trait]
impl Geolocator for IpGeolocator {
    async fn request_permission(&self) -> Permission {
        if self.allowed {
            Permission::Granted
        } else {
            Permission::Denied
        }
    }

    async fn current_position(&self) -> anyhow::Result<Coordinates> {
        debug!(url = %self.url, "looking up position by IP");

        let res = self
            .http
            .get(&self.url)
            .query(&[("fields", "status,message,lat,lon")])
            .send()
            .await
            .context("Failed to reach IP geolocation service")?;

        let parsed: IpApiResponse =
            res.json().await.context("Failed to parse IP geolocation response")?;

        if parsed.status != "success" {
            return Err(anyhow!(
                "IP geolocation failed: {}",
                parsed.message.as_deref().unwrap_or("unknown reason")
            ));
        }

        match (parsed.lat, parsed.lon) {
            (Some(lat), Some(lon)) => Ok(Coordinates::new(lat, lon)),
            _ => Err(anyhow!("IP geolocation response had no coordinates")),
        }
    }
}

/// Pick the geolocator: explicit coordinates, then configured ones, then IP lookup.
pub fn geolocator_from_config(
    config: &Config,
    explicit: Option<Coordinates>,
) -> Box<dyn Geolocator> {
    match explicit.or(config.location) {
        Some(coords) => Box::new(FixedGeolocator::new(coords)),
        None => Box::new(IpGeolocator::new(
            config.ip_lookup_url.as_deref().unwrap_or(DEFAULT_IP_LOOKUP_URL),
            config.allow_ip_lookup,
        )),
    }
}
