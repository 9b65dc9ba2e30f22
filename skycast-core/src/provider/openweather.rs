use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    error::FetchError,
    provider::{ResponseShape, WeatherQuery},
    transform::RawWeather,
};

use super::WeatherSource;

pub const DEFAULT_ENDPOINT: &str = "https://api.openweathermap.org/data/2.5";

/// OpenWeather client for either response shape.
#[derive(Debug, Clone)]
pub struct OpenWeatherSource {
    base_url: String,
    shape: ResponseShape,
    http: Client,
}

impl OpenWeatherSource {
    pub fn new(base_url: &str, shape: ResponseShape) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("skycast/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            shape,
            http,
        })
    }

    fn url(&self) -> String {
        format!("{}/{}", self.base_url, self.shape.path())
    }
}

/// Error body OpenWeather sends with non-2xx answers.
#[derive(Debug, Deserialize)]
struct OwErrorBody {
    message: String,
}

#[async_trait]
impl WeatherSource for OpenWeatherSource {
    async fn current(&self, query: &WeatherQuery) -> Result<RawWeather, FetchError> {
        let url = self.url();
        debug!(
            %url,
            lat = query.coords.latitude,
            lon = query.coords.longitude,
            "requesting weather"
        );

        let mut params = vec![
            ("appid", query.api_key.clone()),
            ("lat", query.coords.latitude.to_string()),
            ("lon", query.coords.longitude.to_string()),
        ];
        params.extend(self.shape.extra_params().iter().map(|(k, v)| (*k, v.to_string())));

        let res = self.http.get(&url).query(&params).send().await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<OwErrorBody>(&body)
                .map(|err| err.message)
                .unwrap_or_else(|_| truncate_body(&body));
            warn!(status = status.as_u16(), %message, "weather request rejected");

            return Err(FetchError::Status {
                status: status.as_u16(),
                message,
            });
        }

        self.shape.normalize(&body)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let cut = (0..=MAX).rev().find(|i| body.is_char_boundary(*i)).unwrap_or(0);
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    }
}
