//! Weather fetcher: one request per input change, observable through a watch channel.

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    error::FetchError,
    model::{Coordinates, FetchState, FetchStatus},
    provider::{WeatherQuery, WeatherSource},
    transform::transform,
};

#[derive(Debug)]
pub struct WeatherFetcher {
    source: Arc<dyn WeatherSource>,
    api_key: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    state: Arc<watch::Sender<FetchState>>,
    inflight: Option<CancellationToken>,
}

impl WeatherFetcher {
    pub fn new(source: Arc<dyn WeatherSource>, api_key: Option<String>) -> Self {
        let (state, _) = watch::channel(FetchState::idle());

        Self {
            source,
            api_key,
            latitude: None,
            longitude: None,
            state: Arc::new(state),
            inflight: None,
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> FetchState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FetchState> {
        self.state.subscribe()
    }

    /// Wait until no request is pending and return the state at that point.
    pub async fn settled(&self) -> FetchState {
        let mut rx = self.subscribe();
        match rx.wait_for(|s| s.status != FetchStatus::Pending).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }

    /// Update the coordinates. Must be called inside a Tokio runtime.
    pub fn set_coordinates(&mut self, latitude: Option<f64>, longitude: Option<f64>) {
        if self.latitude == latitude && self.longitude == longitude {
            return;
        }

        self.latitude = latitude;
        self.longitude = longitude;
        self.trigger();
    }

    /// Update the API key. Must be called inside a Tokio runtime.
    pub fn set_api_key(&mut self, api_key: Option<String>) {
        if self.api_key == api_key {
            return;
        }

        self.api_key = api_key;
        self.trigger();
    }

    fn query(&self) -> Option<WeatherQuery> {
        let usable = |v: Option<f64>| v.filter(|v| v.is_finite() && *v != 0.0);

        let latitude = usable(self.latitude)?;
        let longitude = usable(self.longitude)?;
        let api_key = self.api_key.as_deref().filter(|k| !k.trim().is_empty())?;

        Some(WeatherQuery {
            coords: Coordinates::new(latitude, longitude),
            api_key: api_key.to_string(),
        })
    }

    fn trigger(&mut self) {
        // incomplete inputs leave the current state and any in-flight request alone
        let Some(query) = self.query() else {
            debug!("fetch inputs incomplete; not requesting");
            return;
        };

        // cancel before publishing the next state so a superseded request cannot write
        if let Some(token) = self.inflight.take() {
            token.cancel();
        }

        self.state.send_replace(FetchState::pending());
        info!(lat = query.coords.latitude, lon = query.coords.longitude, "weather fetch started");

        let token = CancellationToken::new();
        self.inflight = Some(token.clone());

        let source = Arc::clone(&self.source);
        let state = Arc::clone(&self.state);

        tokio::spawn(async move {
            // the request runs in its own task so a panicking source still settles the state
            let mut request = tokio::spawn(async move { source.current(&query).await });

            let outcome = tokio::select! {
                _ = token.cancelled() => {
                    request.abort();
                    debug!("superseded weather fetch cancelled");
                    return;
                }
                joined = &mut request => joined.unwrap_or_else(|err| {
                    warn!(error = %err, "weather request task failed");
                    Err(FetchError::Server(None))
                }),
            };

            let next = match outcome.and_then(|raw| transform(&raw).map_err(FetchError::from)) {
                Ok(data) => {
                    info!("weather fetch resolved");
                    FetchState::resolved(data)
                }
                Err(err) => {
                    let message = err.message();
                    warn!(error = %message, "weather fetch rejected");
                    FetchState::rejected(message)
                }
            };

            state.send_if_modified(|current| {
                if token.is_cancelled() {
                    return false;
                }
                *current = next;
                true
            });
        });
    }
}

impl Drop for WeatherFetcher {
    fn drop(&mut self) {
        if let Some(token) = self.inflight.take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{RawCondition, RawWeather};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    #[derive(Debug, Clone, Copy)]
    enum Reply {
        Weather,
        NoConditions,
        Unauthorized,
        Silent,
        Panic,
    }

    #[derive(Debug)]
    struct StubSource {
        reply: Reply,
        calls: AtomicUsize,
        blocked_latitude: Option<f64>,
        release: Notify,
    }

    impl StubSource {
        fn new(reply: Reply) -> Self {
            Self {
                reply,
                calls: AtomicUsize::new(0),
                blocked_latitude: None,
                release: Notify::new(),
            }
        }

        fn blocking_at(latitude: f64) -> Self {
            Self {
                blocked_latitude: Some(latitude),
                ..Self::new(Reply::Weather)
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl WeatherSource for StubSource {
        async fn current(&self, query: &WeatherQuery) -> Result<RawWeather, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if self.blocked_latitude == Some(query.coords.latitude) {
                self.release.notified().await;
            }

            let conditions = vec![RawCondition {
                description: format!("at {}", query.coords.latitude),
                icon: "10d".into(),
            }];

            match self.reply {
                Reply::Weather => Ok(RawWeather {
                    dt: 1_700_000_000,
                    temp: 20.1,
                    humidity: 40.0,
                    clouds: 0.0,
                    wind_speed: 2.5,
                    weather: conditions,
                }),
                Reply::NoConditions => Ok(RawWeather {
                    dt: 1_700_000_000,
                    temp: 20.1,
                    humidity: 40.0,
                    clouds: 0.0,
                    wind_speed: 2.5,
                    weather: Vec::new(),
                }),
                Reply::Unauthorized => Err(FetchError::Status {
                    status: 401,
                    message: "Invalid API key".into(),
                }),
                Reply::Silent => Err(FetchError::Server(None)),
                Reply::Panic => panic!("weather backend exploded"),
            }
        }
    }

    fn fetcher(source: &Arc<StubSource>, key: Option<&str>) -> WeatherFetcher {
        let source: Arc<dyn WeatherSource> = source.clone();
        WeatherFetcher::new(source, key.map(str::to_string))
    }

    #[tokio::test]
    async fn stays_idle_without_both_coordinates() {
        let source = Arc::new(StubSource::new(Reply::Weather));
        let mut f = fetcher(&source, Some("KEY"));

        f.set_coordinates(None, Some(4.3));
        assert_eq!(f.state(), FetchState::idle());

        f.set_coordinates(Some(52.1), None);
        assert_eq!(f.state().status, FetchStatus::Idle);
        assert_eq!(f.settled().await.status, FetchStatus::Idle);
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn stays_idle_without_api_key() {
        let source = Arc::new(StubSource::new(Reply::Weather));
        let mut f = fetcher(&source, None);

        f.set_coordinates(Some(52.1), Some(4.3));
        assert_eq!(f.state().status, FetchStatus::Idle);

        f.set_api_key(Some("  ".into()));
        assert_eq!(f.state().status, FetchStatus::Idle);
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn zero_coordinates_do_not_activate() {
        let source = Arc::new(StubSource::new(Reply::Weather));
        let mut f = fetcher(&source, Some("KEY"));

        f.set_coordinates(Some(0.0), Some(4.3));
        assert_eq!(f.state().status, FetchStatus::Idle);
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn pending_then_resolved() {
        let source = Arc::new(StubSource::new(Reply::Weather));
        let mut f = fetcher(&source, Some("KEY"));

        f.set_coordinates(Some(52.1), Some(4.3));
        assert_eq!(f.state(), FetchState::pending());

        let state = f.settled().await;
        assert_eq!(state.status, FetchStatus::Resolved);
        assert!(state.error.is_none());

        let data = state.data.expect("resolved state carries data");
        assert_eq!(data.temperature, "21°C");
        assert_eq!(data.description, "at 52.1");
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn unchanged_inputs_do_not_refetch() {
        let source = Arc::new(StubSource::new(Reply::Weather));
        let mut f = fetcher(&source, Some("KEY"));

        f.set_coordinates(Some(52.1), Some(4.3));
        f.settled().await;
        f.set_coordinates(Some(52.1), Some(4.3));
        f.set_api_key(Some("KEY".into()));

        assert_eq!(f.state().status, FetchStatus::Resolved);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn api_key_change_refetches() {
        let source = Arc::new(StubSource::new(Reply::Weather));
        let mut f = fetcher(&source, Some("OLD"));

        f.set_coordinates(Some(52.1), Some(4.3));
        f.settled().await;

        f.set_api_key(Some("NEW".into()));
        assert_eq!(f.state(), FetchState::pending());
        assert_eq!(f.settled().await.status, FetchStatus::Resolved);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn losing_inputs_keeps_previous_state() {
        let source = Arc::new(StubSource::new(Reply::Weather));
        let mut f = fetcher(&source, Some("KEY"));

        f.set_coordinates(Some(52.1), Some(4.3));
        let resolved = f.settled().await;

        f.set_api_key(None);
        assert_eq!(f.state(), resolved);

        f.set_coordinates(None, Some(4.3));
        assert_eq!(f.state().status, FetchStatus::Resolved);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn losing_inputs_does_not_cancel_inflight_request() {
        let source = Arc::new(StubSource::new(Reply::Weather));
        let mut f = fetcher(&source, Some("KEY"));

        f.set_coordinates(Some(52.1), Some(4.3));
        f.set_api_key(None);
        assert_eq!(f.state().status, FetchStatus::Pending);

        let state = f.settled().await;
        assert_eq!(state.status, FetchStatus::Resolved);
    }

    #[tokio::test]
    async fn panicking_source_rejects_with_fallback_message() {
        let source = Arc::new(StubSource::new(Reply::Panic));
        let mut f = fetcher(&source, Some("KEY"));

        f.set_coordinates(Some(52.1), Some(4.3));
        let state = tokio::time::timeout(std::time::Duration::from_secs(2), f.settled())
            .await
            .expect("fetch must settle after a panic");

        assert_eq!(state.status, FetchStatus::Rejected);
        assert!(state.data.is_none());
        assert_eq!(state.error.as_deref(), Some("Internal server error"));
    }

    #[tokio::test]
    async fn source_error_is_stored_as_message() {
        let source = Arc::new(StubSource::new(Reply::Unauthorized));
        let mut f = fetcher(&source, Some("KEY"));

        f.set_coordinates(Some(52.1), Some(4.3));
        let state = f.settled().await;

        assert_eq!(state.status, FetchStatus::Rejected);
        assert!(state.data.is_none());
        assert_eq!(
            state.error.as_deref(),
            Some("Weather request failed with status 401: Invalid API key")
        );
    }

    #[tokio::test]
    async fn error_without_message_falls_back() {
        let source = Arc::new(StubSource::new(Reply::Silent));
        let mut f = fetcher(&source, Some("KEY"));

        f.set_coordinates(Some(52.1), Some(4.3));
        assert_eq!(f.settled().await.error.as_deref(), Some("Internal server error"));
    }

    #[tokio::test]
    async fn transform_failure_rejects() {
        let source = Arc::new(StubSource::new(Reply::NoConditions));
        let mut f = fetcher(&source, Some("KEY"));

        f.set_coordinates(Some(52.1), Some(4.3));
        let state = f.settled().await;

        assert_eq!(state.status, FetchStatus::Rejected);
        assert_eq!(
            state.error.as_deref(),
            Some("Weather response contained no condition entries")
        );
    }

    #[tokio::test]
    async fn superseded_fetch_never_overwrites_newer_state() {
        let source = Arc::new(StubSource::blocking_at(1.0));
        let mut f = fetcher(&source, Some("KEY"));

        f.set_coordinates(Some(1.0), Some(1.0));
        tokio::task::yield_now().await;
        f.set_coordinates(Some(2.0), Some(2.0));

        let state = f.settled().await;
        assert_eq!(state.data.as_ref().map(|d| d.description.as_str()), Some("at 2"));

        source.release.notify_waiters();
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }

        assert_eq!(f.state(), state);
    }

    #[tokio::test]
    async fn subscribers_observe_transitions() {
        let source = Arc::new(StubSource::new(Reply::Weather));
        let mut f = fetcher(&source, Some("KEY"));
        let mut rx = f.subscribe();

        f.set_coordinates(Some(52.1), Some(4.3));
        assert_eq!(rx.borrow_and_update().status, FetchStatus::Pending);

        let resolved = rx.wait_for(|s| s.status.is_settled()).await.unwrap().clone();
        assert_eq!(resolved.status, FetchStatus::Resolved);
    }
}
