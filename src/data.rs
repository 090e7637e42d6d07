//! Widget data provider — fetches a widget's remote dataset and tracks
//! `{data, loading, error}` for its renderer.
//!
//! DESIGN
//! ======
//! A request with no URL resolves to a fixed mock dataset (five months of
//! "Sales"), which is what charts show out of the box. Otherwise the request
//! goes out through one shared `reqwest::Client`; the JSON response is run
//! through the optional transform and published.
//!
//! [`WidgetData`] owns a background task per widget. The task fetches once
//! on start and then on every refresh tick or [`WidgetData::refetch`]. The
//! task is aborted when the handle is dropped or its request is replaced,
//! so a stale poller can never overwrite newer state.
//!
//! ERROR HANDLING
//! ==============
//! Fetch failures never escape the task: they land in `DataState::error`
//! as display text (`"HTTP error! status: 404"`) and the previous `data`
//! is kept.

#[cfg(test)]
#[path = "data_test.rs"]
mod data_test;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::runtime::Handle;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("http client build failed: {0}")]
    HttpClientBuild(String),
    #[error("HTTP error! status: {0}")]
    Status(u16),
    #[error("{0}")]
    Request(String),
    #[error("response is not JSON: {0}")]
    Decode(String),
    #[error("no async runtime to poll on")]
    NoRuntime,
}

// =============================================================================
// REQUEST / STATE
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl From<HttpMethod> for reqwest::Method {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => Self::GET,
            HttpMethod::Post => Self::POST,
            HttpMethod::Put => Self::PUT,
            HttpMethod::Delete => Self::DELETE,
        }
    }
}

/// Post-processing applied to a successful response body.
pub type Transform = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Where a widget's data comes from.
#[derive(Clone, Default)]
pub struct DataRequest {
    /// `None` selects the mock dataset.
    pub url: Option<String>,
    pub method: HttpMethod,
    /// Replaces the default `Content-Type: application/json` header when set.
    pub headers: Option<BTreeMap<String, String>>,
    pub body: Option<Value>,
    pub refresh_interval: Option<Duration>,
    pub transform: Option<Transform>,
}

impl std::fmt::Debug for DataRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataRequest")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("refresh_interval", &self.refresh_interval)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

impl DataRequest {
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self { url: Some(url.into()), ..Self::default() }
    }

    #[must_use]
    pub fn every(mut self, interval: Duration) -> Self {
        self.refresh_interval = Some(interval);
        self
    }

    #[must_use]
    pub fn with_transform(mut self, f: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        self.transform = Some(Arc::new(f));
        self
    }
}

/// What a renderer sees for one widget.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataState {
    pub data: Option<Value>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Dataset used when a widget has no URL.
#[must_use]
pub fn mock_dataset() -> Value {
    json!({
        "labels": ["Jan", "Feb", "Mar", "Apr", "May"],
        "datasets": [{
            "label": "Sales",
            "data": [12, 19, 3, 5, 2],
            "backgroundColor": "rgba(75, 192, 192, 0.2)",
            "borderColor": "rgba(75, 192, 192, 1)",
        }],
    })
}

// =============================================================================
// PROVIDER
// =============================================================================

/// Shared HTTP client for all widget data requests.
#[derive(Debug, Clone)]
pub struct DataProvider {
    http: reqwest::Client,
}

impl DataProvider {
    /// # Errors
    ///
    /// Returns `DataError::HttpClientBuild` if the TLS backend fails to load.
    pub fn new(timeout: Duration) -> Result<Self, DataError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| DataError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http })
    }

    /// Resolve `request` once.
    ///
    /// # Errors
    ///
    /// Returns `DataError::Status` for a non-2xx response, `Request` for
    /// transport failures, and `Decode` for a non-JSON body.
    pub async fn fetch(&self, request: &DataRequest) -> Result<Value, DataError> {
        let Some(url) = request.url.as_deref() else {
            return Ok(mock_dataset());
        };

        let mut builder = self.http.request(request.method.into(), url);
        match &request.headers {
            Some(headers) => {
                for (name, value) in headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
            }
            None => builder = builder.header(reqwest::header::CONTENT_TYPE, "application/json"),
        }
        if let Some(body) = &request.body {
            builder = builder.body(serde_json::to_vec(body).map_err(|e| DataError::Request(e.to_string()))?);
        }

        let response = builder.send().await.map_err(|e| DataError::Request(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(DataError::Status(status.as_u16()));
        }
        let text = response.text().await.map_err(|e| DataError::Request(e.to_string()))?;
        let value: Value = serde_json::from_str(&text).map_err(|e| DataError::Decode(e.to_string()))?;
        Ok(match &request.transform {
            Some(transform) => transform(value),
            None => value,
        })
    }

    /// Start tracking data for `widget_id`. Fetches immediately.
    ///
    /// # Errors
    ///
    /// Returns `DataError::NoRuntime` when called outside a tokio runtime.
    pub fn watch(&self, widget_id: &str, request: DataRequest) -> Result<WidgetData, DataError> {
        let runtime = Handle::try_current().map_err(|_| DataError::NoRuntime)?;
        let (state, _) = watch::channel(DataState::default());
        let mut handle = WidgetData {
            widget_id: widget_id.to_owned(),
            provider: self.clone(),
            runtime,
            state: Arc::new(state),
            refetch: Arc::new(Notify::new()),
            request,
            task: None,
        };
        handle.spawn();
        Ok(handle)
    }

    async fn fetch_into(&self, widget_id: &str, request: &DataRequest, state: &watch::Sender<DataState>) {
        if request.url.is_none() {
            state.send_modify(|s| {
                s.data = Some(mock_dataset());
                s.error = None;
            });
            return;
        }
        state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });
        match self.fetch(request).await {
            Ok(data) => {
                debug!(widget_id, "widget data fetched");
                state.send_modify(|s| {
                    s.data = Some(data);
                    s.loading = false;
                });
            }
            Err(e) => {
                warn!(widget_id, error = %e, "widget data fetch failed");
                state.send_modify(|s| {
                    s.error = Some(e.to_string());
                    s.loading = false;
                });
            }
        }
    }
}

// =============================================================================
// WIDGET HANDLE
// =============================================================================

/// Live data for one widget. Dropping the handle stops polling.
pub struct WidgetData {
    widget_id: String,
    provider: DataProvider,
    runtime: Handle,
    state: Arc<watch::Sender<DataState>>,
    refetch: Arc<Notify>,
    request: DataRequest,
    task: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for WidgetData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WidgetData")
            .field("widget_id", &self.widget_id)
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

impl WidgetData {
    #[must_use]
    pub fn widget_id(&self) -> &str {
        &self.widget_id
    }

    #[must_use]
    pub fn request(&self) -> &DataRequest {
        &self.request
    }

    /// Latest state.
    #[must_use]
    pub fn state(&self) -> DataState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DataState> {
        self.state.subscribe()
    }

    /// Fetch again now, outside the refresh schedule.
    pub fn refetch(&self) {
        self.refetch.notify_one();
    }

    /// Replace the request. The old poller is stopped before the new one starts.
    pub fn set_request(&mut self, request: DataRequest) {
        self.stop();
        self.request = request;
        info!(widget_id = %self.widget_id, url = ?self.request.url, "widget data source changed");
        self.spawn();
    }

    fn spawn(&mut self) {
        let provider = self.provider.clone();
        let widget_id = self.widget_id.clone();
        let request = self.request.clone();
        let state = self.state.clone();
        let refetch = self.refetch.clone();
        self.task = Some(self.runtime.spawn(async move {
            provider.fetch_into(&widget_id, &request, &state).await;
            match request.refresh_interval.filter(|d| !d.is_zero()) {
                Some(period) => {
                    let mut ticker = tokio::time::interval(period);
                    ticker.tick().await;
                    loop {
                        tokio::select! {
                            _ = ticker.tick() => {}
                            () = refetch.notified() => {}
                        }
                        provider.fetch_into(&widget_id, &request, &state).await;
                    }
                }
                None => loop {
                    refetch.notified().await;
                    provider.fetch_into(&widget_id, &request, &state).await;
                },
            }
        }));
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for WidgetData {
    fn drop(&mut self) {
        self.stop();
    }
}
