//! REST API endpoints for knowair-service.
//!
//! # Concurrency and Lock Acquisition
//!
//! - **`state.store`** (Mutex): held for each database operation. Ingestion
//!   holds it across classification and insert.
//! - **`state.config`** (RwLock): read lock when building a classifier or
//!   returning settings, write lock for `PUT /api/config/alerts`.
//!
//! When both are needed, `config` is taken (and released) before `store`.
//!
//! ## Error Handling
//!
//! All endpoints return structured JSON errors via [`AppError`]. Duplicate
//! readings map to HTTP 409, other store errors to HTTP 500.
//!
//! # Example
//!
//! ```ignore
//! use axum::Router;
//! use knowair_service::api;
//!
//! let app = api::router().with_state(state);
//! ```

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use knowair_store::{ReadingQuery, StoredDevice, StoredReading};
use knowair_types::{Status, Violation};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::config::{AlertsConfig, ConfigError};
use crate::ingest::{IngestRequest, ingest};
use crate::state::AppState;

/// Default page size for reading history.
pub const DEFAULT_READINGS_LIMIT: u32 = 500;
/// Largest page size a client may request.
pub const MAX_READINGS_LIMIT: u32 = 5000;

/// Create the API router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health", get(health))
        // Ingestion
        .route("/api/ingest", post(ingest_reading))
        // Configuration
        .route(
            "/api/config/alerts",
            get(get_alert_config).put(update_alert_config),
        )
        // Data endpoints
        .route("/api/devices", get(list_devices))
        .route("/api/devices/{id}", get(get_device))
        .route("/api/devices/{id}/latest", get(get_latest_reading))
        .route("/api/devices/{id}/readings", get(get_readings))
        .route("/api/devices/{id}/alerts/latest", get(get_latest_alert))
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Health check endpoint.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: OffsetDateTime::now_utc(),
    })
}

/// Ingest one reading.
///
/// The reading is classified against the device's stored history and
/// returned as stored, with `201 Created`.
///
/// # Errors
///
/// - [`AppError::BadRequest`] if `device_id` is empty
/// - [`AppError::Conflict`] if a reading with the same device and timestamp
///   already exists
/// - [`AppError::Store`] if history lookup or persistence fails
async fn ingest_reading(
    State(state): State<Arc<AppState>>,
    Json(request): Json<IngestRequest>,
) -> Result<(StatusCode, Json<StoredReading>), AppError> {
    if request.device_id.trim().is_empty() {
        return Err(AppError::BadRequest("device_id cannot be empty".to_string()));
    }

    let reading = request.into_reading(OffsetDateTime::now_utc());
    let stored = ingest(&state, reading).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

/// Current alert settings.
async fn get_alert_config(State(state): State<Arc<AppState>>) -> Json<AlertsConfig> {
    Json(state.config.read().await.alerts.clone())
}

/// Replace the alert settings.
///
/// Fields missing from the body take their defaults. The next ingested
/// reading is classified with the new settings.
///
/// # Errors
///
/// Returns [`AppError::BadRequest`] if the settings fail validation; the
/// running settings are left unchanged.
async fn update_alert_config(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AlertsConfig>,
) -> Result<Json<AlertsConfig>, AppError> {
    let errors = request.validate();
    if !errors.is_empty() {
        return Err(AppError::BadRequest(
            ConfigError::Validation(errors).to_string(),
        ));
    }

    let mut config = state.config.write().await;
    config.alerts = request;
    tracing::info!(mode = %config.alerts.mode, "Alert settings updated");
    Ok(Json(config.alerts.clone()))
}

/// Device response.
#[derive(Debug, Serialize)]
pub struct DeviceResponse {
    pub id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub first_seen: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_seen: OffsetDateTime,
}

impl From<StoredDevice> for DeviceResponse {
    fn from(d: StoredDevice) -> Self {
        Self {
            id: d.id,
            first_seen: d.first_seen,
            last_seen: d.last_seen,
        }
    }
}

/// List all devices, most recently seen first.
async fn list_devices(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DeviceResponse>>, AppError> {
    let store = state.store.lock().await;
    let devices = store.list_devices()?;
    Ok(Json(devices.into_iter().map(Into::into).collect()))
}

/// Get a single device.
async fn get_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeviceResponse>, AppError> {
    let store = state.store.lock().await;
    let device = store
        .get_device(&id)?
        .ok_or(AppError::NotFound(format!("Device not found: {}", id)))?;
    Ok(Json(device.into()))
}

/// Get the latest reading for a device.
async fn get_latest_reading(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<StoredReading>, AppError> {
    let store = state.store.lock().await;
    let reading = store
        .get_latest_reading(&id)?
        .ok_or(AppError::NotFound(format!(
            "No readings for device: {}",
            id
        )))?;
    Ok(Json(reading))
}

/// The alert fields of a stored reading.
#[derive(Debug, Serialize)]
pub struct AlertResponse {
    pub device_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub ts: OffsetDateTime,
    pub status: Option<Status>,
    pub score: Option<f64>,
    pub delta_alert: bool,
    pub violations: Vec<Violation>,
    pub tvoc_ppb: Option<f64>,
    pub eco2_ppm: Option<f64>,
}

impl From<StoredReading> for AlertResponse {
    fn from(r: StoredReading) -> Self {
        Self {
            device_id: r.device_id,
            ts: r.captured_at,
            status: r.status,
            score: r.score,
            delta_alert: r.delta_alert,
            violations: r.violations,
            tvoc_ppb: r.tvoc_ppb,
            eco2_ppm: r.eco2_ppm,
        }
    }
}

/// Alert projection of the device's latest reading.
async fn get_latest_alert(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<AlertResponse>, AppError> {
    let store = state.store.lock().await;
    let reading = store
        .get_latest_reading(&id)?
        .ok_or(AppError::NotFound(format!(
            "No readings for device: {}",
            id
        )))?;
    Ok(Json(reading.into()))
}

/// Query parameters for readings.
#[derive(Debug, Deserialize, Default)]
pub struct ReadingsQuery {
    /// Unix timestamp in seconds, inclusive.
    pub since: Option<i64>,
    /// Unix timestamp in seconds, inclusive.
    pub until: Option<i64>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ReadingsQuery {
    /// Validate the query parameters.
    /// Returns an error if `since > until` or `limit` is zero.
    pub fn validate(&self) -> Result<(), AppError> {
        if let (Some(since), Some(until)) = (self.since, self.until)
            && since > until
        {
            return Err(AppError::BadRequest(format!(
                "Invalid time range: 'since' ({}) must be less than or equal to 'until' ({})",
                since, until
            )));
        }
        if self.limit == Some(0) {
            return Err(AppError::BadRequest(
                "Invalid limit: must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Requested page size, defaulted and capped.
    pub fn effective_limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_READINGS_LIMIT)
            .min(MAX_READINGS_LIMIT)
    }
}

fn unix_timestamp(param: &str, secs: i64) -> Result<OffsetDateTime, AppError> {
    OffsetDateTime::from_unix_timestamp(secs).map_err(|_| {
        AppError::BadRequest(format!(
            "Invalid '{}': {} is not a representable Unix timestamp",
            param, secs
        ))
    })
}

/// Paginated response wrapper with metadata.
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    /// The data items.
    pub data: Vec<T>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}

/// Pagination metadata.
#[derive(Debug, Serialize)]
pub struct PaginationMeta {
    /// Number of items returned.
    pub count: usize,
    /// Offset from the beginning.
    pub offset: u32,
    /// Page size applied.
    pub limit: u32,
    /// Whether there are more items available.
    pub has_more: bool,
}

/// Get readings for a device, oldest first.
///
/// # Query Parameters
///
/// - `since`: Unix timestamp to filter readings from (inclusive)
/// - `until`: Unix timestamp to filter readings until (inclusive)
/// - `limit`: Page size, default 500, at most 5000
/// - `offset`: Number of readings to skip
///
/// # Errors
///
/// - Returns [`AppError::BadRequest`] if `since > until`, either bound is out
///   of the representable range, or `limit` is 0
/// - Returns [`AppError::Store`] if the database query fails
async fn get_readings(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<ReadingsQuery>,
) -> Result<Json<PaginatedResponse<StoredReading>>, AppError> {
    params.validate()?;

    let mut query = ReadingQuery::new().device(&id).oldest_first();

    if let Some(since) = params.since {
        query = query.since(unix_timestamp("since", since)?);
    }
    if let Some(until) = params.until {
        query = query.until(unix_timestamp("until", until)?);
    }

    let limit = params.effective_limit();
    // Request one extra item to determine if there are more
    query = query.limit(limit + 1);
    if let Some(offset) = params.offset {
        query = query.offset(offset);
    }

    let store = state.store.lock().await;
    let mut readings = store.query_readings(&query)?;

    let has_more = readings.len() > limit as usize;
    if has_more {
        readings.pop();
    }

    Ok(Json(PaginatedResponse {
        pagination: PaginationMeta {
            count: readings.len(),
            offset: params.offset.unwrap_or(0),
            limit,
            has_more,
        },
        data: readings,
    }))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Store(knowair_store::Error),
}

impl From<knowair_store::Error> for AppError {
    fn from(e: knowair_store::Error) -> Self {
        match e {
            knowair_store::Error::DuplicateReading { .. } => AppError::Conflict(e.to_string()),
            e => AppError::Store(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Store(e) => {
                tracing::error!(retryable = e.is_retryable(), "Store error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use knowair_core::AlertMode;
    use knowair_types::Reading;
    use time::macros::datetime;
    use tower::ServiceExt;

    use crate::config::Config;

    fn create_test_state() -> Arc<AppState> {
        let store = knowair_store::Store::open_in_memory().unwrap();
        let config = Config::default();
        AppState::new(store, config)
    }

    fn range_state() -> Arc<AppState> {
        let mut config = Config::default();
        config.alerts.mode = AlertMode::Range;
        AppState::new(knowair_store::Store::open_in_memory().unwrap(), config)
    }

    async fn response_body(response: axum::response::Response) -> String {
        let body = response.into_body();
        let bytes = body.collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn response_json(response: axum::response::Response) -> serde_json::Value {
        serde_json::from_str(&response_body(response).await).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap()
    }

    /// Seed readings for `device` one minute apart starting at 10:00 UTC.
    async fn seed(state: &AppState, device: &str, eco2: &[f64]) {
        let start = datetime!(2025-03-01 10:00 UTC);
        let classifier = state.config.read().await.alerts.classifier();
        let store = state.store.lock().await;
        for (i, value) in eco2.iter().enumerate() {
            let reading = Reading::new(device, start + time::Duration::minutes(i as i64))
                .with_eco2(*value)
                .with_tvoc(40.0);
            store.ingest(&reading, &classifier).unwrap();
        }
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = router().with_state(create_test_state());

        let response = app.oneshot(get("/api/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert_eq!(json["status"], "ok");
        assert!(json["version"].is_string());
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_ingest_endpoint_classifies() {
        let state = range_state();
        let app = router().with_state(Arc::clone(&state));

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/ingest",
                serde_json::json!({
                    "device_id": "node-1",
                    "ts": "2025-03-01T10:00:00Z",
                    "eco2_ppm": 700,
                    "tvoc_ppb": 40,
                    "hum_rh": 38.5
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let json = response_json(response).await;
        assert_eq!(json["device_id"], "node-1");
        assert_eq!(json["status"], "HIGH");
        assert_eq!(json["violations"], serde_json::json!(["eco2_out_of_range"]));
        assert_eq!(json["humidity_rh"], 38.5);
        assert_eq!(json["delta_alert"], false);

        let store = state.store.lock().await;
        assert_eq!(store.count_readings(Some("node-1")).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ingest_without_timestamp_uses_now() {
        let state = create_test_state();
        let before = OffsetDateTime::now_utc() - time::Duration::seconds(1);

        let response = router()
            .with_state(Arc::clone(&state))
            .oneshot(json_request(
                "POST",
                "/api/ingest",
                serde_json::json!({"device_id": "node-1", "eco2_ppm": 450}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let latest = state
            .store
            .lock()
            .await
            .get_latest_reading("node-1")
            .unwrap()
            .unwrap();
        assert!(latest.captured_at >= before);
        assert_eq!(latest.status, Some(Status::Ok));
    }

    #[tokio::test]
    async fn test_ingest_duplicate_conflict() {
        let state = create_test_state();
        let body = serde_json::json!({
            "device_id": "node-1",
            "ts": "2025-03-01T10:00:00Z",
            "eco2_ppm": 450
        });

        let first = router()
            .with_state(Arc::clone(&state))
            .oneshot(json_request("POST", "/api/ingest", body.clone()))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = router()
            .with_state(state)
            .oneshot(json_request("POST", "/api/ingest", body))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);
        let json = response_json(second).await;
        assert!(json["error"].as_str().unwrap().contains("Duplicate"));
    }

    #[tokio::test]
    async fn test_ingest_empty_device_id() {
        let response = router()
            .with_state(create_test_state())
            .oneshot(json_request(
                "POST",
                "/api/ingest",
                serde_json::json!({"device_id": "  ", "eco2_ppm": 450}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_devices_empty() {
        let response = router()
            .with_state(create_test_state())
            .oneshot(get("/api/devices"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert!(json.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_device_after_ingest() {
        let state = create_test_state();
        seed(&state, "node-1", &[450.0]).await;

        let response = router()
            .with_state(state)
            .oneshot(get("/api/devices/node-1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["id"], "node-1");
        assert!(json["first_seen"].is_string());
    }

    #[tokio::test]
    async fn test_get_device_not_found() {
        let response = router()
            .with_state(create_test_state())
            .oneshot(get("/api/devices/nonexistent"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = response_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn test_get_latest_reading() {
        let state = create_test_state();
        seed(&state, "node-1", &[450.0, 460.0, 470.0]).await;

        let response = router()
            .with_state(state)
            .oneshot(get("/api/devices/node-1/latest"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["eco2_ppm"], 470.0);
    }

    #[tokio::test]
    async fn test_get_latest_reading_not_found() {
        let response = router()
            .with_state(create_test_state())
            .oneshot(get("/api/devices/test-device/latest"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_latest_alert_projection() {
        let state = range_state();
        seed(&state, "node-1", &[450.0, 700.0]).await;

        let response = router()
            .with_state(state)
            .oneshot(get("/api/devices/node-1/alerts/latest"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert_eq!(json["device_id"], "node-1");
        assert_eq!(json["ts"], "2025-03-01T10:01:00Z");
        assert_eq!(json["status"], "HIGH");
        assert_eq!(json["delta_alert"], true);
        assert_eq!(
            json["violations"],
            serde_json::json!(["sudden_change_detected"])
        );
        assert_eq!(json["score"], serde_json::Value::Null);
        assert_eq!(json["eco2_ppm"], 700.0);
        assert!(json.get("temp_c").is_none());
    }

    #[tokio::test]
    async fn test_get_readings_oldest_first_with_pagination() {
        let state = create_test_state();
        seed(&state, "node-1", &[400.0, 410.0, 420.0, 430.0, 440.0]).await;
        seed(&state, "node-2", &[900.0]).await;

        let response = router()
            .with_state(state)
            .oneshot(get("/api/devices/node-1/readings?limit=2&offset=1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        let data = json["data"].as_array().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0]["eco2_ppm"], 410.0);
        assert_eq!(data[1]["eco2_ppm"], 420.0);
        assert_eq!(json["pagination"]["count"], 2);
        assert_eq!(json["pagination"]["offset"], 1);
        assert_eq!(json["pagination"]["limit"], 2);
        assert_eq!(json["pagination"]["has_more"], true);
    }

    #[tokio::test]
    async fn test_get_readings_time_range() {
        let state = create_test_state();
        seed(&state, "node-1", &[400.0, 410.0, 420.0]).await;
        let since = datetime!(2025-03-01 10:01 UTC).unix_timestamp();

        let response = router()
            .with_state(state)
            .oneshot(get(&format!("/api/devices/node-1/readings?since={since}")))
            .await
            .unwrap();
        let json = response_json(response).await;
        assert_eq!(json["pagination"]["count"], 2);
        assert_eq!(json["pagination"]["limit"], DEFAULT_READINGS_LIMIT);
        assert_eq!(json["pagination"]["has_more"], false);
        assert_eq!(json["data"][0]["eco2_ppm"], 410.0);
    }

    #[tokio::test]
    async fn test_get_readings_invalid_range() {
        let response = router()
            .with_state(create_test_state())
            .oneshot(get("/api/devices/node-1/readings?since=200&until=100"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("Invalid time range"));
    }

    #[tokio::test]
    async fn test_get_readings_unrepresentable_bound() {
        let state = create_test_state();
        seed(&state, "node-1", &[400.0, 410.0]).await;

        for uri in [
            "/api/devices/node-1/readings?since=-9223372036854775808",
            "/api/devices/node-1/readings?until=9223372036854775807",
        ] {
            let response = router()
                .with_state(Arc::clone(&state))
                .oneshot(get(uri))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
            let json = response_json(response).await;
            assert!(
                json["error"]
                    .as_str()
                    .unwrap()
                    .contains("not a representable Unix timestamp")
            );
        }
    }

    #[test]
    fn test_readings_query_limit() {
        assert_eq!(ReadingsQuery::default().effective_limit(), 500);
        let big = ReadingsQuery {
            limit: Some(100_000),
            ..Default::default()
        };
        assert_eq!(big.effective_limit(), MAX_READINGS_LIMIT);
        let zero = ReadingsQuery {
            limit: Some(0),
            ..Default::default()
        };
        assert!(zero.validate().is_err());
    }

    #[tokio::test]
    async fn test_get_alert_config() {
        let response = router()
            .with_state(create_test_state())
            .oneshot(get("/api/config/alerts"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert_eq!(json["mode"], "trend");
        assert_eq!(json["warn_pct"], 35.0);
        assert_eq!(json["eco2"]["max"], 600.0);
        assert_eq!(json["delta"]["tvoc"], 15.0);
    }

    #[tokio::test]
    async fn test_update_alert_config_applies_to_next_reading() {
        let state = create_test_state();

        let response = router()
            .with_state(Arc::clone(&state))
            .oneshot(json_request(
                "PUT",
                "/api/config/alerts",
                serde_json::json!({
                    "mode": "range",
                    "eco2": {"min": 350.0, "max": 500.0, "hysteresis": 20.0}
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["mode"], "range");
        assert_eq!(json["eco2"]["max"], 500.0);
        assert_eq!(json["high_pct"], 80.0);

        let response = router()
            .with_state(state)
            .oneshot(json_request(
                "POST",
                "/api/ingest",
                serde_json::json!({
                    "device_id": "node-1",
                    "ts": "2025-03-01T10:00:00Z",
                    "eco2_ppm": 550
                }),
            ))
            .await
            .unwrap();
        let json = response_json(response).await;
        assert_eq!(json["status"], "HIGH");
    }

    #[tokio::test]
    async fn test_update_alert_config_rejects_invalid() {
        let state = create_test_state();

        let response = router()
            .with_state(Arc::clone(&state))
            .oneshot(json_request(
                "PUT",
                "/api/config/alerts",
                serde_json::json!({"warn_pct": 90.0, "high_pct": 80.0}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("alerts.warn_pct"));

        assert_eq!(state.config.read().await.alerts, AlertsConfig::default());
    }

    #[tokio::test]
    async fn test_update_alert_config_rejects_oversized_window() {
        let state = create_test_state();

        let response = router()
            .with_state(Arc::clone(&state))
            .oneshot(json_request(
                "PUT",
                "/api/config/alerts",
                serde_json::json!({"baseline_window_secs": 1_000_000_000_000u64}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert!(
            json["error"]
                .as_str()
                .unwrap()
                .contains("alerts.baseline_window_secs")
        );
    }
}
