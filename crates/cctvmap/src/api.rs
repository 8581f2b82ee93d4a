use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Deserialize;
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::device::Device;
use crate::geo;
use crate::geo::LatLng;
use crate::session::SessionReport;

/// Response for the /v1/ping endpoint
#[derive(Serialize)]
struct PingResponse {
    status: String,
}

/// Response for the /v1/info endpoint
#[derive(Serialize)]
struct InfoResponse {
    version: String,
    hostname: String,
}

/// Response for the /v1/devices/nearest endpoint
#[derive(Serialize)]
struct NearestResponse<'a> {
    device: &'a Device,
    distance_m: f64,
}

#[derive(Debug, Deserialize)]
struct NearestQuery {
    lat: f64,
    lng: f64,
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    version: &'static str,
    report: Arc<SessionReport>,
}

/// Handler for GET /v1/ping
#[tracing::instrument]
async fn ping() -> impl IntoResponse {
    tracing::debug!("Handling /v1/ping request");
    (
        StatusCode::OK,
        Json(PingResponse {
            status: "ok".to_string(),
        }),
    )
}

/// Handler for GET /v1/info
#[tracing::instrument(skip(state))]
async fn info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    tracing::debug!("Handling /v1/info request");

    let hostname = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());

    (
        StatusCode::OK,
        Json(InfoResponse {
            version: state.version.to_string(),
            hostname,
        }),
    )
}

/// Handler for GET /v1/map
#[tracing::instrument(skip(state))]
async fn map(State(state): State<Arc<AppState>>) -> Response {
    tracing::debug!("Handling /v1/map request");
    Json(&state.report.map).into_response()
}

/// Handler for GET /v1/devices/summary
#[tracing::instrument(skip(state))]
async fn summary(State(state): State<Arc<AppState>>) -> Response {
    tracing::debug!("Handling /v1/devices/summary request");
    match &state.report.summary {
        Some(summary) => Json(summary).into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "device feed unavailable").into_response(),
    }
}

/// Handler for GET /v1/devices/nearest
#[tracing::instrument(skip(state))]
async fn nearest(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NearestQuery>,
) -> Response {
    let Some(point) = LatLng::checked(query.lat, query.lng) else {
        return (StatusCode::BAD_REQUEST, "invalid position").into_response();
    };

    match geo::nearest(&state.report.devices, point) {
        Some((device, distance_m)) => Json(NearestResponse { device, distance_m }).into_response(),
        None => (StatusCode::NOT_FOUND, "no placed devices").into_response(),
    }
}

/// Create the API router with all endpoints
fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/ping", get(ping))
        .route("/v1/info", get(info))
        .route("/v1/map", get(map))
        .route("/v1/devices/summary", get(summary))
        .route("/v1/devices/nearest", get(nearest))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP API server
///
/// Serves a read-only view of a finished session until `shutdown_rx` fires.
///
/// # Arguments
/// * `listen` - The IP address to listen on (e.g., "127.0.0.1")
/// * `port` - The port to listen on (e.g., 8565)
/// * `report` - The session to expose
/// * `shutdown_rx` - A oneshot receiver that will trigger graceful shutdown
pub async fn serve(
    listen: &str,
    port: u16,
    report: Arc<SessionReport>,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> Result<(), Box<dyn std::error::Error>> {
    let version = env!("CARGO_PKG_VERSION");

    let state = Arc::new(AppState { version, report });
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", listen, port).parse()?;
    tracing::info!("Starting HTTP API server on {}", addr);

    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_rx.await.ok();
            tracing::info!("HTTP API server shutting down gracefully");
        })
        .await?;

    Ok(())
}

/// Serve `router` on an ephemeral local port, returning its base URL.
#[cfg(all(test, any(feature = "feed_http", feature = "locator_http")))]
pub(crate) async fn spawn_local(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://{}", addr)
}
