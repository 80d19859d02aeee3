use crate::config::AppConfig;
use crate::dashboard::Dashboard;
use crate::data;
use crate::details::LibraryView;
use crate::scope::{CountryScoper, ScopeState};
use crate::stats::Stats;
use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::info;

pub struct AppState {
    pub dashboard: RwLock<Dashboard>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        AppState {
            dashboard: RwLock::new(Dashboard::default()),
            config,
        }
    }
}

#[derive(Deserialize)]
pub struct CountryParams {
    country: Option<String>,
}

#[derive(Deserialize)]
pub struct ClickParams {
    lat: f64,
    lon: f64,
}

#[derive(Serialize)]
pub struct CountriesResponse {
    countries: Vec<String>,
}

#[derive(Serialize)]
pub struct StatusResponse {
    loading: bool,
    libraries: Option<usize>,
    error: Option<String>,
}

pub enum ApiError {
    Loading,
    Unavailable(String),
    NotFound,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Loading => {
                (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "error": "loading" }))).into_response()
            }
            ApiError::Unavailable(message) => {
                (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "error": message }))).into_response()
            }
            ApiError::NotFound => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" }))).into_response()
            }
        }
    }
}

async fn ready(state: &AppState) -> Result<Arc<CountryScoper>, ApiError> {
    let dashboard = state.dashboard.read().await;
    if let Some(scoper) = dashboard.scoper() {
        return Ok(scoper);
    }
    match dashboard.error() {
        Some(message) => Err(ApiError::Unavailable(message.to_string())),
        None => Err(ApiError::Loading),
    }
}

fn scope_for(scoper: &CountryScoper, params: &CountryParams) -> ScopeState {
    let worldwide = ScopeState::worldwide(scoper);
    match params.country.as_deref() {
        Some(country) => worldwide.select_country(scoper, country),
        None => worldwide,
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let static_files = ServeDir::new(&state.config.server.static_dir);

    Router::new()
        .route("/api/status", get(status_handler))
        .route("/api/features", get(features_handler))
        .route("/api/stats", get(stats_handler))
        .route("/api/countries", get(countries_handler))
        .route("/api/scope", get(scope_handler))
        .route("/api/libraries/:id", get(library_handler))
        .route("/api/click", get(click_handler))
        .route("/api/reload", post(reload_handler))
        .fallback_service(static_files)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Loads the dataset in the background and swaps the result in when done.
fn spawn_load(state: Arc<AppState>) {
    tokio::spawn(async move {
        let result = data::load_scoper(&state.config).await;
        let mut dashboard = state.dashboard.write().await;
        *dashboard = dashboard.finish(result);
    });
}

/// Serves the API right away and loads the dataset in the background.
pub async fn start_server(config: AppConfig) -> Result<()> {
    let state = Arc::new(AppState::new(config.clone()));
    spawn_load(state.clone());

    let host: std::net::IpAddr = config
        .server
        .host
        .parse()
        .with_context(|| format!("Invalid server host: {}", config.server.host))?;
    let addr = SocketAddr::new(host, config.server.port);

    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let dashboard = state.dashboard.read().await;
    Json(StatusResponse {
        loading: dashboard.is_loading(),
        libraries: dashboard.scoper().map(|s| s.collection().len()),
        error: dashboard.error().map(str::to_string),
    })
}

async fn features_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CountryParams>,
) -> Result<Json<geojson::FeatureCollection>, ApiError> {
    let scoper = ready(&state).await?;
    let scope = scope_for(&scoper, &params);
    let features = scope.feature_ids.iter().filter_map(|id| scoper.feature(*id));
    Ok(Json(crate::feature::to_geojson(features)))
}

async fn stats_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CountryParams>,
) -> Result<Json<Stats>, ApiError> {
    let scoper = ready(&state).await?;
    Ok(Json(scope_for(&scoper, &params).stats))
}

async fn countries_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CountriesResponse>, ApiError> {
    let scoper = ready(&state).await?;
    Ok(Json(CountriesResponse {
        countries: scoper.countries().to_vec(),
    }))
}

async fn scope_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CountryParams>,
) -> Result<Json<ScopeState>, ApiError> {
    let scoper = ready(&state).await?;
    Ok(Json(scope_for(&scoper, &params)))
}

async fn library_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<usize>,
) -> Result<Json<LibraryView>, ApiError> {
    let scoper = ready(&state).await?;
    let point = scoper.feature(id).ok_or(ApiError::NotFound)?;
    Ok(Json(LibraryView::new(point)))
}

async fn click_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ClickParams>,
) -> Result<Json<ScopeState>, ApiError> {
    let scoper = ready(&state).await?;
    let tolerance = state.config.server.click_tolerance_deg;
    let current = ScopeState::worldwide(&scoper);
    let next = match scoper.hit_test(params.lon, params.lat, tolerance) {
        Some(point) => current.click_feature(&scoper, point.id),
        None => match scoper.country_at(params.lon, params.lat) {
            Some(country) => current.click_country_boundary(&scoper, country),
            None => current.click_empty(&scoper),
        },
    };
    Ok(Json(next))
}

/// Starts a new load. Data already loaded keeps being served if it fails.
async fn reload_handler(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    {
        let mut dashboard = state.dashboard.write().await;
        if dashboard.is_loading() {
            return (StatusCode::CONFLICT, Json(json!({ "error": "loading" })));
        }
        *dashboard = dashboard.begin_reload();
    }
    info!("Reloading dataset from {}", state.config.input.dataset);
    spawn_load(state);
    (StatusCode::ACCEPTED, Json(json!({ "loading": true })))
}
