pub mod config;
pub mod engine;
pub mod error;
pub mod geocoding;
pub mod graphhopper;
pub mod proximity;
pub mod routing;
pub mod selector;
pub mod towers;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;
use serde_json::{Value, json};
use shared::{
    ApiError, BoundingBox, Coordinate, OptimizationType, OptimizedRouteResponse, TowersResponse,
};
use tower_http::cors::{Any, CorsLayer};

use crate::engine::{RouteOptimizer, RoutingProvider, TowerProvider};
use crate::error::RouteError;
use crate::geocoding::{GeocodeError, MapTilerClient};

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

pub struct AppState<R, T> {
    pub optimizer: Arc<RouteOptimizer<R, T>>,
    pub geocoder: Arc<MapTilerClient>,
}

impl<R, T> AppState<R, T> {
    pub fn new(optimizer: RouteOptimizer<R, T>, geocoder: MapTilerClient) -> Self {
        Self {
            optimizer: Arc::new(optimizer),
            geocoder: Arc::new(geocoder),
        }
    }
}

// Manual impl: the derive would require `R: Clone` and `T: Clone`.
impl<R, T> Clone for AppState<R, T> {
    fn clone(&self) -> Self {
        Self {
            optimizer: Arc::clone(&self.optimizer),
            geocoder: Arc::clone(&self.geocoder),
        }
    }
}

pub fn create_router<R, T>(state: AppState<R, T>) -> Router
where
    R: RoutingProvider + 'static,
    T: TowerProvider + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/routing/calculate", get(calculate_route_handler::<R, T>))
        .route("/api/towers", get(towers_handler::<R, T>))
        .route("/api/geo/geocode", get(geocode_handler::<R, T>))
        .route("/api/geo/reverse-geocode", get(reverse_geocode_handler::<R, T>))
        .layer(cors)
        .with_state(state)
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Default, Deserialize)]
pub struct RouteQuery {
    pub start_lat: Option<String>,
    pub start_lng: Option<String>,
    pub end_lat: Option<String>,
    pub end_lng: Option<String>,
    pub route_type: Option<String>,
}

async fn calculate_route_handler<R, T>(
    State(state): State<AppState<R, T>>,
    Query(query): Query<RouteQuery>,
) -> ApiResult<OptimizedRouteResponse>
where
    R: RoutingProvider,
    T: TowerProvider,
{
    let [start_lat, start_lng, end_lat, end_lng] = parse_numbers(
        [&query.start_lat, &query.start_lng, &query.end_lat, &query.end_lng],
        "Missing required coordinates (start_lat, start_lng, end_lat, end_lng)",
        "Coordinates must be valid numbers",
    )?;

    let optimization_type = match query.route_type.as_deref() {
        None => OptimizationType::Balanced,
        Some(raw) => raw.parse().unwrap_or_else(|err| {
            tracing::warn!("{err}, defaulting to 'balanced'");
            OptimizationType::Balanced
        }),
    };

    tracing::info!(
        "calculating '{optimization_type}' route from ({start_lat}, {start_lng}) to ({end_lat}, {end_lng})"
    );

    state
        .optimizer
        .get_optimized_route(start_lat, start_lng, end_lat, end_lng, optimization_type)
        .await
        .map(Json)
        .map_err(route_error_response)
}

#[derive(Debug, Default, Deserialize)]
pub struct TowersQuery {
    pub min_lat: Option<String>,
    pub min_lng: Option<String>,
    pub max_lat: Option<String>,
    pub max_lng: Option<String>,
}

async fn towers_handler<R, T>(
    State(state): State<AppState<R, T>>,
    Query(query): Query<TowersQuery>,
) -> ApiResult<TowersResponse>
where
    R: RoutingProvider,
    T: TowerProvider,
{
    let [min_lat, min_lon, max_lat, max_lon] = parse_numbers(
        [&query.min_lat, &query.min_lng, &query.max_lat, &query.max_lng],
        "Missing required bounding box parameters (min_lat, min_lng, max_lat, max_lng)",
        "Valid bounding box parameters are required (must be numbers)",
    )?;

    let bbox = BoundingBox {
        min_lat,
        max_lat,
        min_lon,
        max_lon,
    };
    let set = state.optimizer.towers().towers_in_bounds(bbox).await;

    Ok(Json(TowersResponse {
        total: set.towers.len(),
        towers: set.towers,
        source: set.source,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct GeocodeQuery {
    pub query: Option<String>,
    pub autocomplete: Option<String>,
    pub proximity_lng: Option<String>,
    pub proximity_lat: Option<String>,
}

async fn geocode_handler<R, T>(
    State(state): State<AppState<R, T>>,
    Query(params): Query<GeocodeQuery>,
) -> ApiResult<Value>
where
    R: RoutingProvider,
    T: TowerProvider,
{
    let Some(query) = params.query.as_deref().filter(|q| !q.is_empty()) else {
        tracing::warn!("geocode request without 'query'");
        return Err(bad_request("'query' parameter is required"));
    };
    let autocomplete = params
        .autocomplete
        .as_deref()
        .is_none_or(|v| v.eq_ignore_ascii_case("true"));

    let proximity = match (&params.proximity_lng, &params.proximity_lat) {
        (Some(lng), Some(lat)) if !lng.is_empty() && !lat.is_empty() => {
            let [lon, lat] = parse_numbers(
                [&params.proximity_lng, &params.proximity_lat],
                "Invalid proximity coordinates (must be numbers)",
                "Invalid proximity coordinates (must be numbers)",
            )?;
            Some(Coordinate::new(lon, lat))
        }
        _ => None,
    };

    state
        .geocoder
        .geocode(query, autocomplete, proximity)
        .await
        .map(Json)
        .map_err(geocode_error_response)
}

#[derive(Debug, Default, Deserialize)]
pub struct ReverseGeocodeQuery {
    pub lat: Option<String>,
    pub lng: Option<String>,
}

async fn reverse_geocode_handler<R, T>(
    State(state): State<AppState<R, T>>,
    Query(params): Query<ReverseGeocodeQuery>,
) -> ApiResult<Value>
where
    R: RoutingProvider,
    T: TowerProvider,
{
    let [lat, lng] = parse_numbers(
        [&params.lat, &params.lng],
        "'lat' and 'lng' parameters are required",
        "Invalid 'lat' and 'lng' parameters (must be numbers)",
    )?;

    state
        .geocoder
        .reverse_geocode(Coordinate::new(lng, lat))
        .await
        .map(Json)
        .map_err(geocode_error_response)
}

/// Parses query values as finite numbers. Absent or blank values report
/// `missing`, anything unparseable reports `invalid`.
fn parse_numbers<const N: usize>(
    raw: [&Option<String>; N],
    missing: &str,
    invalid: &str,
) -> Result<[f64; N], (StatusCode, Json<ApiError>)> {
    if raw
        .iter()
        .any(|value| value.as_deref().is_none_or(|v| v.trim().is_empty()))
    {
        tracing::warn!("rejecting request: {missing}");
        return Err(bad_request(missing));
    }

    let mut parsed = [0.0; N];
    for (slot, value) in parsed.iter_mut().zip(raw) {
        match value.as_deref().map(|v| v.trim().parse::<f64>()) {
            Some(Ok(number)) if number.is_finite() => *slot = number,
            _ => {
                tracing::warn!("rejecting request: {invalid} (got {value:?})");
                return Err(bad_request(invalid));
            }
        }
    }
    Ok(parsed)
}

fn bad_request(message: &str) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError {
            error: message.to_string(),
        }),
    )
}

pub fn status_for(err: &RouteError) -> StatusCode {
    match err {
        RouteError::DistanceLimitExceeded(_)
        | RouteError::PointNotFound(_)
        | RouteError::NoRoute(_) => StatusCode::BAD_REQUEST,
        RouteError::Provider(_) => StatusCode::SERVICE_UNAVAILABLE,
        RouteError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn route_error_response(err: RouteError) -> (StatusCode, Json<ApiError>) {
    let status = status_for(&err);
    tracing::error!("route calculation failed ({}): {err}", err.code());
    (
        status,
        Json(ApiError {
            error: err.to_string(),
        }),
    )
}

pub fn geocode_status_for(err: &GeocodeError) -> StatusCode {
    match err {
        GeocodeError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        GeocodeError::Configuration(_) | GeocodeError::Service(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn geocode_error_response(err: GeocodeError) -> (StatusCode, Json<ApiError>) {
    tracing::warn!("geocoding failed: {err}");
    (
        geocode_status_for(&err),
        Json(ApiError {
            error: err.to_string(),
        }),
    )
}
