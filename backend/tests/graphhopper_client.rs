use std::net::SocketAddr;

use axum::{
    Json, Router,
    extract::RawQuery,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use cellway_backend::{engine::RoutingProvider, error::RouteError, graphhopper::GraphHopperClient};
use serde_json::json;
use shared::Coordinate;

/// Minimal stand-in for the GraphHopper `/route` endpoint, keyed on `key`.
async fn fake_route(RawQuery(query): RawQuery) -> Response {
    let query = query.unwrap_or_default();
    let has = |param: &str| query.split('&').any(|pair| pair == param);

    if !has("algorithm=alternative_route") || !has("points_encoded=false") {
        return (StatusCode::BAD_REQUEST, Json(json!({"message": "unexpected query"}))).into_response();
    }

    if has("key=valid") {
        let max_paths = query
            .split('&')
            .find_map(|pair| pair.strip_prefix("alternative_route.max_paths="))
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(1);
        let paths: Vec<_> = (0..max_paths.min(3))
            .map(|i| {
                json!({
                    "distance": 1000.0 + i as f64 * 100.0,
                    "time": 60000 + i * 10000,
                    "points": {"type": "LineString", "coordinates": [[5.0, 45.0], [5.01, 45.01]]},
                    "snapped_waypoints": {"type": "LineString", "coordinates": [[5.0, 45.0], [5.01, 45.01]]},
                    "instructions": [{"text": "Arrive", "interval": [1, 1], "sign": 4}]
                })
            })
            .collect();
        return Json(json!({"paths": paths})).into_response();
    }
    if has("key=unsnappable") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"message": "Cannot find point 0: 45.0,5.0"})),
        )
            .into_response();
    }
    if has("key=throttled") {
        return (StatusCode::TOO_MANY_REQUESTS, Json(json!({"message": "Too many requests"})))
            .into_response();
    }
    (StatusCode::UNAUTHORIZED, Json(json!({"message": "Wrong credentials"}))).into_response()
}

async fn spawn_fake_graphhopper() -> SocketAddr {
    let app = Router::new().route("/route", get(fake_route));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn route_with_key(key: &str, alternatives: usize) -> Result<usize, RouteError> {
    let addr = spawn_fake_graphhopper().await;
    let client =
        GraphHopperClient::new(format!("http://{addr}/"), Some(key.to_string()), alternatives)?;
    let result = client
        .route(Coordinate::new(5.0, 45.0), Coordinate::new(5.01, 45.01))
        .await?;
    assert_eq!(result.waypoints.len(), 2);
    Ok(result.routes.len())
}

#[tokio::test]
async fn fetches_alternatives() {
    assert_eq!(route_with_key("valid", 5).await.unwrap(), 3);
    assert_eq!(route_with_key("valid", 2).await.unwrap(), 2);
}

#[tokio::test]
async fn unsnappable_point_is_reported() {
    let err = route_with_key("unsnappable", 5).await.unwrap_err();
    assert!(matches!(err, RouteError::PointNotFound(_)), "{err:?}");
}

#[tokio::test]
async fn upstream_failures_are_provider_errors() {
    let err = route_with_key("wrong", 5).await.unwrap_err();
    assert!(matches!(err, RouteError::Provider(_)));
    assert!(err.to_string().contains("authentication"));

    let err = route_with_key("throttled", 5).await.unwrap_err();
    assert!(err.to_string().contains("rate limit"));
}

#[tokio::test]
async fn unreachable_service_is_a_provider_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = GraphHopperClient::new(format!("http://{addr}"), Some("valid".into()), 5).unwrap();
    let err = client
        .route(Coordinate::new(5.0, 45.0), Coordinate::new(5.01, 45.01))
        .await
        .unwrap_err();

    assert_eq!(err.code(), "Error");
}
