use std::net::SocketAddr;

use axum::{
    Json, Router,
    extract::{Path, RawQuery},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use cellway_backend::geocoding::{GeocodeError, MapTilerClient};
use serde_json::{Value, json};
use shared::Coordinate;

/// Stand-in for MapTiler's `/geocoding/{segment}` lookups. Echoes what it
/// received so the tests can check the outgoing request.
async fn fake_geocoding(Path(segment): Path<String>, RawQuery(query): RawQuery) -> Response {
    let query = query.unwrap_or_default();
    let pairs: Vec<&str> = query.split('&').collect();

    if pairs.contains(&"key=valid") {
        return Json(json!({
            "type": "FeatureCollection",
            "segment": segment,
            "params": pairs,
            "features": [{"place_name": "Lyon, France", "center": [4.85, 45.75]}]
        }))
        .into_response();
    }
    if pairs.contains(&"key=broken") {
        return (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response();
    }
    (StatusCode::FORBIDDEN, Json(json!({"message": "Invalid key"}))).into_response()
}

async fn spawn_fake_maptiler() -> SocketAddr {
    let app = Router::new().route("/geocoding/:segment", get(fake_geocoding));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn client_with_key(key: &str) -> MapTilerClient {
    let addr = spawn_fake_maptiler().await;
    MapTilerClient::new(format!("http://{addr}/geocoding"), Some(key.to_string())).unwrap()
}

fn params(body: &Value) -> Vec<&str> {
    body["params"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect()
}

#[tokio::test]
async fn forward_lookup_sends_limit_autocomplete_and_proximity() {
    let client = client_with_key("valid").await;

    let body = client
        .geocode("Lyon France", false, Some(Coordinate::new(4.85, 45.75)))
        .await
        .unwrap();

    assert_eq!(body["segment"], "Lyon France.json");
    let sent = params(&body);
    assert!(sent.contains(&"limit=5"), "{sent:?}");
    assert!(sent.contains(&"autocomplete=false"), "{sent:?}");
    assert!(sent.contains(&"proximity=4.85%2C45.75"), "{sent:?}");
    assert_eq!(body["features"][0]["place_name"], "Lyon, France");
}

#[tokio::test]
async fn forward_lookup_without_proximity_omits_it() {
    let client = client_with_key("valid").await;

    let body = client.geocode("Grenoble", true, None).await.unwrap();

    let sent = params(&body);
    assert!(sent.contains(&"autocomplete=true"));
    assert!(!sent.iter().any(|pair| pair.starts_with("proximity=")));
}

#[tokio::test]
async fn reverse_lookup_uses_lon_lat_segment() {
    let client = client_with_key("valid").await;

    let body = client
        .reverse_geocode(Coordinate::new(4.85, 45.75))
        .await
        .unwrap();

    assert_eq!(body["segment"], "4.85,45.75.json");
    assert_eq!(params(&body), vec!["key=valid"]);
}

#[tokio::test]
async fn error_status_is_a_service_error() {
    let client = client_with_key("broken").await;
    let err = client.geocode("Lyon", true, None).await.unwrap_err();
    assert_eq!(
        err,
        GeocodeError::Service("Geocoding service request failed (Status: 500).".into())
    );

    let client = client_with_key("rejected").await;
    let err = client
        .reverse_geocode(Coordinate::new(4.85, 45.75))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        GeocodeError::Service("Reverse geocoding service request failed (Status: 403).".into())
    );
}

#[tokio::test]
async fn unreachable_service_is_a_service_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = MapTilerClient::new(format!("http://{addr}"), Some("valid".into())).unwrap();
    let err = client.geocode("Lyon", true, None).await.unwrap_err();

    assert_eq!(
        err,
        GeocodeError::Service("Geocoding service request failed.".into())
    );
}
