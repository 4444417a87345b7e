//! GraphHopper client implementing [`RoutingProvider`].

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use shared::{Coordinate, Maneuver, Route, RouteGeometry, RouteLeg, RouteStep, Waypoint};

use crate::{
    engine::{RouteAlternatives, RoutingProvider},
    error::RouteError,
};

pub const DEFAULT_BASE_URL: &str = "https://graphhopper.com/api/1";
pub const DEFAULT_ALTERNATIVES: usize = 5;
pub const MAX_ALTERNATIVES: usize = 10;
const PROFILE: &str = "car";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

pub struct GraphHopperClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    alternatives: usize,
}

impl GraphHopperClient {
    /// A blank `api_key` is treated as missing; requests then fail with
    /// [`RouteError::Configuration`].
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        alternatives: usize,
    ) -> Result<Self, RouteError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| {
                RouteError::Configuration(format!("failed to build routing HTTP client: {err}"))
            })?;
        let api_key = api_key.filter(|key| !key.trim().is_empty());
        if api_key.is_none() {
            tracing::warn!("GraphHopper API key is not configured; route requests will fail");
        }

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            alternatives: alternatives.clamp(1, MAX_ALTERNATIVES),
        })
    }

    async fn request(
        &self,
        api_key: &str,
        start: Coordinate,
        end: Coordinate,
    ) -> Result<RouteAlternatives, RouteError> {
        let query = [
            ("point", format!("{},{}", start.lat, start.lon)),
            ("point", format!("{},{}", end.lat, end.lon)),
            ("profile", PROFILE.to_string()),
            ("algorithm", "alternative_route".to_string()),
            ("alternative_route.max_paths", self.alternatives.to_string()),
            ("alternative_route.max_weight_factor", "1.8".to_string()),
            ("alternative_route.max_share_factor", "0.8".to_string()),
            ("instructions", "true".to_string()),
            ("calc_points", "true".to_string()),
            ("points_encoded", "false".to_string()),
            ("locale", "en".to_string()),
            ("key", api_key.to_string()),
        ];

        let response = self
            .http
            .get(format!("{}/route", self.base_url))
            .query(&query)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.json::<GhResponse>().await.ok();
            return Err(status_error(status, body.and_then(|b| b.message)));
        }

        let body: GhResponse = response.json().await.map_err(|err| {
            tracing::error!("could not decode GraphHopper response: {err}");
            RouteError::Provider("Failed to process route data received from routing service.".into())
        })?;
        parse_response(body, start, end)
    }
}

impl RoutingProvider for GraphHopperClient {
    async fn route(
        &self,
        start: Coordinate,
        end: Coordinate,
    ) -> Result<RouteAlternatives, RouteError> {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::error!("GraphHopper API key is not configured");
            return Err(RouteError::Configuration(
                "Routing service configuration error: API key missing.".into(),
            ));
        };

        tracing::info!(
            "requesting {} GraphHopper alternatives from ({:.6}, {:.6}) to ({:.6}, {:.6})",
            self.alternatives,
            start.lat,
            start.lon,
            end.lat,
            end.lon
        );
        self.request(api_key, start, end).await
    }
}

#[derive(Debug, Default, Deserialize)]
struct GhResponse {
    #[serde(default)]
    paths: Vec<GhPath>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GhPoints {
    #[serde(default)]
    coordinates: Vec<Vec<f64>>,
}

impl GhPoints {
    /// Positions may carry a third elevation value, which is dropped.
    fn to_coordinates(&self) -> Vec<Coordinate> {
        self.coordinates
            .iter()
            .filter_map(|position| match position.as_slice() {
                [lon, lat, ..] => Some(Coordinate::new(*lon, *lat)),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct GhPath {
    #[serde(default)]
    points: Option<GhPoints>,
    #[serde(default)]
    snapped_waypoints: Option<GhPoints>,
    #[serde(default)]
    distance: f64,
    /// Milliseconds.
    #[serde(default)]
    time: f64,
    #[serde(default)]
    weight: f64,
    #[serde(default)]
    ascend: f64,
    #[serde(default)]
    descend: f64,
    #[serde(default)]
    instructions: Option<Vec<GhInstruction>>,
}

#[derive(Debug, Deserialize)]
struct GhInstruction {
    #[serde(default)]
    text: String,
    #[serde(default)]
    street_name: String,
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    time: f64,
    /// Inclusive point indices; out-of-range values are clamped when parsed.
    #[serde(default)]
    interval: Vec<f64>,
    #[serde(default)]
    sign: i32,
    #[serde(default)]
    exit_number: Option<u32>,
    #[serde(default)]
    turn_angle: Option<f64>,
}

fn parse_response(
    body: GhResponse,
    start: Coordinate,
    end: Coordinate,
) -> Result<RouteAlternatives, RouteError> {
    if body.paths.is_empty() {
        let message = body.message.unwrap_or_else(|| "No route found".into());
        tracing::warn!("GraphHopper returned no paths: {message}");
        return Err(classify_message(&message)
            .unwrap_or_else(|| RouteError::NoRoute("No route found.".into())));
    }

    tracing::info!("GraphHopper returned {} route alternatives", body.paths.len());

    let snapped = body
        .paths
        .first()
        .and_then(|path| path.snapped_waypoints.as_ref())
        .map(GhPoints::to_coordinates)
        .unwrap_or_default();
    let origin = snapped.first().copied().unwrap_or(start);
    let destination = snapped.last().copied().unwrap_or(end);

    let routes: Vec<Route> = body.paths.iter().filter_map(parse_path).collect();
    if routes.is_empty() {
        tracing::error!("failed to parse any GraphHopper path");
        return Err(RouteError::Provider(
            "Failed to process route data received from routing service.".into(),
        ));
    }

    Ok(RouteAlternatives {
        routes,
        waypoints: vec![
            Waypoint {
                name: "Origin".into(),
                location: origin,
            },
            Waypoint {
                name: "Destination".into(),
                location: destination,
            },
        ],
    })
}

fn parse_path(path: &GhPath) -> Option<Route> {
    let Some(points) = path.points.as_ref() else {
        tracing::warn!("GraphHopper path has no points, skipping it");
        return None;
    };
    let coordinates = points.to_coordinates();

    let legs = match &path.instructions {
        Some(instructions) => vec![RouteLeg {
            steps: instructions
                .iter()
                .map(|instruction| parse_step(instruction, &coordinates))
                .collect(),
        }],
        None => {
            tracing::warn!("GraphHopper path has no instructions; turn-by-turn data unavailable");
            Vec::new()
        }
    };

    Some(Route {
        geometry: RouteGeometry::line_string(coordinates),
        legs,
        distance: path.distance,
        duration: path.time / 1000.0,
        weight: path.weight,
        weight_name: "routability".into(),
        ascend: path.ascend,
        descend: path.descend,
        profile_used: PROFILE.into(),
    })
}

fn parse_step(instruction: &GhInstruction, coordinates: &[Coordinate]) -> RouteStep {
    let len = coordinates.len();
    let (from, last) = match instruction.interval.as_slice() {
        [from, last] => (*from, *last),
        _ => (0.0, 0.0),
    };
    let interval = [clamp_index(from, len), clamp_index(last, len)];
    let from = interval[0];
    let to = clamp_index(last + 1.0, len);
    let segment = coordinates.get(from..to).map(<[Coordinate]>::to_vec).unwrap_or_default();

    RouteStep {
        name: instruction.street_name.clone(),
        distance: instruction.distance,
        duration: instruction.time / 1000.0,
        geometry: RouteGeometry::line_string(segment),
        maneuver: Maneuver {
            sign: instruction.sign,
            modifier: instruction.text.clone(),
            exit_number: instruction.exit_number,
            turn_angle: instruction.turn_angle,
        },
        instruction_text: instruction.text.clone(),
        interval,
    }
}

/// Clamps a provider point index to `0..=len`.
fn clamp_index(index: f64, len: usize) -> usize {
    if index.is_nan() {
        return 0;
    }
    index.clamp(0.0, len as f64) as usize
}

/// Maps GraphHopper's snapping and connectivity messages to error kinds.
fn classify_message(message: &str) -> Option<RouteError> {
    if message.contains("Cannot find point") {
        Some(RouteError::PointNotFound(format!(
            "Could not find a valid road near the specified start or end point. {message}"
        )))
    } else if message.contains("Connection between locations not found") {
        Some(RouteError::NoRoute(
            "No route found between the specified start and end points.".into(),
        ))
    } else {
        None
    }
}

fn status_error(status: StatusCode, message: Option<String>) -> RouteError {
    if let Some(classified) = message.as_deref().and_then(classify_message) {
        return classified;
    }

    let text = match status {
        StatusCode::UNAUTHORIZED => {
            "Routing service authentication failed (Invalid API Key?).".to_string()
        }
        StatusCode::BAD_REQUEST => format!(
            "Invalid request to routing service: {}",
            message.as_deref().unwrap_or("Bad Request")
        ),
        StatusCode::TOO_MANY_REQUESTS => {
            "Routing service rate limit exceeded. Please try again later.".to_string()
        }
        s if s.is_server_error() => {
            "Routing service is currently unavailable or encountered an internal error.".to_string()
        }
        _ => "Routing service request failed".to_string(),
    };
    tracing::error!("GraphHopper request failed with status {status}: {text}");
    RouteError::Provider(text)
}

fn transport_error(err: reqwest::Error) -> RouteError {
    if err.is_timeout() {
        tracing::error!("GraphHopper request timed out after {REQUEST_TIMEOUT:?}");
        RouteError::Provider("Routing service request timed out.".into())
    } else {
        tracing::error!("GraphHopper request failed: {err}");
        RouteError::Provider("Routing service request failed".into())
    }
}
