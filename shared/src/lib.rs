use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Geographic position in degrees, ordered longitude first.
///
/// Serialized as a GeoJSON position (`[lon, lat]`) so route geometries can be
/// handed to map clients unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinate {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl From<[f64; 2]> for Coordinate {
    fn from([lon, lat]: [f64; 2]) -> Self {
        Self { lon, lat }
    }
}

impl From<Coordinate> for [f64; 2] {
    fn from(coord: Coordinate) -> Self {
        [coord.lon, coord.lat]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Box spanning two points, grown by `buffer_deg` degrees on every side.
    pub fn around(start: Coordinate, end: Coordinate, buffer_deg: f64) -> Self {
        Self {
            min_lat: start.lat.min(end.lat) - buffer_deg,
            max_lat: start.lat.max(end.lat) + buffer_deg,
            min_lon: start.lon.min(end.lon) - buffer_deg,
            max_lon: start.lon.max(end.lon) + buffer_deg,
        }
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }

    pub fn lat_span(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn lon_span(&self) -> f64 {
        self.max_lon - self.min_lon
    }
}

/// A cell tower record as delivered by the tower data provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tower {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub lat: f64,
    pub lon: f64,
    /// Signal strength in dBm.
    pub average_signal: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcc: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell: Option<u64>,
    /// Coverage radius in meters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub samples: Option<u32>,
    /// Unix timestamp of the last measurement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<i64>,
}

impl Tower {
    pub fn at(lat: f64, lon: f64, average_signal: i32) -> Self {
        Self {
            id: None,
            lat,
            lon,
            average_signal,
            radio: None,
            mcc: None,
            net: None,
            area: None,
            cell: None,
            range: None,
            samples: None,
            updated: None,
        }
    }
}

/// Copy of a [`Tower`] annotated with where it sits relative to a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TowerAlongRoute {
    #[serde(flatten)]
    pub tower: Tower,
    /// Meters between the tower and the closest point of the route.
    pub distance_to_route: f64,
    /// Arc-length fraction in `[0, 1]` of the tower's projection on the route.
    pub position_along_route: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteGeometry {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Vec<Coordinate>,
}

impl RouteGeometry {
    pub fn line_string(coordinates: Vec<Coordinate>) -> Self {
        Self {
            kind: "LineString".into(),
            coordinates,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Maneuver {
    /// Provider turn sign (e.g. GraphHopper `sign`).
    #[serde(rename = "type")]
    pub sign: i32,
    pub modifier: String,
    #[serde(default)]
    pub exit_number: Option<u32>,
    #[serde(default)]
    pub turn_angle: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    pub name: String,
    /// Meters.
    pub distance: f64,
    /// Seconds.
    pub duration: f64,
    pub geometry: RouteGeometry,
    pub maneuver: Maneuver,
    pub instruction_text: String,
    pub interval: [usize; 2],
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteLeg {
    pub steps: Vec<RouteStep>,
}

/// One alternative returned by the routing provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub geometry: RouteGeometry,
    #[serde(default)]
    pub legs: Vec<RouteLeg>,
    /// Meters.
    pub distance: f64,
    /// Seconds.
    pub duration: f64,
    #[serde(default)]
    pub weight: f64,
    #[serde(default = "default_weight_name")]
    pub weight_name: String,
    #[serde(default)]
    pub ascend: f64,
    #[serde(default)]
    pub descend: f64,
    #[serde(default = "default_profile")]
    pub profile_used: String,
}

impl Route {
    /// Route with only geometry, distance and duration filled in.
    pub fn from_path(coordinates: Vec<Coordinate>, distance: f64, duration: f64) -> Self {
        Self {
            geometry: RouteGeometry::line_string(coordinates),
            legs: Vec::new(),
            distance,
            duration,
            weight: 0.0,
            weight_name: default_weight_name(),
            ascend: 0.0,
            descend: 0.0,
            profile_used: default_profile(),
        }
    }

    pub fn coordinates(&self) -> &[Coordinate] {
        &self.geometry.coordinates
    }
}

fn default_weight_name() -> String {
    "routability".into()
}

fn default_profile() -> String {
    "car".into()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub name: String,
    pub location: Coordinate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationType {
    Fastest,
    CellCoverage,
    Balanced,
}

impl OptimizationType {
    pub const ALL: [OptimizationType; 3] = [
        OptimizationType::Fastest,
        OptimizationType::CellCoverage,
        OptimizationType::Balanced,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OptimizationType::Fastest => "fastest",
            OptimizationType::CellCoverage => "cell_coverage",
            OptimizationType::Balanced => "balanced",
        }
    }
}

impl fmt::Display for OptimizationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOptimizationType(pub String);

impl fmt::Display for UnknownOptimizationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown optimization type '{}'", self.0)
    }
}

impl std::error::Error for UnknownOptimizationType {}

impl FromStr for OptimizationType {
    type Err = UnknownOptimizationType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fastest" => Ok(OptimizationType::Fastest),
            "cell_coverage" => Ok(OptimizationType::CellCoverage),
            "balanced" => Ok(OptimizationType::Balanced),
            _ => Err(UnknownOptimizationType(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizedRouteResponse {
    pub code: String,
    /// Always a single route; kept as a list for client compatibility.
    pub routes: Vec<Route>,
    pub waypoints: Vec<Waypoint>,
    pub towers: Vec<TowerAlongRoute>,
    pub optimization_type: OptimizationType,
    pub tower_data_source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TowersResponse {
    pub towers: Vec<Tower>,
    pub total: usize,
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}
