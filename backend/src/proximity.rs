//! Finding the cell towers that sit along a route polyline.
//!
//! Geometry is computed on a flat plane where longitude and latitude are used
//! directly as `x` and `y`. This is only accurate at city or regional scale:
//! the error grows with latitude and with the extent of the route. Only the
//! final distance check uses the haversine formula.

use geo::{Closest, ClosestPoint, EuclideanDistance, EuclideanLength, LineLocatePoint};
use geo_types::{Coord, LineString, Point};
use shared::{Coordinate, Tower, TowerAlongRoute};

use crate::routing::haversine_m;

/// Equatorial approximation used to turn meters into degrees.
pub const METERS_PER_DEGREE: f64 = 111_000.0;
/// Slack applied to the degree threshold of the planar pre-filter.
const COARSE_FILTER_FACTOR: f64 = 1.5;
/// Upper bound on the number of towers reported for a single route.
pub const MAX_TOWERS_ALONG_ROUTE: usize = 200;

#[derive(Debug, thiserror::Error)]
enum SkipReason {
    #[error("non-finite coordinates ({lat}, {lon})")]
    InvalidCoordinates { lat: f64, lon: f64 },
    #[error("projection onto the route is indeterminate")]
    IndeterminateProjection,
    #[error("distance to the route is unknown")]
    UnknownDistance,
}

/// Planar view of a route used for tower projection.
pub struct RouteLine {
    line: LineString<f64>,
    planar_length: f64,
}

impl RouteLine {
    /// Returns `None` when the route has fewer than two points.
    pub fn new(route: &[Coordinate]) -> Option<Self> {
        if route.len() < 2 {
            return None;
        }
        let mut coords: Vec<Coord<f64>> = route
            .iter()
            .map(|c| Coord { x: c.lon, y: c.lat })
            .collect();
        // Zero-length segments cannot be located on.
        coords.dedup();
        let line = LineString::new(coords);
        let planar_length = line.euclidean_length();
        Some(Self {
            line,
            planar_length,
        })
    }

    fn nearest_point(&self, point: &Point<f64>) -> Option<Point<f64>> {
        if self.line.0.len() == 1 {
            return Some(Point::from(self.line.0[0]));
        }
        match self.line.closest_point(point) {
            Closest::Intersection(p) | Closest::SinglePoint(p) => Some(p),
            Closest::Indeterminate => None,
        }
    }

    fn position_of(&self, point: &Point<f64>) -> f64 {
        if self.planar_length <= 0.0 {
            return 0.0;
        }
        self.line
            .line_locate_point(point)
            .unwrap_or(0.0)
            .clamp(0.0, 1.0)
    }

    fn locate(
        &self,
        tower: &Tower,
        max_distance_m: f64,
        coarse_threshold_deg: f64,
    ) -> Result<Option<TowerAlongRoute>, SkipReason> {
        if !tower.lat.is_finite() || !tower.lon.is_finite() {
            return Err(SkipReason::InvalidCoordinates {
                lat: tower.lat,
                lon: tower.lon,
            });
        }

        let tower_point = Point::new(tower.lon, tower.lat);
        let nearest = self
            .nearest_point(&tower_point)
            .ok_or(SkipReason::IndeterminateProjection)?;

        if tower_point.euclidean_distance(&nearest) > coarse_threshold_deg {
            return Ok(None);
        }

        let distance_m = haversine_m(tower.lat, tower.lon, nearest.y(), nearest.x());
        if !distance_m.is_finite() {
            return Err(SkipReason::UnknownDistance);
        }
        if distance_m > max_distance_m {
            return Ok(None);
        }

        Ok(Some(TowerAlongRoute {
            tower: tower.clone(),
            distance_to_route: distance_m,
            position_along_route: self.position_of(&nearest),
        }))
    }
}

/// Towers within `max_distance_m` meters of the route, sorted by their
/// position along it.
///
/// Input towers are never modified; matches are returned as annotated copies.
/// Towers that cannot be processed are logged and skipped.
pub fn find_towers_near_route(
    route: &[Coordinate],
    towers: &[Tower],
    max_distance_m: f64,
) -> Vec<TowerAlongRoute> {
    let Some(line) = RouteLine::new(route) else {
        return Vec::new();
    };
    if towers.is_empty() {
        return Vec::new();
    }

    let coarse_threshold_deg = max_distance_m / METERS_PER_DEGREE * COARSE_FILTER_FACTOR;

    let mut nearby: Vec<TowerAlongRoute> = towers
        .iter()
        .filter_map(
            |tower| match line.locate(tower, max_distance_m, coarse_threshold_deg) {
                Ok(found) => found,
                Err(reason) => {
                    tracing::warn!(
                        "skipping tower {}: {reason}",
                        tower.id.as_deref().unwrap_or("<unnamed>")
                    );
                    None
                }
            },
        )
        .collect();

    nearby.sort_by(|a, b| a.position_along_route.total_cmp(&b.position_along_route));
    nearby
}

/// Same as [`find_towers_near_route`], capped at [`MAX_TOWERS_ALONG_ROUTE`].
pub fn find_towers_along_route(
    route: &[Coordinate],
    towers: &[Tower],
    max_distance_m: f64,
) -> Vec<TowerAlongRoute> {
    if route.is_empty() || towers.is_empty() {
        return Vec::new();
    }

    tracing::debug!(
        "finding towers along route with {} points among {} towers (max {max_distance_m}m)",
        route.len(),
        towers.len()
    );

    let nearby = find_towers_near_route(route, towers, max_distance_m);
    if nearby.len() > MAX_TOWERS_ALONG_ROUTE {
        tracing::info!(
            "found {} towers along route, sampling down to {MAX_TOWERS_ALONG_ROUTE}",
            nearby.len()
        );
        return sample_evenly(nearby, MAX_TOWERS_ALONG_ROUTE);
    }
    nearby
}

/// Keeps `cap` items picked at uniform index strides, preserving order.
pub fn sample_evenly<T>(items: Vec<T>, cap: usize) -> Vec<T> {
    let len = items.len();
    if len <= cap {
        return items;
    }

    let mut taken = 0;
    items
        .into_iter()
        .enumerate()
        .filter_map(|(idx, item)| {
            if taken < cap && idx == taken * len / cap {
                taken += 1;
                Some(item)
            } else {
                None
            }
        })
        .collect()
}
