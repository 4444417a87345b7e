use std::future::Future;

use shared::{
    BoundingBox, Coordinate, OptimizationType, OptimizedRouteResponse, Route, Tower, Waypoint,
};

use crate::{error::RouteError, routing::haversine_km, selector::select_optimized_routes};

/// Longest straight-line trip the routing provider tier accepts.
pub const MAX_ROUTE_DISTANCE_KM: f64 = 900.0;
/// Margin in degrees added around start and end when fetching towers.
pub const TOWER_SEARCH_BUFFER_DEG: f64 = 0.1;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteAlternatives {
    pub routes: Vec<Route>,
    pub waypoints: Vec<Waypoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TowerSet {
    pub towers: Vec<Tower>,
    /// Where the towers came from, e.g. `"CSV"` or `"mock"`.
    pub source: String,
}

/// Source of route alternatives between two points.
///
/// Abstracts the third-party routing API so the optimizer can be driven by
/// stand-in implementations in tests.
///
/// # Contract
/// - Return every alternative the provider produced, in provider order
/// - Report failures with their kind: [`RouteError::PointNotFound`],
///   [`RouteError::NoRoute`], [`RouteError::Provider`] or
///   [`RouteError::Configuration`]
pub trait RoutingProvider: Send + Sync {
    fn route(
        &self,
        start: Coordinate,
        end: Coordinate,
    ) -> impl Future<Output = Result<RouteAlternatives, RouteError>> + Send;
}

/// Source of cell tower records inside a bounding box.
pub trait TowerProvider: Send + Sync {
    fn towers_in_bounds(&self, bbox: BoundingBox) -> impl Future<Output = TowerSet> + Send;
}

/// Computes the route matching an [`OptimizationType`] from provider data.
pub struct RouteOptimizer<R, T> {
    routing: R,
    towers: T,
}

impl<R, T> RouteOptimizer<R, T>
where
    R: RoutingProvider,
    T: TowerProvider,
{
    pub fn new(routing: R, towers: T) -> Self {
        Self { routing, towers }
    }

    pub fn routing(&self) -> &R {
        &self.routing
    }

    pub fn towers(&self) -> &T {
        &self.towers
    }

    /// Fetches alternatives and nearby towers, then returns the route picked
    /// for `optimization_type`.
    ///
    /// # Steps
    /// 1. Reject trips longer than [`MAX_ROUTE_DISTANCE_KM`] before any
    ///    provider call
    /// 2. Request alternatives and towers concurrently; towers cover the
    ///    start/end box grown by [`TOWER_SEARCH_BUFFER_DEG`]
    /// 3. Score and select with [`select_optimized_routes`]
    /// 4. Fall back to the fastest pick when the requested one is missing
    ///
    /// Provider errors are returned unchanged.
    pub async fn get_optimized_route(
        &self,
        start_lat: f64,
        start_lng: f64,
        end_lat: f64,
        end_lng: f64,
        optimization_type: OptimizationType,
    ) -> Result<OptimizedRouteResponse, RouteError> {
        let start = Coordinate::new(start_lng, start_lat);
        let end = Coordinate::new(end_lng, end_lat);

        let distance_km = haversine_km(start, end);
        if !distance_km.is_finite() {
            return Err(RouteError::PointNotFound(
                "Start or end coordinates are not valid numbers.".into(),
            ));
        }
        if distance_km > MAX_ROUTE_DISTANCE_KM {
            tracing::warn!(
                "route distance exceeds provider limit: {distance_km:.1}km > {MAX_ROUTE_DISTANCE_KM}km"
            );
            return Err(RouteError::DistanceLimitExceeded(format!(
                "Route exceeds the maximum waypoint distance limit of {MAX_ROUTE_DISTANCE_KM:.0} km \
                 supported by the routing service."
            )));
        }

        let bbox = BoundingBox::around(start, end, TOWER_SEARCH_BUFFER_DEG);
        let (alternatives, tower_set) = tokio::join!(
            self.routing.route(start, end),
            self.towers.towers_in_bounds(bbox)
        );

        let alternatives = alternatives.inspect_err(|err| {
            tracing::error!(
                "failed to get route alternatives for '{optimization_type}': {} ({err})",
                err.code()
            );
        })?;
        if alternatives.routes.is_empty() {
            tracing::error!("routing provider reported success without any route");
            return Err(RouteError::NoRoute(
                "No routes found between the specified points.".into(),
            ));
        }

        tracing::info!(
            "fetched {} alternatives and {} towers (source: {})",
            alternatives.routes.len(),
            tower_set.towers.len(),
            tower_set.source
        );

        let selection = select_optimized_routes(&alternatives.routes, &tower_set.towers);
        let picked = selection.pick_or_fastest(optimization_type);
        let Some(route) = picked.route.clone() else {
            return Err(RouteError::NoRoute(format!(
                "Could not determine any suitable route for '{optimization_type}'."
            )));
        };
        let towers = picked.towers.clone();

        tracing::info!(
            "selected '{optimization_type}' route: distance={:.0}m duration={:.0}s towers={}",
            route.distance,
            route.duration,
            towers.len()
        );

        Ok(OptimizedRouteResponse {
            code: "Ok".into(),
            routes: vec![route],
            waypoints: alternatives.waypoints,
            towers,
            optimization_type,
            tower_data_source: tower_set.source,
        })
    }
}
