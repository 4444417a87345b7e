//! Scoring route alternatives on travel time and cell coverage, and picking
//! one route per [`OptimizationType`].

use std::cmp::Ordering;

use shared::{OptimizationType, Route, Tower, TowerAlongRoute};

use crate::proximity::find_towers_along_route;

/// Maximum distance in meters for a tower to count as "along" a route.
pub const TOWER_PROXIMITY_M: f64 = 2500.0;
/// Average signal assumed for a route with no tower nearby.
pub const NO_COVERAGE_SIGNAL_DBM: f64 = -120.0;

/// A candidate route with the scores derived for one selection call.
#[derive(Debug, Clone)]
pub struct ScoredRoute<'a> {
    /// Position of the route in the candidate list.
    pub index: usize,
    pub route: &'a Route,
    pub towers: Vec<TowerAlongRoute>,
    pub tower_count: usize,
    /// dBm.
    pub avg_signal: f64,
    /// Seconds.
    pub duration: f64,
    /// `1.0` for the fastest candidate.
    pub norm_duration: f64,
    /// `1.0` for the candidate with the best average signal.
    pub norm_signal: f64,
    pub balanced_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteSelection {
    pub route: Option<Route>,
    pub towers: Vec<TowerAlongRoute>,
    /// Candidate index of the chosen route.
    pub index: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionResult {
    pub fastest: RouteSelection,
    pub cell_coverage: RouteSelection,
    pub balanced: RouteSelection,
}

impl SelectionResult {
    pub fn get(&self, kind: OptimizationType) -> &RouteSelection {
        match kind {
            OptimizationType::Fastest => &self.fastest,
            OptimizationType::CellCoverage => &self.cell_coverage,
            OptimizationType::Balanced => &self.balanced,
        }
    }

    /// The pick for `kind`, or the fastest pick when `kind` has no route.
    pub fn pick_or_fastest(&self, kind: OptimizationType) -> &RouteSelection {
        let pick = self.get(kind);
        if pick.route.is_some() {
            return pick;
        }
        tracing::warn!("no '{kind}' route available, falling back to fastest");
        &self.fastest
    }
}

/// Finds the towers along every candidate and computes normalized scores.
pub fn score_routes<'a>(candidates: &'a [Route], towers_in_area: &[Tower]) -> Vec<ScoredRoute<'a>> {
    let mut scored: Vec<ScoredRoute<'a>> = candidates
        .iter()
        .enumerate()
        .map(|(index, route)| {
            let towers = find_towers_along_route(route.coordinates(), towers_in_area, TOWER_PROXIMITY_M);
            let tower_count = towers.len();
            let avg_signal = if tower_count == 0 {
                NO_COVERAGE_SIGNAL_DBM
            } else {
                towers
                    .iter()
                    .map(|t| f64::from(t.tower.average_signal))
                    .sum::<f64>()
                    / tower_count as f64
            };

            tracing::debug!(
                "route {index}: duration={:.0}s towers={tower_count} avg_signal={avg_signal:.1}dBm",
                route.duration
            );

            ScoredRoute {
                index,
                route,
                towers,
                tower_count,
                avg_signal,
                duration: route.duration,
                norm_duration: 0.0,
                norm_signal: 0.0,
                balanced_score: 0.0,
            }
        })
        .collect();

    normalize(&mut scored);
    scored
}

fn normalize(scored: &mut [ScoredRoute<'_>]) {
    let (min_duration, max_duration) = min_max(scored.iter().map(|s| s.duration));
    let (min_signal, max_signal) = min_max(scored.iter().map(|s| s.avg_signal));
    // A range below one unit is widened to one, which also covers identical values.
    let duration_range = (max_duration - min_duration).max(1.0);
    let signal_range = (max_signal - min_signal).max(1.0);

    for s in scored.iter_mut() {
        s.norm_duration = 1.0 - ((s.duration - min_duration) / duration_range).clamp(0.0, 1.0);
        s.norm_signal = ((s.avg_signal - min_signal) / signal_range).clamp(0.0, 1.0);
        s.balanced_score = 0.5 * s.norm_duration + 0.5 * s.norm_signal;
        tracing::debug!(
            "route {} normalized: duration={:.2} signal={:.2} balanced={:.2}",
            s.index,
            s.norm_duration,
            s.norm_signal,
            s.balanced_score
        );
    }
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

/// Candidate indices ordered by `compare`; equal candidates keep their
/// original order.
fn ranking<F>(scored: &[ScoredRoute<'_>], compare: F) -> Vec<usize>
where
    F: Fn(&ScoredRoute<'_>, &ScoredRoute<'_>) -> Ordering,
{
    let mut order: Vec<usize> = (0..scored.len()).collect();
    order.sort_by(|&a, &b| compare(&scored[a], &scored[b]));
    order
}

/// Top of `ranking`, or the first lower-ranked index not yet `used`.
/// Falls back to the top when every ranked index is used.
fn pick_distinct(ranking: &[usize], used: &[usize]) -> Option<usize> {
    let &top = ranking.first()?;
    if !used.contains(&top) {
        return Some(top);
    }
    Some(
        ranking[1..]
            .iter()
            .copied()
            .find(|idx| !used.contains(idx))
            .unwrap_or(top),
    )
}

/// Picks the fastest, best-coverage and balanced routes among `candidates`.
///
/// Picks are made greedily in that order, each one skipping routes already
/// chosen when an unused alternative exists. With fewer than three distinct
/// candidates the same route may be returned for several types. An empty
/// candidate list yields an empty selection for every type.
pub fn select_optimized_routes(candidates: &[Route], towers_in_area: &[Tower]) -> SelectionResult {
    if candidates.is_empty() {
        tracing::warn!("route selection called without alternatives");
        return SelectionResult::default();
    }

    let scored = score_routes(candidates, towers_in_area);

    let by_duration = ranking(&scored, |a, b| a.duration.total_cmp(&b.duration));
    let by_signal = ranking(&scored, |a, b| {
        b.avg_signal
            .total_cmp(&a.avg_signal)
            .then(b.tower_count.cmp(&a.tower_count))
    });
    let by_balanced = ranking(&scored, |a, b| b.balanced_score.total_cmp(&a.balanced_score));

    let mut used = Vec::with_capacity(2);
    let fastest = by_duration.first().copied();
    used.extend(fastest);
    let cell_coverage = pick_distinct(&by_signal, &used);
    used.extend(cell_coverage);
    let balanced = pick_distinct(&by_balanced, &used);

    tracing::info!(
        "selected route indices: fastest={fastest:?} cell_coverage={cell_coverage:?} balanced={balanced:?}"
    );

    let selection = |pick: Option<usize>| match pick {
        Some(idx) => RouteSelection {
            route: Some(scored[idx].route.clone()),
            towers: scored[idx].towers.clone(),
            index: Some(idx),
        },
        None => RouteSelection::default(),
    };

    SelectionResult {
        fastest: selection(fastest),
        cell_coverage: selection(cell_coverage),
        balanced: selection(balanced),
    }
}
