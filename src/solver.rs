//! Leg order solver.
//!
//! Orders fixed-direction legs to minimise total travel: an optional trip
//! start to the first entry, every leg's own length, and each exit-to-entry
//! transfer. Small inputs are solved exactly with a subset DP; anything that
//! does not finish inside the time budget falls back to nearest neighbour
//! plus 2-opt.

use std::time::{Duration, Instant};

use crate::error::SolverError;
use crate::model::{CostMatrix, Leg, WaypointIndex, WaypointList};

/// Largest leg count attempted with the exact DP.
pub const EXACT_LEG_LIMIT: usize = 12;

/// How often (in DP subsets) the exact search checks the clock.
const CLOCK_CHECK_INTERVAL: usize = 64;

#[derive(Debug, Clone)]
pub struct SolveOptions {
    /// Wall-clock budget for the whole solve.
    pub time_budget: Duration,
    /// Maximum 2-opt passes in the heuristic path.
    pub max_two_opt_passes: usize,
    /// Legs above this count skip the exact search.
    pub exact_leg_limit: usize,
    /// Riding speed used for leg durations.
    pub leg_speed_kmh: f64,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            time_budget: Duration::from_millis(500),
            max_two_opt_passes: 50,
            exact_leg_limit: EXACT_LEG_LIMIT,
            leg_speed_kmh: 18.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveMethod {
    Exact,
    Heuristic,
}

impl SolveMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SolveMethod::Exact => "exact",
            SolveMethod::Heuristic => "heuristic",
        }
    }
}

/// A permutation of leg indices plus how it was found.
#[derive(Debug, Clone, PartialEq)]
pub struct Ordering {
    /// Input leg indices in travel order.
    pub legs: Vec<usize>,
    pub method: SolveMethod,
    pub total_distance_m: f64,
    pub total_duration_s: f64,
    pub solving_time_ms: u64,
}

/// Seconds needed to ride a leg at `speed_kmh`.
pub fn leg_duration_s(leg: &Leg, speed_kmh: f64) -> f64 {
    if speed_kmh <= 0.0 {
        return 0.0;
    }
    leg.length_m / 1000.0 / speed_kmh * 3600.0
}

/// Validated cost tables over legs rather than waypoints.
#[derive(Debug, Clone)]
pub struct LegCosts {
    n: usize,
    lengths: Vec<f64>,
    durations: Vec<f64>,
    /// `transfer[i][j]`: exit of leg `i` to entry of leg `j`.
    transfer: Vec<Vec<f64>>,
    transfer_duration: Vec<Vec<f64>>,
    start: Option<Vec<f64>>,
    start_duration: Option<Vec<f64>>,
}

impl LegCosts {
    pub fn build(
        legs: &[Leg],
        matrix: &CostMatrix,
        has_start: bool,
        leg_speed_kmh: f64,
    ) -> Result<Self, SolverError> {
        let n = legs.len();
        if n == 0 {
            return Err(SolverError::EmptyLegSet);
        }

        let waypoints = WaypointList::count_for(n, has_start)?;
        matrix.check_dimensions(waypoints)?;

        let mut lengths = Vec::with_capacity(n);
        for (index, leg) in legs.iter().enumerate() {
            if !leg.length_m.is_finite() || leg.length_m < 0.0 {
                return Err(SolverError::InvalidLeg {
                    index,
                    value: leg.length_m,
                });
            }
            lengths.push(leg.length_m);
        }
        let durations = legs
            .iter()
            .map(|leg| leg_duration_s(leg, leg_speed_kmh))
            .collect();

        let index = WaypointIndex { has_start };
        let mut transfer = vec![vec![0.0; n]; n];
        let mut transfer_duration = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    transfer[i][j] = matrix.distance(index.exit(i), index.entry(j))?;
                    transfer_duration[i][j] = matrix.duration(index.exit(i), index.entry(j))?;
                }
            }
        }

        let (start, start_duration) = match index.start() {
            Some(origin) => {
                let mut distance = Vec::with_capacity(n);
                let mut duration = Vec::with_capacity(n);
                for j in 0..n {
                    distance.push(matrix.distance(origin, index.entry(j))?);
                    duration.push(matrix.duration(origin, index.entry(j))?);
                }
                (Some(distance), Some(duration))
            }
            None => (None, None),
        };

        Ok(Self {
            n,
            lengths,
            durations,
            transfer,
            transfer_duration,
            start,
            start_duration,
        })
    }

    pub fn leg_count(&self) -> usize {
        self.n
    }

    /// Transfer distance into the leg at position `pos` of `order`.
    pub fn inbound_distance(&self, order: &[usize], pos: usize) -> f64 {
        let next = order[pos];
        if pos == 0 {
            self.start.as_ref().map_or(0.0, |start| start[next])
        } else {
            self.transfer[order[pos - 1]][next]
        }
    }

    pub fn inbound_duration(&self, order: &[usize], pos: usize) -> f64 {
        let next = order[pos];
        if pos == 0 {
            self.start_duration.as_ref().map_or(0.0, |start| start[next])
        } else {
            self.transfer_duration[order[pos - 1]][next]
        }
    }

    pub fn leg_duration(&self, leg: usize) -> f64 {
        self.durations[leg]
    }

    /// Total distance of a complete ordering.
    pub fn path_distance(&self, order: &[usize]) -> f64 {
        (0..order.len())
            .map(|pos| self.inbound_distance(order, pos) + self.lengths[order[pos]])
            .sum()
    }

    pub fn path_duration(&self, order: &[usize]) -> f64 {
        (0..order.len())
            .map(|pos| self.inbound_duration(order, pos) + self.durations[order[pos]])
            .sum()
    }

    fn entry_cost(&self, leg: usize) -> f64 {
        self.start.as_ref().map_or(0.0, |start| start[leg])
    }
}

pub fn solve(
    legs: &[Leg],
    matrix: &CostMatrix,
    has_start: bool,
    options: &SolveOptions,
) -> Result<Ordering, SolverError> {
    let started = Instant::now();
    let costs = LegCosts::build(legs, matrix, has_start, options.leg_speed_kmh)?;
    Ok(solve_costs(&costs, options, started))
}

/// Orders legs over prebuilt costs. The budget counts from `started`.
pub fn solve_costs(costs: &LegCosts, options: &SolveOptions, started: Instant) -> Ordering {
    let deadline = started + options.time_budget;

    let exact = if costs.leg_count() <= options.exact_leg_limit {
        solve_exact(costs, deadline)
    } else {
        None
    };

    let (order, method) = match exact {
        Some(order) => (order, SolveMethod::Exact),
        None => {
            if costs.leg_count() <= options.exact_leg_limit {
                tracing::debug!(
                    legs = costs.leg_count(),
                    "exact leg ordering exceeded its budget"
                );
            }
            let mut order = nearest_neighbor(costs);
            local_search(&mut order, costs, deadline, options.max_two_opt_passes);
            (order, SolveMethod::Heuristic)
        }
    };

    Ordering {
        total_distance_m: costs.path_distance(&order),
        total_duration_s: costs.path_duration(&order),
        legs: order,
        method,
        solving_time_ms: started.elapsed().as_millis() as u64,
    }
}

// ============================================================================
// Exact search
// ============================================================================

/// Held-Karp over leg subsets. `None` when the deadline passes first.
fn solve_exact(costs: &LegCosts, deadline: Instant) -> Option<Vec<usize>> {
    let n = costs.leg_count();
    let full = (1usize << n) - 1;
    let mut best = vec![f64::INFINITY; (full + 1) * n];
    let mut parent = vec![usize::MAX; (full + 1) * n];

    for leg in 0..n {
        best[(1 << leg) * n + leg] = costs.entry_cost(leg);
    }

    for mask in 1..=full {
        if mask % CLOCK_CHECK_INTERVAL == 0 && Instant::now() >= deadline {
            return None;
        }
        for last in 0..n {
            if mask & (1 << last) == 0 {
                continue;
            }
            let current = best[mask * n + last];
            if !current.is_finite() {
                continue;
            }
            for next in 0..n {
                if mask & (1 << next) != 0 {
                    continue;
                }
                let next_mask = mask | (1 << next);
                let candidate = current + costs.transfer[last][next];
                let slot = next_mask * n + next;
                if candidate < best[slot] {
                    best[slot] = candidate;
                    parent[slot] = last;
                }
            }
        }
    }

    let mut last = (0..n).min_by(|a, b| best[full * n + a].total_cmp(&best[full * n + b]))?;
    let mut order = Vec::with_capacity(n);
    let mut mask = full;
    loop {
        order.push(last);
        let previous = parent[mask * n + last];
        mask &= !(1 << last);
        if previous == usize::MAX {
            break;
        }
        last = previous;
    }
    order.reverse();

    (order.len() == n).then_some(order)
}

// ============================================================================
// Heuristic search
// ============================================================================

/// Greedy construction from the trip start, or from the best single
/// starting leg when there is no trip start.
fn nearest_neighbor(costs: &LegCosts) -> Vec<usize> {
    let n = costs.leg_count();
    if costs.start.is_some() {
        let first = (0..n)
            .min_by(|a, b| costs.entry_cost(*a).total_cmp(&costs.entry_cost(*b)))
            .unwrap_or(0);
        return greedy_from(costs, first);
    }

    (0..n)
        .map(|first| greedy_from(costs, first))
        .min_by(|a, b| costs.path_distance(a).total_cmp(&costs.path_distance(b)))
        .unwrap_or_else(|| (0..n).collect())
}

fn greedy_from(costs: &LegCosts, first: usize) -> Vec<usize> {
    let n = costs.leg_count();
    let mut visited = vec![false; n];
    let mut order = Vec::with_capacity(n);
    visited[first] = true;
    order.push(first);

    while order.len() < n {
        let current = order[order.len() - 1];
        let next = (0..n)
            .filter(|leg| !visited[*leg])
            .min_by(|a, b| costs.transfer[current][*a].total_cmp(&costs.transfer[current][*b]));
        match next {
            Some(leg) => {
                visited[leg] = true;
                order.push(leg);
            }
            None => break,
        }
    }

    order
}

/// 2-opt: reverse the visiting order of a run of legs. Each leg keeps its
/// own direction. Returns true if an improvement was made.
fn two_opt_improve(order: &mut [usize], costs: &LegCosts) -> bool {
    let n = order.len();
    if n < 2 {
        return false;
    }

    let current = costs.path_distance(order);
    for i in 0..n - 1 {
        for j in i + 1..n {
            order[i..=j].reverse();
            if costs.path_distance(order) + 1e-9 < current {
                return true;
            }
            order[i..=j].reverse();
        }
    }

    false
}

/// Exchange two legs' positions. Returns true if an improvement was made.
fn swap_improve(order: &mut [usize], costs: &LegCosts) -> bool {
    let n = order.len();
    let current = costs.path_distance(order);
    for i in 0..n {
        for j in i + 1..n {
            order.swap(i, j);
            if costs.path_distance(order) + 1e-9 < current {
                return true;
            }
            order.swap(i, j);
        }
    }

    false
}

/// Run improvement passes until nothing improves, passes run out, or the
/// deadline passes.
fn local_search(order: &mut [usize], costs: &LegCosts, deadline: Instant, max_passes: usize) {
    for _ in 0..max_passes {
        if Instant::now() >= deadline {
            break;
        }

        let mut improved = two_opt_improve(order, costs);
        if swap_improve(order, costs) {
            improved = true;
        }

        if !improved {
            break;
        }
    }
}
