//! Stationary-distribution estimation by fixed-point iteration.
//!
//! The reflecting evolution operator is a contraction toward its stationary
//! distribution for subcritical parameters; iterating from the identity
//! distribution and stopping once consecutive iterates are within a
//! statistical-distance threshold gives the equilibrium seed for absorption
//! runs. Non-convergence within the iteration budget is a *status* on the
//! returned outcome, not an error: the caller decides whether a partial
//! approximation is usable.

use tracing::debug;

use crate::automaton::{Boundary, TransitionAutomaton};
use crate::error::{EngineError, EngineResult};
use crate::evolve::{evolve, OutcomeModel};
use crate::grid::DistributionGrid;

/// Half the L1 distance between two distributions on the same grid.
pub fn statistical_distance<A: TransitionAutomaton + Clone>(
    left: &DistributionGrid<A>,
    right: &DistributionGrid<A>,
) -> EngineResult<f64> {
    if left.cell_count() != right.cell_count() {
        return Err(EngineError::ShapeMismatch {
            left: left.cell_count(),
            right: right.cell_count(),
        });
    }
    let total: f64 = left
        .cells()
        .iter()
        .zip(right.cells())
        .map(|(a, b)| (a.1 - b.1).abs())
        .sum();
    Ok(total / 2.0)
}

/// Configuration of the fixed-point search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StationarySearch {
    threshold: f64,
    max_iterations: usize,
}

impl Default for StationarySearch {
    fn default() -> Self {
        Self { threshold: 1e-9, max_iterations: 100_000 }
    }
}

impl StationarySearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop once consecutive iterates are within this statistical distance.
    pub fn with_threshold(mut self, threshold: f64) -> EngineResult<Self> {
        if !(threshold > 0.0) || !threshold.is_finite() {
            return Err(EngineError::InvalidThreshold { value: threshold });
        }
        self.threshold = threshold;
        Ok(self)
    }

    /// Give up after this many steps.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Iterate the reflecting evolution from the identity distribution.
    pub fn estimate<A: TransitionAutomaton + Clone>(
        &self,
        automaton: A,
        model: &OutcomeModel,
    ) -> EngineResult<StationaryOutcome<A>> {
        let mut current = DistributionGrid::identity(automaton)?;
        let mut iterations = 0;
        let mut distance = f64::INFINITY;
        while iterations < self.max_iterations {
            let next = evolve(&current, model, Boundary::Reflect)?;
            distance = statistical_distance(&current, &next)?;
            current = next;
            iterations += 1;
            if distance <= self.threshold {
                break;
            }
            if iterations % 100 == 0 {
                debug!(iterations, distance, "stationary search progress");
            }
        }
        let converged = distance <= self.threshold;
        debug!(iterations, distance, converged, "stationary search finished");
        Ok(StationaryOutcome { distribution: current, iterations, distance, converged })
    }
}

/// The result of a stationary search, converged or not.
#[derive(Debug, Clone)]
pub struct StationaryOutcome<A: TransitionAutomaton> {
    /// The final iterate.
    pub distribution: DistributionGrid<A>,
    /// Steps taken.
    pub iterations: usize,
    /// Statistical distance between the last two iterates.
    pub distance: f64,
    /// Whether `distance` reached the configured threshold.
    pub converged: bool,
}
