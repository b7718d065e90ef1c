//! The dense probability-mass grid underlying every distribution.
//!
//! A grid maps each valid `(margin, substate)` pair to a non-negative mass,
//! stored in one contiguous buffer sized exactly to the automaton's window
//! and substate range. Total mass lies in `[0, 1]`; it equals 1 only while
//! no boundary truncation has occurred, which makes `1 - total_mass()` the
//! implicit upper bound on the approximation error accumulated so far.
//!
//! Access is bounds-checked on every call even though the evolution
//! operator restricts its iteration ranges so violations cannot occur from
//! correct callers; a bad coordinate fails loudly rather than wrapping,
//! because silent clamping would corrupt the probability accounting.

use serde::Serialize;

use crate::automaton::{MarginWindow, State, TransitionAutomaton};
use crate::error::EngineResult;

/// How to populate a freshly constructed grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Initialization {
    /// Every cell zero.
    Zero,
    /// Unit mass at margin 0 with the automaton at rest.
    Identity,
}

/// A dense distribution over the states of one automaton.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionGrid<A: TransitionAutomaton> {
    automaton: A,
    substate_count: usize,
    cells: Vec<f64>,
}

impl<A: TransitionAutomaton + Clone> DistributionGrid<A> {
    /// The all-zero grid.
    pub fn zero(automaton: A) -> Self {
        let substate_count = automaton.substate_count();
        let cells = vec![0.0; automaton.window().len() * substate_count];
        Self { automaton, substate_count, cells }
    }

    /// The identity distribution: unit mass at the canonical initial state.
    pub fn identity(automaton: A) -> EngineResult<Self> {
        let mut grid = Self::zero(automaton);
        let rest = grid.automaton.rest();
        grid.set(State { margin: 0, substate: rest }, 1.0)?;
        Ok(grid)
    }

    /// Construct with an explicit initialization selector.
    pub fn new(automaton: A, initialization: Initialization) -> EngineResult<Self> {
        match initialization {
            Initialization::Zero => Ok(Self::zero(automaton)),
            Initialization::Identity => Self::identity(automaton),
        }
    }

    /// The automaton this grid is shaped for.
    pub fn automaton(&self) -> &A {
        &self.automaton
    }

    /// The tracked margin window.
    pub fn window(&self) -> MarginWindow {
        self.automaton.window()
    }

    /// Number of cells in the backing buffer.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    fn flat_index(&self, state: State<A::Substate>) -> EngineResult<usize> {
        let (margin_offset, substate_offset) = self.automaton.coordinates(state)?;
        Ok(margin_offset * self.substate_count + substate_offset)
    }

    /// The mass at one state.
    pub fn get(&self, state: State<A::Substate>) -> EngineResult<f64> {
        Ok(self.cells[self.flat_index(state)?])
    }

    /// Overwrite the mass at one state.
    pub fn set(&mut self, state: State<A::Substate>, mass: f64) -> EngineResult<()> {
        let index = self.flat_index(state)?;
        self.cells[index] = mass;
        Ok(())
    }

    /// Accumulate mass into one state.
    pub fn add(&mut self, state: State<A::Substate>, mass: f64) -> EngineResult<()> {
        let index = self.flat_index(state)?;
        self.cells[index] += mass;
        Ok(())
    }

    /// Total tracked mass across all cells.
    pub fn total_mass(&self) -> f64 {
        self.cells.iter().sum()
    }

    /// Mass over margins satisfying a predicate, summed across substates.
    pub fn mass_where(&self, predicate: impl Fn(i32) -> bool) -> f64 {
        let window = self.automaton.window();
        let mut total = 0.0;
        for margin in window.margins() {
            if !predicate(margin) {
                continue;
            }
            let row = window
                .offset(margin)
                .expect("margin drawn from the window itself")
                * self.substate_count;
            total += self.cells[row..row + self.substate_count].iter().sum::<f64>();
        }
        total
    }

    /// Mass at strictly positive margins: the probability the adversary
    /// currently leads (the security-relevant quantity).
    pub fn mass_beyond_origin(&self) -> f64 {
        self.mass_where(|margin| margin > 0)
    }

    /// All states with their masses, in axis order.
    pub fn cells(&self) -> Vec<(State<A::Substate>, f64)> {
        let substates = self.automaton.substates();
        let mut out = Vec::with_capacity(self.cells.len());
        for margin in self.automaton.window().margins() {
            for &substate in &substates {
                let state = State { margin, substate };
                let mass = self
                    .get(state)
                    .expect("state enumerated from the grid's own axes");
                out.push((state, mass));
            }
        }
        out
    }

    /// Aggregate numbers for reporting and diagnostics.
    pub fn summary(&self) -> GridSummary {
        GridSummary {
            window_min: self.window().min(),
            window_max: self.window().max(),
            substate_count: self.substate_count,
            total_mass: self.total_mass(),
            mass_beyond_origin: self.mass_beyond_origin(),
        }
    }

    /// A human-readable dump of the rows within `radius` of the origin.
    pub fn dump_near_origin(&self, radius: i32) -> String {
        use std::fmt::Write as _;
        let window = self.automaton.window();
        let mut out = String::from("margin : substate masses\n");
        for margin in window.margins() {
            if margin.abs() > radius {
                continue;
            }
            let row = window
                .offset(margin)
                .expect("margin drawn from the window itself")
                * self.substate_count;
            let _ = write!(out, "{margin:6} :");
            for mass in &self.cells[row..row + self.substate_count] {
                let _ = write!(out, " {mass:.6e}");
            }
            out.push('\n');
        }
        out
    }
}

/// Aggregate view of a grid, serializable for reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridSummary {
    /// Smallest tracked margin.
    pub window_min: i32,
    /// Largest tracked margin.
    pub window_max: i32,
    /// Substate axis length.
    pub substate_count: usize,
    /// Remaining (untruncated) probability mass.
    pub total_mass: f64,
    /// Mass at strictly positive margins.
    pub mass_beyond_origin: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delay::DelayAutomaton;
    use crate::isolation::IsolationAutomaton;
    use crate::walk::BarrierWalk;

    #[test]
    fn identity_grid_has_unit_mass_at_rest() {
        let automaton = DelayAutomaton::new(2, 20).unwrap();
        let grid = DistributionGrid::identity(automaton).unwrap();
        assert_eq!(grid.total_mass(), 1.0);
        assert_eq!(grid.get(automaton.state(0, 0).unwrap()).unwrap(), 1.0);
        assert_eq!(grid.mass_beyond_origin(), 0.0);
    }

    #[test]
    fn zero_grid_is_empty_everywhere() {
        let automaton = BarrierWalk::new(12).unwrap();
        let grid = DistributionGrid::new(automaton, Initialization::Zero).unwrap();
        assert_eq!(grid.total_mass(), 0.0);
        assert_eq!(grid.cell_count(), 13);
    }

    #[test]
    fn out_of_window_access_fails_loudly() {
        let automaton = DelayAutomaton::new(1, 5).unwrap();
        let mut grid = DistributionGrid::zero(automaton);
        let bad = State { margin: 6, substate: 0 };
        assert!(grid.get(bad).is_err());
        assert!(grid.set(bad, 0.5).is_err());
        let bad_substate = State { margin: 0, substate: 2 };
        assert!(grid.add(bad_substate, 0.5).is_err());
    }

    #[test]
    fn mass_where_splits_by_margin_sign() {
        let automaton = DelayAutomaton::new(0, 5).unwrap();
        let mut grid = DistributionGrid::zero(automaton);
        grid.set(automaton.state(-2, 0).unwrap(), 0.25).unwrap();
        grid.set(automaton.state(0, 0).unwrap(), 0.5).unwrap();
        grid.set(automaton.state(3, 0).unwrap(), 0.25).unwrap();
        assert_eq!(grid.mass_beyond_origin(), 0.25);
        assert_eq!(grid.mass_where(|m| m >= 0), 0.75);
        assert_eq!(grid.total_mass(), 1.0);
    }

    #[test]
    fn cell_count_matches_axes_for_the_isolation_grid() {
        let automaton = IsolationAutomaton::new(3, 40).unwrap();
        let grid = DistributionGrid::zero(automaton);
        assert_eq!(grid.cell_count(), 41 * 8);
        assert_eq!(grid.cells().len(), grid.cell_count());
    }

    #[test]
    fn summary_reports_the_grid_shape() {
        let automaton = BarrierWalk::new(8).unwrap();
        let grid = DistributionGrid::identity(automaton).unwrap();
        let summary = grid.summary();
        assert_eq!(summary.window_min, 0);
        assert_eq!(summary.window_max, 8);
        assert_eq!(summary.substate_count, 1);
        assert_eq!(summary.total_mass, 1.0);
    }

    #[test]
    fn summary_serializes_for_reports() {
        let automaton = BarrierWalk::new(4).unwrap();
        let summary = DistributionGrid::identity(automaton).unwrap().summary();
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"total_mass\":1.0"));
        assert!(json.contains("\"window_max\":4"));
    }
}
