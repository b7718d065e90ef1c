//! Variant B: the birth-death walk with a barrier at the origin.
//!
//! The walk position is the margin itself, supported on `[0, W]`; there is
//! no automaton substate. Each step the particle moves up with probability
//! `p` and down with probability `1 - p`, except at the origin where the
//! boundary convention decides: a reflecting origin bounces attempted
//! downward moves back onto 0, an absorbing origin freezes the particle
//! (the sink accumulates caught probability).
//!
//! The reflecting walk with `p < 1/2` has the closed-form stationary
//! distribution `pi(t) = (p/(1-p))^t (1-2p)/(1-p)`, exposed here for
//! seeding absorption runs without an iterative fixed-point search.

use std::ops::RangeInclusive;

use crate::automaton::{Boundary, MarginWindow, State, StepOutcome, TransitionAutomaton};
use crate::error::{EngineError, EngineResult};
use crate::grid::DistributionGrid;

/// Barrier walk over `[0, width]` with a singleton substate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarrierWalk {
    window: MarginWindow,
}

impl BarrierWalk {
    /// Build a walk over `[0, width]`.
    pub fn new(width: i32) -> EngineResult<Self> {
        Ok(Self {
            window: MarginWindow::non_negative(width)?,
        })
    }
}

impl TransitionAutomaton for BarrierWalk {
    type Substate = ();

    fn window(&self) -> MarginWindow {
        self.window
    }

    fn substate_count(&self) -> usize {
        1
    }

    fn substates(&self) -> Vec<()> {
        vec![()]
    }

    fn rest(&self) {}

    fn substate_index(&self, _substate: ()) -> EngineResult<usize> {
        Ok(0)
    }

    fn successor(&self, state: State<()>, outcome: StepOutcome, boundary: Boundary) -> State<()> {
        let margin = if state.margin == 0 {
            match boundary {
                // The origin reflects: only an upward move leaves it.
                Boundary::Reflect => outcome.adversarial as i32,
                // The origin absorbs: nothing leaves it.
                Boundary::Absorb => 0,
            }
        } else {
            state.margin + outcome.adversarial as i32 - outcome.honest as i32
        };
        State { margin, substate: () }
    }

    fn source_margins(&self, outcome: StepOutcome, _boundary: Boundary) -> RangeInclusive<i32> {
        // Upward moves from the top of the window are truncated away.
        0..=(self.window.max() - outcome.adversarial as i32)
    }
}

/// The analytic stationary distribution of the reflecting walk.
///
/// Only defined for `p < 1/2`; for `p >= 1/2` the walk is not positive
/// recurrent and no stationary distribution exists.
pub fn analytic_stationary(walk: BarrierWalk, p: f64) -> EngineResult<DistributionGrid<BarrierWalk>> {
    if !(p > 0.0 && p < 0.5) {
        return Err(EngineError::InvalidProbability { value: p });
    }
    let mut grid = DistributionGrid::zero(walk);
    let ratio = p / (1.0 - p);
    let scale = (1.0 - 2.0 * p) / (1.0 - p);
    for margin in walk.window().margins() {
        grid.set(
            State { margin, substate: () },
            ratio.powi(margin) * scale,
        )?;
    }
    Ok(grid)
}
