//! The transition-automaton abstraction shared by the three supported models.
//!
//! Each supported consensus model evolves a compound state: a signed integer
//! margin (the adversary's lead over honest progress, or the absolute
//! position of a barrier walk) together with a small bounded substate that
//! records recent honest-progress timing. The margin alone is not Markov;
//! the substate is what restores the Markov property.
//!
//! The three automaton shapes live in [`crate::delay`], [`crate::walk`] and
//! [`crate::isolation`]; everything downstream — the distribution grid, the
//! evolution operator, the combinators and the stationary search — is generic
//! over this trait.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Largest supported network-delay bound.
pub const MAX_DELTA: u32 = 30;

/// The inclusive margin range a grid tracks. Mass whose successor would
/// leave this window is dropped by the evolution operator, never wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarginWindow {
    min: i32,
    max: i32,
}

impl MarginWindow {
    /// A window `[-width, width]`, as used by the delay model.
    pub fn symmetric(width: i32) -> EngineResult<Self> {
        if width <= 0 {
            return Err(EngineError::InvalidWindow { width });
        }
        Ok(Self { min: -width, max: width })
    }

    /// A window `[0, width]`, as used by the barrier models.
    pub fn non_negative(width: i32) -> EngineResult<Self> {
        if width <= 0 {
            return Err(EngineError::InvalidWindow { width });
        }
        Ok(Self { min: 0, max: width })
    }

    /// Smallest tracked margin.
    pub fn min(&self) -> i32 {
        self.min
    }

    /// Largest tracked margin.
    pub fn max(&self) -> i32 {
        self.max
    }

    /// Whether a margin lies inside the window.
    pub fn contains(&self, margin: i32) -> bool {
        margin >= self.min && margin <= self.max
    }

    /// Number of margin values the window spans.
    pub fn len(&self) -> usize {
        (self.max - self.min) as usize + 1
    }

    /// Windows are never empty; both constructors require positive width.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// All margins in the window, in increasing order.
    pub fn margins(&self) -> RangeInclusive<i32> {
        self.min..=self.max
    }

    /// The non-negative grid-axis offset of a margin.
    pub fn offset(&self, margin: i32) -> EngineResult<usize> {
        if !self.contains(margin) {
            return Err(EngineError::MarginOutOfRange {
                margin,
                min: self.min,
                max: self.max,
            });
        }
        Ok((margin - self.min) as usize)
    }
}

/// One point of support: a margin together with an automaton substate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct State<S> {
    pub margin: i32,
    pub substate: S,
}

/// Boundary convention applied at the origin of a barrier walk.
///
/// The two conventions are mutually exclusive per step family: the
/// reflecting form is used while estimating a stationary distribution, the
/// absorbing form while measuring how quickly a perturbation is caught.
/// The delay model has no barrier and ignores this selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Boundary {
    Reflect,
    Absorb,
}

/// One step's outcome counts: adversarial successes and honest successes.
///
/// Honest counts above 2 are never distinguished from 2 by any supported
/// automaton, so outcome models cap them there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOutcome {
    pub adversarial: u32,
    pub honest: u32,
}

/// A per-step state-transition rule plus the grid geometry it implies.
///
/// Implementations must be total over the states the grid can hold: the
/// evolution operator restricts its source-margin iteration through
/// [`source_margins`](TransitionAutomaton::source_margins) so that every
/// successor stays inside the window, and the grid re-validates coordinates
/// on every access as defense in depth.
pub trait TransitionAutomaton {
    /// The bounded internal substate tracked alongside the margin.
    type Substate: Copy + Eq + std::fmt::Debug;

    /// The margin window this automaton's grids track.
    fn window(&self) -> MarginWindow;

    /// Number of distinct substate axis offsets.
    fn substate_count(&self) -> usize;

    /// All substates, in axis order.
    fn substates(&self) -> Vec<Self::Substate>;

    /// The substate of the canonical initial state (margin 0, automaton at
    /// rest).
    fn rest(&self) -> Self::Substate;

    /// The grid-axis offset of a substate.
    fn substate_index(&self, substate: Self::Substate) -> EngineResult<usize>;

    /// Grid coordinates of a state: (margin offset, substate offset).
    fn coordinates(&self, state: State<Self::Substate>) -> EngineResult<(usize, usize)> {
        Ok((
            self.window().offset(state.margin)?,
            self.substate_index(state.substate)?,
        ))
    }

    /// The unique next state for one step's outcome counts.
    ///
    /// Callers must restrict `state.margin` to
    /// [`source_margins`](TransitionAutomaton::source_margins) for the same
    /// outcome and boundary; successors are then guaranteed in-window.
    fn successor(
        &self,
        state: State<Self::Substate>,
        outcome: StepOutcome,
        boundary: Boundary,
    ) -> State<Self::Substate>;

    /// Source margins whose successor stays in-window for this outcome.
    ///
    /// This range *is* the boundary-truncation policy: mass at margins
    /// outside it is dropped for this outcome pair rather than evolved.
    fn source_margins(&self, outcome: StepOutcome, boundary: Boundary) -> RangeInclusive<i32>;
}
