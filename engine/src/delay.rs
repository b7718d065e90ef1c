//! Variant A: the delay-counter automaton for slot-based PoS settlement.
//!
//! The margin tracks the adversary's lead over the honest Delta-height and
//! ranges over a symmetric window `[-W, W]`. The substate is a single
//! transition counter `t` in `[0, delta]` counting consecutive steps since
//! honest progress last overtook the tracked frontier.
//!
//! Convention: the counter increments while `t < delta`. Only once it has
//! saturated at `delta` does an honest success reset it to 0 and pull the
//! margin down by one. (The model also circulates in a form that saturates
//! at `delta - 1`; this crate fixes the `t < delta` form and holds it
//! invariant everywhere, including the tests.)

use std::ops::RangeInclusive;

use crate::automaton::{
    Boundary, MarginWindow, State, StepOutcome, TransitionAutomaton, MAX_DELTA,
};
use crate::error::{EngineError, EngineResult};

/// Delay-counter automaton over a symmetric margin window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayAutomaton {
    delta: u32,
    window: MarginWindow,
}

impl DelayAutomaton {
    /// Build an automaton for delay bound `delta` over `[-width, width]`.
    pub fn new(delta: u32, width: i32) -> EngineResult<Self> {
        if delta > MAX_DELTA {
            return Err(EngineError::DeltaOutOfRange { delta, max: MAX_DELTA });
        }
        Ok(Self {
            delta,
            window: MarginWindow::symmetric(width)?,
        })
    }

    /// The configured delay bound.
    pub fn delta(&self) -> u32 {
        self.delta
    }

    /// A validated state for this automaton.
    pub fn state(&self, margin: i32, counter: u32) -> EngineResult<State<u32>> {
        self.window.offset(margin)?;
        if counter > self.delta {
            return Err(EngineError::SubstateOutOfRange {
                index: counter as usize,
                delta: self.delta,
            });
        }
        Ok(State { margin, substate: counter })
    }
}

impl TransitionAutomaton for DelayAutomaton {
    type Substate = u32;

    fn window(&self) -> MarginWindow {
        self.window
    }

    fn substate_count(&self) -> usize {
        self.delta as usize + 1
    }

    fn substates(&self) -> Vec<u32> {
        (0..=self.delta).collect()
    }

    fn rest(&self) -> u32 {
        0
    }

    fn substate_index(&self, substate: u32) -> EngineResult<usize> {
        if substate > self.delta {
            return Err(EngineError::SubstateOutOfRange {
                index: substate as usize,
                delta: self.delta,
            });
        }
        Ok(substate as usize)
    }

    fn successor(&self, state: State<u32>, outcome: StepOutcome, _boundary: Boundary) -> State<u32> {
        let mut margin = state.margin + outcome.adversarial as i32;
        let counter = if state.substate < self.delta {
            state.substate + 1
        } else if outcome.honest >= 1 {
            // Honest progress overtakes the tracked frontier.
            margin -= 1;
            0
        } else {
            state.substate
        };
        State { margin, substate: counter }
    }

    fn source_margins(&self, outcome: StepOutcome, _boundary: Boundary) -> RangeInclusive<i32> {
        // An honest success can pull the margin down by at most one, an
        // adversarial count pushes it up by exactly `adversarial`.
        let down = outcome.honest.min(1) as i32;
        (self.window.min() + down)..=(self.window.max() - outcome.adversarial as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(adversarial: u32, honest: u32) -> StepOutcome {
        StepOutcome { adversarial, honest }
    }

    #[test]
    fn counter_increments_until_saturated() {
        let a = DelayAutomaton::new(3, 100).unwrap();
        let s = a.state(0, 0).unwrap();
        let s = a.successor(s, outcome(0, 0), Boundary::Reflect);
        assert_eq!((s.margin, s.substate), (0, 1));
        let s = a.successor(s, outcome(2, 1), Boundary::Reflect);
        assert_eq!((s.margin, s.substate), (2, 2));
        let s = a.successor(s, outcome(0, 1), Boundary::Reflect);
        assert_eq!((s.margin, s.substate), (2, 3));
    }

    #[test]
    fn saturated_counter_resets_on_honest_success() {
        let a = DelayAutomaton::new(2, 100).unwrap();
        let saturated = a.state(5, 2).unwrap();
        let s = a.successor(saturated, outcome(1, 1), Boundary::Reflect);
        // Adversarial +1, honest overtake -1, counter back to zero.
        assert_eq!((s.margin, s.substate), (5, 0));
        let s = a.successor(saturated, outcome(0, 0), Boundary::Reflect);
        assert_eq!((s.margin, s.substate), (5, 2));
    }

    #[test]
    fn delta_zero_resets_every_honest_step() {
        // With delta = 0 the counter is always saturated.
        let a = DelayAutomaton::new(0, 10).unwrap();
        let s = a.state(0, 0).unwrap();
        let s = a.successor(s, outcome(0, 1), Boundary::Reflect);
        assert_eq!((s.margin, s.substate), (-1, 0));
    }

    #[test]
    fn construction_validates_bounds() {
        assert!(matches!(
            DelayAutomaton::new(MAX_DELTA + 1, 10),
            Err(EngineError::DeltaOutOfRange { .. })
        ));
        let a = DelayAutomaton::new(2, 10).unwrap();
        assert!(a.state(11, 0).is_err());
        assert!(a.state(0, 3).is_err());
    }

    #[test]
    fn source_margins_keep_successors_in_window() {
        let a = DelayAutomaton::new(1, 8).unwrap();
        for adversarial in 0..=3 {
            for honest in 0..=1 {
                let o = outcome(adversarial, honest);
                for margin in a.source_margins(o, Boundary::Reflect) {
                    for counter in a.substates() {
                        let s = a.successor(
                            State { margin, substate: counter },
                            o,
                            Boundary::Reflect,
                        );
                        assert!(
                            a.window().contains(s.margin),
                            "successor of ({margin}, {counter}) under {o:?} left the window"
                        );
                    }
                }
            }
        }
    }
}
