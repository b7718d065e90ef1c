//! Variant C: the barrier walk with a right-isolation automaton, for
//! continuous-time PoW settlement under a bounded network delay.
//!
//! On top of the `[0, W]` barrier walk the automaton tracks how many slots
//! have passed since the last honest success (`since_honest`, clamped at
//! delta) and whether a left-isolated honest success is pending. An honest
//! success is *isolated* when it follows at least delta silent slots and is
//! the only honest success in its slot; its margin effect is deferred one
//! step to model network propagation, and the deferred credit applies when
//! the silence clamp is reached again.

use std::ops::RangeInclusive;

use crate::automaton::{
    Boundary, MarginWindow, State, StepOutcome, TransitionAutomaton, MAX_DELTA,
};
use crate::error::{EngineError, EngineResult};

/// Substate of the isolation automaton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Isolation {
    /// Slots since the last honest success, clamped at delta.
    pub since_honest: u32,
    /// Whether a left-isolated honest success awaits its deferred credit.
    pub pending: bool,
}

/// Barrier walk with isolation tracking over `[0, width]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IsolationAutomaton {
    delta: u32,
    window: MarginWindow,
}

impl IsolationAutomaton {
    /// Build an automaton for delay bound `delta` over `[0, width]`.
    pub fn new(delta: u32, width: i32) -> EngineResult<Self> {
        if delta > MAX_DELTA {
            return Err(EngineError::DeltaOutOfRange { delta, max: MAX_DELTA });
        }
        Ok(Self {
            delta,
            window: MarginWindow::non_negative(width)?,
        })
    }

    /// The configured delay bound.
    pub fn delta(&self) -> u32 {
        self.delta
    }

    /// A validated state for this automaton.
    pub fn state(&self, margin: i32, since_honest: u32, pending: bool) -> EngineResult<State<Isolation>> {
        self.window.offset(margin)?;
        if since_honest > self.delta {
            return Err(EngineError::SubstateOutOfRange {
                index: since_honest as usize,
                delta: self.delta,
            });
        }
        Ok(State {
            margin,
            substate: Isolation { since_honest, pending },
        })
    }
}

impl TransitionAutomaton for IsolationAutomaton {
    type Substate = Isolation;

    fn window(&self) -> MarginWindow {
        self.window
    }

    fn substate_count(&self) -> usize {
        2 * self.delta as usize + 2
    }

    fn substates(&self) -> Vec<Isolation> {
        let mut all = Vec::with_capacity(self.substate_count());
        for pending in [true, false] {
            for since_honest in 0..=self.delta {
                all.push(Isolation { since_honest, pending });
            }
        }
        all
    }

    fn rest(&self) -> Isolation {
        Isolation { since_honest: 0, pending: false }
    }

    fn substate_index(&self, substate: Isolation) -> EngineResult<usize> {
        if substate.since_honest > self.delta {
            return Err(EngineError::SubstateOutOfRange {
                index: substate.since_honest as usize,
                delta: self.delta,
            });
        }
        // Pending substates occupy [0, delta], the rest [delta + 1, 2 delta + 1].
        if substate.pending {
            Ok(substate.since_honest as usize)
        } else {
            Ok(substate.since_honest as usize + self.delta as usize + 1)
        }
    }

    fn successor(
        &self,
        state: State<Isolation>,
        outcome: StepOutcome,
        _boundary: Boundary,
    ) -> State<Isolation> {
        let sub = state.substate;
        let mut deferred_credit = 0;
        let next = if outcome.honest >= 1 {
            Isolation {
                since_honest: 0,
                pending: sub.since_honest >= self.delta && outcome.honest == 1,
            }
        } else if i64::from(sub.since_honest) < i64::from(self.delta) - 1 {
            Isolation {
                since_honest: sub.since_honest + 1,
                pending: sub.pending,
            }
        } else {
            if sub.pending {
                // The deferred honest credit finally applies.
                deferred_credit = 1;
            }
            Isolation { since_honest: self.delta, pending: false }
        };
        let margin = if state.margin > 0 {
            state.margin + outcome.adversarial as i32 - deferred_credit
        } else {
            // The barrier clips downward drift at the origin.
            outcome.adversarial as i32
        };
        State { margin, substate: next }
    }

    fn source_margins(&self, outcome: StepOutcome, boundary: Boundary) -> RangeInclusive<i32> {
        // Absorbing runs never evolve the origin row: mass there counts as
        // caught and leaves the grid, so the remaining positive-margin mass
        // is exactly the uncaptured probability.
        let from = match boundary {
            Boundary::Reflect => 0,
            Boundary::Absorb => 1,
        };
        from..=(self.window.max() - outcome.adversarial as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(adversarial: u32, honest: u32) -> StepOutcome {
        StepOutcome { adversarial, honest }
    }

    #[test]
    fn substate_axis_is_a_bijection() {
        let a = IsolationAutomaton::new(3, 50).unwrap();
        let all = a.substates();
        assert_eq!(all.len(), a.substate_count());
        let mut seen = vec![false; a.substate_count()];
        for sub in all {
            let index = a.substate_index(sub).unwrap();
            assert!(!seen[index], "duplicate axis offset {index}");
            seen[index] = true;
        }
        assert!(seen.into_iter().all(|hit| hit));
    }

    #[test]
    fn isolated_honest_success_defers_its_credit() {
        let a = IsolationAutomaton::new(2, 50).unwrap();
        // Silent for >= delta slots, then a single honest success.
        let s = a.state(5, 2, false).unwrap();
        let s = a.successor(s, outcome(0, 1), Boundary::Reflect);
        assert_eq!(s.margin, 5);
        assert_eq!(s.substate, Isolation { since_honest: 0, pending: true });
        // The credit lands once the silence clamp is reached again.
        let s = a.successor(s, outcome(0, 0), Boundary::Reflect);
        assert_eq!(s.substate, Isolation { since_honest: 1, pending: true });
        let s = a.successor(s, outcome(0, 0), Boundary::Reflect);
        assert_eq!(s.margin, 4);
        assert_eq!(s.substate, Isolation { since_honest: 2, pending: false });
    }

    #[test]
    fn double_honest_success_is_not_isolated() {
        let a = IsolationAutomaton::new(2, 50).unwrap();
        let s = a.state(5, 2, false).unwrap();
        let s = a.successor(s, outcome(0, 2), Boundary::Reflect);
        assert_eq!(s.substate, Isolation { since_honest: 0, pending: false });
    }

    #[test]
    fn honest_success_after_short_silence_is_not_isolated() {
        let a = IsolationAutomaton::new(3, 50).unwrap();
        let s = a.state(5, 1, false).unwrap();
        let s = a.successor(s, outcome(0, 1), Boundary::Reflect);
        assert_eq!(s.substate, Isolation { since_honest: 0, pending: false });
    }

    #[test]
    fn origin_resets_margin_to_adversarial_count() {
        let a = IsolationAutomaton::new(2, 50).unwrap();
        let s = a.state(0, 0, false).unwrap();
        let s = a.successor(s, outcome(3, 0), Boundary::Reflect);
        assert_eq!(s.margin, 3);
    }

    #[test]
    fn pending_credit_never_drives_margin_below_zero() {
        let a = IsolationAutomaton::new(1, 50).unwrap();
        // margin 1 with a pending credit about to apply.
        let s = a.state(1, 1, true).unwrap();
        let s = a.successor(s, outcome(0, 0), Boundary::Reflect);
        assert_eq!(s.margin, 0);
        assert!(!s.substate.pending);
    }

    #[test]
    fn absorbing_source_margins_skip_the_origin() {
        let a = IsolationAutomaton::new(2, 50).unwrap();
        let o = outcome(1, 0);
        assert_eq!(a.source_margins(o, Boundary::Absorb), 1..=49);
        assert_eq!(a.source_margins(o, Boundary::Reflect), 0..=49);
    }

    #[test]
    fn construction_validates_bounds() {
        assert!(IsolationAutomaton::new(MAX_DELTA + 1, 50).is_err());
        let a = IsolationAutomaton::new(2, 50).unwrap();
        assert!(a.state(51, 0, false).is_err());
        assert!(a.state(0, 3, false).is_err());
    }
}
