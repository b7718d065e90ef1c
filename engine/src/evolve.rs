//! The single-step evolution operator.
//!
//! A step is driven by an [`OutcomeModel`]: a finite weighted list of
//! `(adversarial, honest)` outcome counts whose weights sum to at most 1.
//! Evolution pushes each cell's mass through the automaton's transition rule
//! once per outcome, accumulating into a fresh grid. Mass at source margins
//! the automaton excludes for an outcome (see
//! [`TransitionAutomaton::source_margins`]) is dropped, which is where
//! boundary truncation happens; the per-step drop is reported at trace level
//! and otherwise only visible through the output grid's smaller total mass.

use tracing::trace;

use crate::automaton::{Boundary, State, StepOutcome, TransitionAutomaton};
use crate::error::{EngineError, EngineResult};
use crate::grid::DistributionGrid;
use crate::poisson::{isolated_honest_weights, truncated_pmf};

fn check_probability(value: f64) -> EngineResult<f64> {
    if !(0.0..=1.0).contains(&value) || !value.is_finite() {
        return Err(EngineError::InvalidProbability { value });
    }
    Ok(value)
}

/// The per-step distribution over outcome counts.
///
/// Adversarial and honest successes are drawn independently in every model;
/// the truncation bound on Poisson-distributed adversarial counts is part of
/// the model, so the implied per-step truncation error is fixed up front.
#[derive(Debug, Clone, PartialEq)]
pub enum OutcomeModel {
    /// Slot lotteries: at most one success per side per step.
    Bernoulli { adversarial: f64, honest: f64 },
    /// Poisson adversarial count, Bernoulli honest success. The slot-based
    /// delay model uses this with the adversarial success probability as
    /// the rate.
    PoissonBernoulli {
        adversarial_rate: f64,
        honest: f64,
        truncation: usize,
    },
    /// Poisson adversarial count, Poisson honest count collapsed to the
    /// three classes {0, 1, 2+} the isolation automaton distinguishes.
    PoissonIsolated {
        adversarial_rate: f64,
        honest_rate: f64,
        truncation: usize,
    },
    /// The bare birth-death walk: up with probability `up`, else down.
    Walk { up: f64 },
}

impl OutcomeModel {
    pub fn bernoulli(adversarial: f64, honest: f64) -> EngineResult<Self> {
        Ok(Self::Bernoulli {
            adversarial: check_probability(adversarial)?,
            honest: check_probability(honest)?,
        })
    }

    pub fn poisson_bernoulli(
        adversarial_rate: f64,
        honest: f64,
        truncation: usize,
    ) -> EngineResult<Self> {
        if !(adversarial_rate >= 0.0) {
            return Err(EngineError::InvalidRate { value: adversarial_rate });
        }
        Ok(Self::PoissonBernoulli {
            adversarial_rate,
            honest: check_probability(honest)?,
            truncation,
        })
    }

    pub fn poisson_isolated(
        adversarial_rate: f64,
        honest_rate: f64,
        truncation: usize,
    ) -> EngineResult<Self> {
        if !(adversarial_rate >= 0.0) {
            return Err(EngineError::InvalidRate { value: adversarial_rate });
        }
        if !(honest_rate >= 0.0) {
            return Err(EngineError::InvalidRate { value: honest_rate });
        }
        Ok(Self::PoissonIsolated {
            adversarial_rate,
            honest_rate,
            truncation,
        })
    }

    pub fn walk(up: f64) -> EngineResult<Self> {
        Ok(Self::Walk { up: check_probability(up)? })
    }

    /// The weighted outcome list this model induces.
    ///
    /// Weights are non-negative and sum to at most 1; the shortfall under 1
    /// is the Poisson truncation error, zero for the exact models.
    pub fn weights(&self) -> EngineResult<Vec<(StepOutcome, f64)>> {
        match *self {
            Self::Bernoulli { adversarial, honest } => {
                let mut out = Vec::with_capacity(4);
                for (adv, wa) in [(0, 1.0 - adversarial), (1, adversarial)] {
                    for (hon, wh) in [(0, 1.0 - honest), (1, honest)] {
                        out.push((StepOutcome { adversarial: adv, honest: hon }, wa * wh));
                    }
                }
                Ok(out)
            }
            Self::PoissonBernoulli { adversarial_rate, honest, truncation } => {
                let pmf = truncated_pmf(adversarial_rate, truncation)?;
                let mut out = Vec::with_capacity(2 * pmf.len());
                for (adv, &wa) in pmf.iter().enumerate() {
                    for (hon, wh) in [(0, 1.0 - honest), (1, honest)] {
                        out.push((
                            StepOutcome { adversarial: adv as u32, honest: hon },
                            wa * wh,
                        ));
                    }
                }
                Ok(out)
            }
            Self::PoissonIsolated { adversarial_rate, honest_rate, truncation } => {
                let pmf = truncated_pmf(adversarial_rate, truncation)?;
                let trio = isolated_honest_weights(honest_rate)?;
                let mut out = Vec::with_capacity(3 * pmf.len());
                for (adv, &wa) in pmf.iter().enumerate() {
                    for (hon, &wh) in trio.iter().enumerate() {
                        out.push((
                            StepOutcome { adversarial: adv as u32, honest: hon as u32 },
                            wa * wh,
                        ));
                    }
                }
                Ok(out)
            }
            Self::Walk { up } => Ok(vec![
                (StepOutcome { adversarial: 1, honest: 0 }, up),
                (StepOutcome { adversarial: 0, honest: 1 }, 1.0 - up),
            ]),
        }
    }
}

/// Evolve a distribution by one step under `model` and `boundary`.
///
/// Total mass never increases; it decreases by exactly the truncated mass
/// (window overflow plus any Poisson tail the model cut off).
pub fn evolve<A: TransitionAutomaton + Clone>(
    source: &DistributionGrid<A>,
    model: &OutcomeModel,
    boundary: Boundary,
) -> EngineResult<DistributionGrid<A>> {
    let automaton = source.automaton().clone();
    let substates = automaton.substates();
    let mut next = DistributionGrid::zero(automaton.clone());
    for (outcome, weight) in model.weights()? {
        if weight == 0.0 {
            continue;
        }
        for margin in automaton.source_margins(outcome, boundary) {
            for &substate in &substates {
                let state = State { margin, substate };
                let mass = source.get(state)?;
                if mass == 0.0 {
                    continue;
                }
                let target = automaton.successor(state, outcome, boundary);
                next.add(target, mass * weight)?;
            }
        }
    }
    let dropped = source.total_mass() - next.total_mass();
    trace!(dropped, "step truncation");
    Ok(next)
}
