//! Distribution combinators: translation, convolution and spike seeding.
//!
//! These build the initial conditions for absorption runs. A stationary
//! distribution describes the walk in equilibrium; convolving it with a
//! *spike* (a margin-only PMF modelling a burst of adversarial luck) yields
//! the perturbed distribution whose catch-up time the absorbing evolution
//! then measures. All combinators share the evolution operator's truncation
//! policy: mass pushed past the window's top edge is dropped, never wrapped
//! or clamped.

use crate::automaton::{State, TransitionAutomaton};
use crate::error::{EngineError, EngineResult};
use crate::grid::DistributionGrid;
use crate::poisson::truncated_pmf;

/// Shift every margin by `shift`, dropping mass that leaves the window.
pub fn translate<A: TransitionAutomaton + Clone>(
    source: &DistributionGrid<A>,
    shift: i32,
) -> EngineResult<DistributionGrid<A>> {
    let automaton = source.automaton().clone();
    let mut result = DistributionGrid::zero(automaton);
    for (state, mass) in source.cells() {
        if mass == 0.0 {
            continue;
        }
        let target = state.margin + shift;
        if result.window().contains(target) {
            result.add(State { margin: target, substate: state.substate }, mass)?;
        }
    }
    Ok(result)
}

/// Convolve two margin distributions over the same window.
///
/// Defined only for automata without substate structure (a single substate
/// axis offset); richer automata convolve against a bare margin PMF through
/// [`convolve_spike`] instead, because a joint substate after summing two
/// margins has no meaning.
pub fn convolve<A: TransitionAutomaton + Clone>(
    left: &DistributionGrid<A>,
    right: &DistributionGrid<A>,
) -> EngineResult<DistributionGrid<A>> {
    let automaton = left.automaton().clone();
    if automaton.substate_count() != 1 || left.cell_count() != right.cell_count() {
        return Err(EngineError::ShapeMismatch {
            left: left.cell_count(),
            right: right.cell_count(),
        });
    }
    let substate = automaton.rest();
    let window = left.window();
    let mut result = DistributionGrid::zero(automaton);
    for i in window.margins() {
        let mass_left = left.get(State { margin: i, substate })?;
        if mass_left == 0.0 {
            continue;
        }
        for j in window.margins() {
            if i + j > window.max() {
                break;
            }
            let mass_right = right.get(State { margin: j, substate })?;
            result.add(
                State { margin: i + j, substate },
                mass_left * mass_right,
            )?;
        }
    }
    Ok(result)
}

/// Convolve a distribution with a margin-only spike PMF.
///
/// The spike shifts margins without touching substates: each substate row is
/// convolved independently, so the automaton's timing state survives the
/// perturbation intact. `pmf[k]` is the probability of an upward shift by
/// `k`; shifts past the window top are dropped.
pub fn convolve_spike<A: TransitionAutomaton + Clone>(
    base: &DistributionGrid<A>,
    pmf: &[f64],
) -> EngineResult<DistributionGrid<A>> {
    let automaton = base.automaton().clone();
    let window = base.window();
    let mut result = DistributionGrid::zero(automaton);
    for (state, mass) in base.cells() {
        if mass == 0.0 {
            continue;
        }
        for (k, &weight) in pmf.iter().enumerate() {
            let target = state.margin + k as i32;
            if target > window.max() {
                break;
            }
            result.add(
                State { margin: target, substate: state.substate },
                mass * weight,
            )?;
        }
    }
    Ok(result)
}

/// The shape of an adversarial perturbation spike.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpikeShape {
    /// Worst-case spike for an adversary free to spread `quota` units of
    /// expectation over the preceding slots: the PMF of the largest lead
    /// such a schedule can produce, via a Chernoff tail bound.
    Quota { quota: f64 },
    /// Poisson-distributed spike, for an adversary confined to its
    /// per-slot rate.
    Poisson { rate: f64 },
}

impl SpikeShape {
    /// The spike PMF over shifts `0..=top`.
    pub fn pmf(&self, top: usize) -> EngineResult<Vec<f64>> {
        match *self {
            Self::Quota { quota } => {
                if !(quota >= 0.0) || !quota.is_finite() {
                    return Err(EngineError::InvalidRate { value: quota });
                }
                Ok((0..=top)
                    .map(|k| quota_tail(quota, k) - quota_tail(quota, k + 1))
                    .collect())
            }
            Self::Poisson { rate } => truncated_pmf(rate, top),
        }
    }
}

/// Chernoff upper bound on the probability a quota-constrained adversary
/// reaches a lead of at least `k`: `(quota e / k)^k e^{-quota}`, clamped to
/// 1 at and below the quota itself.
fn quota_tail(quota: f64, k: usize) -> f64 {
    let k = k as f64;
    if k <= quota {
        1.0
    } else {
        (quota * std::f64::consts::E / k).powf(k) * (-quota).exp()
    }
}
