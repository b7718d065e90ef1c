//! Exact Markov evolution engine for consensus settlement-security estimation.
//!
//! This crate computes settlement-failure probabilities for longest-chain
//! consensus protocols by evolving a probability distribution over a compound
//! Markov state: the adversary's *margin* over honest progress, paired with a
//! small bounded automaton substate capturing honest-progress timing under a
//! network-delay bound. Evolution is exact over a finite window; boundary
//! truncation drops mass rather than wrapping it, so the tracked total mass
//! is a running bound on the accumulated approximation error.
//!
//! ## Supported models
//!
//! - [`DelayAutomaton`]: slot-based delay-counter model over a symmetric
//!   margin window, for proof-of-stake settlement under bounded delay.
//! - [`BarrierWalk`]: the birth-death walk with a barrier at the origin,
//!   with a closed-form stationary distribution for subcritical parameters.
//! - [`IsolationAutomaton`]: the barrier walk extended with an isolation
//!   automaton, for continuous-time proof-of-work settlement.
//!
//! ## Usage
//!
//! Estimate the equilibrium of a reflecting walk, perturb it with an
//! adversarial spike, then measure how quickly the perturbation is caught
//! under the absorbing boundary:
//!
//! ```rust
//! use settlement_engine::{
//!     convolve_spike, evolve, BarrierWalk, Boundary, OutcomeModel, SpikeShape,
//!     StationarySearch,
//! };
//!
//! let walk = BarrierWalk::new(60)?;
//! let model = OutcomeModel::walk(0.3)?;
//! let equilibrium = StationarySearch::new().estimate(walk, &model)?;
//! assert!(equilibrium.converged);
//!
//! let spike = SpikeShape::Quota { quota: 3.0 }.pmf(60)?;
//! let mut distribution = convolve_spike(&equilibrium.distribution, &spike)?;
//! for _ in 0..100 {
//!     distribution = evolve(&distribution, &model, Boundary::Absorb)?;
//! }
//! // Mass still beyond the origin is the uncaptured settlement risk.
//! assert!(distribution.mass_beyond_origin() < 0.05);
//! # Ok::<(), settlement_engine::EngineError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod automaton;
pub mod combinators;
pub mod delay;
pub mod error;
pub mod evolve;
pub mod grid;
pub mod isolation;
pub mod poisson;
pub mod stationary;
pub mod walk;

pub use automaton::{Boundary, MarginWindow, State, StepOutcome, TransitionAutomaton, MAX_DELTA};
pub use combinators::{convolve, convolve_spike, translate, SpikeShape};
pub use delay::DelayAutomaton;
pub use error::{EngineError, EngineResult};
pub use evolve::{evolve, OutcomeModel};
pub use grid::{DistributionGrid, GridSummary, Initialization};
pub use isolation::{Isolation, IsolationAutomaton};
pub use poisson::{isolated_honest_weights, poisson_weight, truncated_pmf, truncation_for_tail};
pub use stationary::{statistical_distance, StationaryOutcome, StationarySearch};
pub use walk::{analytic_stationary, BarrierWalk};
