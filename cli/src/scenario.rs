//! Scenario definitions and execution for the settlement drivers.
//!
//! Each scenario corresponds to one consensus model and produces a stream of
//! `(step, uncaptured probability)` pairs on stdout. Scenarios can be built
//! from command-line flags or deserialized from a TOML file whose top-level
//! `model` key selects the variant.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::info;

use settlement_engine::{
    analytic_stationary, convolve, convolve_spike, evolve, truncation_for_tail, BarrierWalk,
    Boundary, DelayAutomaton, DistributionGrid, IsolationAutomaton, OutcomeModel, SpikeShape,
    State, StationarySearch,
};

fn default_report_every() -> usize {
    10
}

fn default_truncation_tail() -> f64 {
    1e-12
}

fn default_convergence() -> f64 {
    1e-9
}

/// A scenario file: one model, fully parameterized.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case", deny_unknown_fields)]
pub enum Scenario {
    /// Slot-based delay-counter model.
    Delay(DelayScenario),
    /// Bare barrier walk.
    Walk(WalkScenario),
    /// Barrier walk with the isolation automaton.
    Isolated(IsolatedScenario),
}

impl Scenario {
    /// Parse a TOML scenario document.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("malformed scenario file")
    }

    pub fn run(&self) -> Result<()> {
        match self {
            Self::Delay(scenario) => scenario.run(),
            Self::Walk(scenario) => scenario.run(),
            Self::Isolated(scenario) => scenario.run(),
        }
    }
}

/// Slot lottery under a bounded network delay: the margin distribution is
/// evolved from the identity and the probability that the adversary is not
/// behind (margin at least zero) is reported as it decays.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DelayScenario {
    /// Honest stake ratio in `(0, 1)`.
    pub honest_stake: f64,
    /// Active slot coefficient `f` in `(0, 1)`.
    pub active_slot_coefficient: f64,
    /// Network delay bound.
    pub delta: u32,
    /// Margin window half-width.
    pub window: i32,
    /// Steps of evolution.
    pub steps: usize,
    #[serde(default = "default_report_every")]
    pub report_every: usize,
    /// Poisson tail mass ignored per step when truncating the adversarial
    /// outcome space.
    #[serde(default = "default_truncation_tail")]
    pub truncation_tail: f64,
}

impl DelayScenario {
    pub fn run(&self) -> Result<()> {
        if !(self.honest_stake > 0.0 && self.honest_stake < 1.0) {
            bail!("honest stake {} must lie strictly between 0 and 1", self.honest_stake);
        }
        if !(self.active_slot_coefficient > 0.0 && self.active_slot_coefficient < 1.0) {
            bail!(
                "active slot coefficient {} must lie strictly between 0 and 1",
                self.active_slot_coefficient
            );
        }
        let honest = 1.0 - (1.0 - self.active_slot_coefficient).powf(self.honest_stake);
        let adversarial = 1.0 - (1.0 - self.active_slot_coefficient).powf(1.0 - self.honest_stake);
        info!(
            honest_success = honest,
            adversarial_success = adversarial,
            effective_honest_rate = 1.0 / (f64::from(self.delta) - 1.0 + 1.0 / honest),
            "derived slot-lottery parameters"
        );
        let truncation = truncation_for_tail(adversarial, self.truncation_tail)?;
        let model = OutcomeModel::poisson_bernoulli(adversarial, honest, truncation)?;
        let automaton = DelayAutomaton::new(self.delta, self.window)?;
        let mut grid = DistributionGrid::identity(automaton)?;
        for step in 1..=self.steps {
            grid = evolve(&grid, &model, Boundary::Reflect)?;
            if step % self.report_every == 0 {
                println!("({step}, {})", grid.mass_where(|margin| margin >= 0));
            }
        }
        info!(summary = %serde_json::to_string(&grid.summary())?, "final distribution");
        Ok(())
    }
}

/// The bare barrier walk: seed with the analytic equilibrium perturbed by a
/// quota spike, evolve under absorption, report the uncaptured probability.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WalkScenario {
    /// Upward move probability, strictly below one half.
    pub p: f64,
    /// Spike quota (units of adversarial expectation).
    pub quota: f64,
    /// Walk window width.
    pub window: i32,
    /// Absorbing steps per run.
    pub steps: usize,
    #[serde(default = "default_report_every")]
    pub report_every: usize,
    /// Sweep mode: report, for every integer quota up to `quota`, the number
    /// of absorbing steps until the uncaptured probability falls below this
    /// threshold.
    #[serde(default)]
    pub sweep_threshold: Option<f64>,
}

impl WalkScenario {
    fn seeded(&self, quota: f64) -> Result<DistributionGrid<BarrierWalk>> {
        let walk = BarrierWalk::new(self.window)?;
        let equilibrium = analytic_stationary(walk, self.p)?;
        let pmf = SpikeShape::Quota { quota }.pmf(self.window as usize)?;
        let mut spike = DistributionGrid::zero(walk);
        for (k, &weight) in pmf.iter().enumerate() {
            spike.set(State { margin: k as i32, substate: () }, weight)?;
        }
        Ok(convolve(&equilibrium, &spike)?)
    }

    pub fn run(&self) -> Result<()> {
        let model = OutcomeModel::walk(self.p)?;
        match self.sweep_threshold {
            None => {
                let mut grid = self.seeded(self.quota)?;
                for step in 1..=self.steps {
                    grid = evolve(&grid, &model, Boundary::Absorb)?;
                    if step % self.report_every == 0 {
                        println!("({step}, {})", grid.mass_beyond_origin());
                    }
                }
                info!(summary = %serde_json::to_string(&grid.summary())?, "final distribution");
            }
            Some(threshold) => {
                if !(threshold > 0.0) {
                    bail!("sweep threshold {threshold} must be positive");
                }
                // Settlement-delay curve: steps to drive the uncaptured
                // probability below the threshold, per spike power.
                for quota in 0..=(self.quota.floor() as u32) {
                    let mut grid = self.seeded(f64::from(quota))?;
                    let mut settled = None;
                    for step in 1..=self.steps {
                        grid = evolve(&grid, &model, Boundary::Absorb)?;
                        if grid.mass_beyond_origin() < threshold {
                            settled = Some(step);
                            break;
                        }
                    }
                    match settled {
                        Some(step) => println!("({quota}, {step})"),
                        None => println!("({quota}, >{})", self.steps),
                    }
                }
            }
        }
        Ok(())
    }
}

/// Continuous-time proof-of-work model: iterate the reflecting evolution to
/// equilibrium, perturb with a Poisson spike, evolve under absorption.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IsolatedScenario {
    /// Poisson rate of honest block successes per slot.
    pub honest_rate: f64,
    /// Poisson rate of adversarial block successes per slot.
    pub adversarial_rate: f64,
    /// Network delay bound.
    pub delta: u32,
    /// Walk window width.
    pub window: i32,
    /// Spike rate (adversarial expectation at perturbation time).
    pub spike_rate: f64,
    /// Absorbing steps.
    pub steps: usize,
    #[serde(default = "default_report_every")]
    pub report_every: usize,
    /// Stationary-search stopping distance.
    #[serde(default = "default_convergence")]
    pub convergence: f64,
    #[serde(default = "default_truncation_tail")]
    pub truncation_tail: f64,
    /// Stop the absorbing run early once the uncaptured probability falls
    /// below this value.
    #[serde(default)]
    pub stop_threshold: Option<f64>,
}

impl IsolatedScenario {
    pub fn run(&self) -> Result<()> {
        info!(
            isolated_honest_rate = self.honest_rate
                * (-self.honest_rate * f64::from(2 * self.delta + 1)).exp(),
            "effective isolated honest success rate"
        );
        let truncation = truncation_for_tail(self.adversarial_rate, self.truncation_tail)?;
        let model =
            OutcomeModel::poisson_isolated(self.adversarial_rate, self.honest_rate, truncation)?;
        let automaton = IsolationAutomaton::new(self.delta, self.window)?;

        info!("estimating stationary distribution");
        let equilibrium = StationarySearch::new()
            .with_threshold(self.convergence)?
            .estimate(automaton, &model)?;
        info!(
            iterations = equilibrium.iterations,
            distance = equilibrium.distance,
            "stationary search finished"
        );
        if !equilibrium.converged {
            bail!(
                "stationary search did not converge within {} iterations (distance {})",
                equilibrium.iterations,
                equilibrium.distance
            );
        }

        let spike = SpikeShape::Poisson { rate: self.spike_rate }.pmf(self.window as usize)?;
        let mut grid = convolve_spike(&equilibrium.distribution, &spike)?;
        for step in 1..=self.steps {
            grid = evolve(&grid, &model, Boundary::Absorb)?;
            let uncaptured = grid.mass_beyond_origin();
            let settled = self
                .stop_threshold
                .is_some_and(|threshold| uncaptured < threshold);
            if settled || step % self.report_every == 0 {
                println!("({step}, {uncaptured})");
            }
            if settled {
                break;
            }
        }
        info!(summary = %serde_json::to_string(&grid.summary())?, "final distribution");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_round_trip_selects_the_model() {
        let scenario = Scenario::from_toml(
            r#"
            model = "walk"
            p = 0.4
            quota = 3.0
            window = 60
            steps = 100
            "#,
        )
        .unwrap();
        match scenario {
            Scenario::Walk(walk) => {
                assert_eq!(walk.window, 60);
                assert_eq!(walk.report_every, 10);
                assert!(walk.sweep_threshold.is_none());
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = Scenario::from_toml(
            r#"
            model = "delay"
            honest_stake = 0.7
            active_slot_coefficient = 0.05
            delta = 2
            window = 100
            steps = 50
            surprise = true
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn delay_scenario_validates_its_ratios() {
        let scenario = DelayScenario {
            honest_stake: 1.2,
            active_slot_coefficient: 0.05,
            delta: 1,
            window: 20,
            steps: 1,
            report_every: 10,
            truncation_tail: 1e-9,
        };
        assert!(scenario.run().is_err());
    }

    #[test]
    fn small_walk_scenario_runs_to_completion() {
        let scenario = WalkScenario {
            p: 0.35,
            quota: 1.0,
            window: 30,
            steps: 20,
            report_every: 10,
            sweep_threshold: None,
        };
        scenario.run().unwrap();
    }
}
