//! Command-line drivers for the settlement-security estimation engine.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod scenario;

use scenario::{DelayScenario, IsolatedScenario, Scenario, WalkScenario};

#[derive(Debug, Parser)]
#[command(
    name = "settlement",
    about = "Settlement-failure probability estimation for longest-chain consensus",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Slot-lottery model with a delay counter (proof of stake).
    Delay {
        /// Honest stake ratio, strictly between 0 and 1.
        #[arg(long)]
        honest_stake: f64,
        /// Active slot coefficient, strictly between 0 and 1.
        #[arg(long)]
        active_slot: f64,
        /// Network delay bound.
        #[arg(long)]
        delta: u32,
        /// Margin window half-width.
        #[arg(long, default_value_t = 200)]
        window: i32,
        /// Steps of evolution.
        #[arg(long)]
        steps: usize,
        /// Report the uncaptured probability every this many steps.
        #[arg(long, default_value_t = 10)]
        report_every: usize,
    },
    /// Bare barrier walk seeded from its analytic equilibrium.
    Walk {
        /// Upward move probability, strictly below one half.
        #[arg(long)]
        p: f64,
        /// Spike quota.
        #[arg(long)]
        quota: f64,
        /// Walk window width.
        #[arg(long, default_value_t = 400)]
        window: i32,
        /// Absorbing steps per run.
        #[arg(long)]
        steps: usize,
        #[arg(long, default_value_t = 10)]
        report_every: usize,
        /// Sweep integer quotas up to the quota, reporting the settlement
        /// delay at this threshold instead of per-step probabilities.
        #[arg(long)]
        sweep_threshold: Option<f64>,
    },
    /// Barrier walk with the isolation automaton (proof of work).
    Isolated {
        /// Poisson rate of honest successes per slot.
        #[arg(long)]
        honest_rate: f64,
        /// Poisson rate of adversarial successes per slot.
        #[arg(long)]
        adversarial_rate: f64,
        /// Network delay bound.
        #[arg(long)]
        delta: u32,
        /// Walk window width.
        #[arg(long, default_value_t = 400)]
        window: i32,
        /// Spike rate applied to the equilibrium seed.
        #[arg(long)]
        spike_rate: f64,
        /// Absorbing steps.
        #[arg(long)]
        steps: usize,
        #[arg(long, default_value_t = 10)]
        report_every: usize,
        /// Stationary-search stopping distance.
        #[arg(long, default_value_t = 1e-9)]
        convergence: f64,
        /// Stop early once the uncaptured probability falls below this.
        #[arg(long)]
        stop_threshold: Option<f64>,
    },
    /// Run a scenario described by a TOML file.
    Run {
        /// Path to the scenario file.
        file: PathBuf,
    },
}

impl Command {
    fn into_scenario(self) -> Result<Scenario> {
        Ok(match self {
            Self::Delay {
                honest_stake,
                active_slot,
                delta,
                window,
                steps,
                report_every,
            } => Scenario::Delay(DelayScenario {
                honest_stake,
                active_slot_coefficient: active_slot,
                delta,
                window,
                steps,
                report_every,
                truncation_tail: 1e-12,
            }),
            Self::Walk {
                p,
                quota,
                window,
                steps,
                report_every,
                sweep_threshold,
            } => Scenario::Walk(WalkScenario {
                p,
                quota,
                window,
                steps,
                report_every,
                sweep_threshold,
            }),
            Self::Isolated {
                honest_rate,
                adversarial_rate,
                delta,
                window,
                spike_rate,
                steps,
                report_every,
                convergence,
                stop_threshold,
            } => Scenario::Isolated(IsolatedScenario {
                honest_rate,
                adversarial_rate,
                delta,
                window,
                spike_rate,
                steps,
                report_every,
                convergence,
                truncation_tail: 1e-12,
                stop_threshold,
            }),
            Self::Run { file } => {
                let text = fs::read_to_string(&file)
                    .with_context(|| format!("reading scenario file {}", file.display()))?;
                Scenario::from_toml(&text)?
            }
        })
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();
    Cli::parse().command.into_scenario()?.run()
}
