//! `pricing_bandits`: simulate online price selection with multi-armed bandits.
//!
//! A seller picks one of a few candidate prices every round; a customer either buys
//! (reward `price`) or does not (reward `0`). The true conversion probability of each
//! price is unknown and may shift with the season or differ between customer segments.
//! This crate runs bandit learners against synthetic demand and measures how much
//! revenue they leave on the table.
//!
//! **Learners** (all behind [`Estimator`]):
//! - [`Greedy`]: empirical best `mean * price`, no exploration after the initial sweep.
//! - [`Ucb1`]: optimism via `sqrt(ln t / n)` bounds.
//! - [`ThompsonSampling`]: Beta(1, 1) posteriors, one draw per arm per round.
//! - [`Windowed`]: decorator that keeps only the last `W` observations, for seasonal demand.
//! - [`ContextSplitController`]: one shared learner versus one learner per customer
//!   segment, switching to per-segment pricing once a lower-bound test says it pays.
//!
//! **Environments** (all behind [`RewardSource`]): stationary, phased (seasonal),
//! contextual, and phased-contextual Bernoulli demand.
//!
//! **Harness:**
//! - [`TrialRunner`]: many independent trials of one algorithm against one environment.
//! - [`ExperimentSet`]: every algorithm of an [`AlgorithmFamily`], scored against the
//!   [`Optimum`] of a [`ProbabilityTable`], summaries handed to a [`Reporter`].
//!
//! **Determinism:** every random stream (tie-breaks, posterior draws, Bernoulli draws,
//! context arrivals) is a seeded `StdRng`; seeds are derived with [`derive_seed`], so
//! one base seed reproduces a whole experiment.
//!
//! **Non-goals:**
//! - No plotting, persistence, or interpolation of raw demand curves.
//! - Trials run serially; the shared environment clock makes their order matter.
//!
//! # Example
//!
//! ```rust
//! use pricing_bandits::{BernoulliEnvironment, TrialRunner};
//!
//! let env = BernoulliEnvironment::new(vec![0.9, 0.1]).unwrap();
//! let mut runner = TrialRunner::new("ths".parse().unwrap(), Box::new(env), vec![1.0, 5.0], 500)
//!     .unwrap()
//!     .with_seed(7);
//! runner.run_experiment(3).unwrap();
//! assert_eq!(runner.reward_in_time().len(), 500);
//! ```

#![forbid(unsafe_code)]

/// Epsilon used for floating-point tie-breaking in arm selection.
///
/// Scores within this distance of the maximum count as tied.
const TIEBREAK_EPS: f64 = 1e-12;

mod error;
pub use error::*;

mod stable_hash;
pub use stable_hash::*;

mod stats;
pub use stats::*;

mod utils;
pub use utils::*;

mod window;
pub use window::*;

mod policy;
pub use policy::*;

mod greedy;
pub use greedy::*;

mod thompson;
pub use thompson::*;

mod ucb;
pub use ucb::*;

mod windowed;
pub use windowed::*;

mod env;
pub use env::*;

mod contextual;
pub use contextual::*;

mod algorithm;
pub use algorithm::*;

mod provider;
pub use provider::*;

mod config;
pub use config::*;

mod report;
pub use report::*;

mod harness;
pub use harness::*;

mod experiment;
pub use experiment::*;
