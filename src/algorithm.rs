//! Closed algorithm vocabulary, resolved once into concrete learners.
//!
//! Individual ids (`ths`, `ns_ucb`, `ctx_ns_ths`, ...) parse into [`Algorithm`]; family
//! ids (`s`, `ns`, `ctx`, `ctx_ns`, and their `_ucb` / `_ths` subsets) parse into
//! [`AlgorithmFamily`], which lists the algorithms an experiment compares and the
//! environment shape they run against. After parsing, nothing matches strings again.

use std::fmt;
use std::str::FromStr;

use crate::{
    ContextSplitController, Error, Estimator, Greedy, Result, SplitMode, ThompsonSampling, Ucb1,
    Windowed,
};

/// Base estimation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Policy {
    Greedy,
    Ucb1,
    Thompson,
}

impl Policy {
    fn id(self) -> &'static str {
        match self {
            Policy::Greedy => "greedy",
            Policy::Ucb1 => "ucb",
            Policy::Thompson => "ths",
        }
    }
}

/// One runnable algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Algorithm {
    /// A single estimator; `windowed` selects the sliding-window variant.
    Plain { policy: Policy, windowed: bool },
    /// A context-split controller over estimators of `policy`.
    Contextual {
        policy: Policy,
        mode: SplitMode,
        windowed: bool,
    },
}

/// A freshly built learner for one trial.
pub enum Learner {
    Plain(Box<dyn Estimator>),
    Contextual(ContextSplitController<Box<dyn Estimator>>),
}

impl fmt::Debug for Learner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Learner::Plain(e) => f.debug_struct("Plain").field("t", &e.t()).finish(),
            Learner::Contextual(c) => f
                .debug_struct("Contextual")
                .field("t", &c.aggregate().t())
                .field("splitting", &c.is_splitting())
                .finish(),
        }
    }
}

impl Algorithm {
    pub fn policy(self) -> Policy {
        match self {
            Algorithm::Plain { policy, .. } | Algorithm::Contextual { policy, .. } => policy,
        }
    }

    pub fn is_windowed(self) -> bool {
        match self {
            Algorithm::Plain { windowed, .. } | Algorithm::Contextual { windowed, .. } => windowed,
        }
    }

    pub fn is_contextual(self) -> bool {
        matches!(self, Algorithm::Contextual { .. })
    }

    /// Greedy reports no confidence bound, so it is left out of estimate summaries.
    pub fn reports_estimates(self) -> bool {
        self.policy() != Policy::Greedy
    }

    /// Build one estimator of this algorithm's policy.
    pub fn build_estimator(
        self,
        prices: &[f64],
        horizon: usize,
        window_size: Option<usize>,
        seed: u64,
    ) -> Result<Box<dyn Estimator>> {
        let prices = prices.to_vec();
        let window = if self.is_windowed() {
            Some(window_size.ok_or_else(|| Error::MissingWindowSize {
                algorithm: self.to_string(),
            })?)
        } else {
            None
        };
        let est: Box<dyn Estimator> = match (self.policy(), window) {
            (Policy::Greedy, None) => Box::new(Greedy::new(prices, seed)?),
            (Policy::Greedy, Some(_)) => return Err(Error::UnknownAlgorithm(self.to_string())),
            (Policy::Ucb1, None) => Box::new(Ucb1::new(prices, horizon, seed)?),
            (Policy::Ucb1, Some(ws)) => {
                Box::new(Windowed::new(Ucb1::new(prices, horizon, seed)?, ws)?)
            }
            (Policy::Thompson, None) => Box::new(ThompsonSampling::with_seed(prices, seed)?),
            (Policy::Thompson, Some(ws)) => {
                Box::new(Windowed::new(ThompsonSampling::with_seed(prices, seed)?, ws)?)
            }
        };
        Ok(est)
    }

    /// Build the learner for one trial. `seeds` yields one seed per estimator.
    pub fn build(
        self,
        prices: &[f64],
        horizon: usize,
        window_size: Option<usize>,
        n_contexts: usize,
        mut seeds: impl FnMut(u64) -> u64,
    ) -> Result<Learner> {
        match self {
            Algorithm::Plain { .. } => Ok(Learner::Plain(self.build_estimator(
                prices,
                horizon,
                window_size,
                seeds(0),
            )?)),
            Algorithm::Contextual { mode, windowed, .. } => {
                let aggregate = self.build_estimator(prices, horizon, window_size, seeds(0))?;
                let contexts = (0..n_contexts as u64)
                    .map(|i| self.build_estimator(prices, horizon, window_size, seeds(i + 1)))
                    .collect::<Result<Vec<_>>>()?;
                let mut ctl = ContextSplitController::new(aggregate, contexts, mode, horizon)?;
                if windowed {
                    // `build_estimator` already rejected a missing window.
                    if let Some(ws) = window_size {
                        ctl = ctl.with_phase_window(ws)?;
                    }
                }
                Ok(Learner::Contextual(ctl))
            }
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ns = if self.is_windowed() { "ns_" } else { "" };
        match *self {
            Algorithm::Plain { policy, .. } => write!(f, "{ns}{}", policy.id()),
            Algorithm::Contextual { policy, mode, .. } => {
                let prefix = match mode {
                    SplitMode::Adaptive => "ctx",
                    SplitMode::AggregateOnly => "a",
                    SplitMode::DisaggregateOnly => "d",
                };
                write!(f, "{prefix}_{ns}{}", policy.id())
            }
        }
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let unknown = || Error::UnknownAlgorithm(s.to_string());
        if s == "greedy" {
            return Ok(Algorithm::Plain {
                policy: Policy::Greedy,
                windowed: false,
            });
        }

        let (mode, rest) = if let Some(r) = s.strip_prefix("ctx_") {
            (Some(SplitMode::Adaptive), r)
        } else if let Some(r) = s.strip_prefix("a_") {
            (Some(SplitMode::AggregateOnly), r)
        } else if let Some(r) = s.strip_prefix("d_") {
            (Some(SplitMode::DisaggregateOnly), r)
        } else {
            (None, s)
        };
        let (windowed, rest) = match rest.strip_prefix("ns_") {
            Some(r) => (true, r),
            None => (false, rest),
        };
        let policy = match rest {
            "ucb" => Policy::Ucb1,
            "ths" => Policy::Thompson,
            _ => return Err(unknown()),
        };
        Ok(match mode {
            None => Algorithm::Plain { policy, windowed },
            Some(mode) => Algorithm::Contextual {
                policy,
                mode,
                windowed,
            },
        })
    }
}

/// Shape of the demand environment an experiment runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EnvironmentKind {
    Stationary,
    NonStationary,
    Contextual,
    ContextualNonStationary,
}

impl EnvironmentKind {
    pub fn is_contextual(self) -> bool {
        matches!(
            self,
            EnvironmentKind::Contextual | EnvironmentKind::ContextualNonStationary
        )
    }

    pub fn is_phased(self) -> bool {
        matches!(
            self,
            EnvironmentKind::NonStationary | EnvironmentKind::ContextualNonStationary
        )
    }
}

/// A set of algorithms compared against one environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AlgorithmFamily {
    /// `s`: greedy, UCB1, Thompson.
    Stationary,
    /// `s_ucb`: greedy, UCB1.
    StationaryUcb,
    /// `s_ths`: greedy, Thompson.
    StationaryThompson,
    /// `ns`: windowed and plain UCB1 and Thompson.
    NonStationary,
    /// `ns_ucb`
    NonStationaryUcb,
    /// `ns_ths`
    NonStationaryThompson,
    /// `ctx`: adaptive, aggregate-only and disaggregate-only for both policies.
    Contextual,
    /// `ctx_ucb`
    ContextualUcb,
    /// `ctx_ths`
    ContextualThompson,
    /// `ctx_ns`: windowed contextual controllers for both policies.
    ContextualNonStationary,
    /// `ctx_ns_ucb`
    ContextualNonStationaryUcb,
    /// `ctx_ns_ths`
    ContextualNonStationaryThompson,
}

const FAMILIES: [(AlgorithmFamily, &str); 12] = [
    (AlgorithmFamily::Stationary, "s"),
    (AlgorithmFamily::StationaryUcb, "s_ucb"),
    (AlgorithmFamily::StationaryThompson, "s_ths"),
    (AlgorithmFamily::NonStationary, "ns"),
    (AlgorithmFamily::NonStationaryUcb, "ns_ucb"),
    (AlgorithmFamily::NonStationaryThompson, "ns_ths"),
    (AlgorithmFamily::Contextual, "ctx"),
    (AlgorithmFamily::ContextualUcb, "ctx_ucb"),
    (AlgorithmFamily::ContextualThompson, "ctx_ths"),
    (AlgorithmFamily::ContextualNonStationary, "ctx_ns"),
    (AlgorithmFamily::ContextualNonStationaryUcb, "ctx_ns_ucb"),
    (AlgorithmFamily::ContextualNonStationaryThompson, "ctx_ns_ths"),
];

impl AlgorithmFamily {
    pub fn all() -> impl Iterator<Item = AlgorithmFamily> {
        FAMILIES.iter().map(|(f, _)| *f)
    }

    pub fn environment_kind(self) -> EnvironmentKind {
        use AlgorithmFamily::*;
        match self {
            Stationary | StationaryUcb | StationaryThompson => EnvironmentKind::Stationary,
            NonStationary | NonStationaryUcb | NonStationaryThompson => {
                EnvironmentKind::NonStationary
            }
            Contextual | ContextualUcb | ContextualThompson => EnvironmentKind::Contextual,
            ContextualNonStationary
            | ContextualNonStationaryUcb
            | ContextualNonStationaryThompson => EnvironmentKind::ContextualNonStationary,
        }
    }

    /// Algorithms compared by this family, in reporting order.
    pub fn algorithms(self) -> Vec<Algorithm> {
        use AlgorithmFamily::*;
        let ids: &[&str] = match self {
            Stationary => &["greedy", "ucb", "ths"],
            StationaryUcb => &["greedy", "ucb"],
            StationaryThompson => &["greedy", "ths"],
            NonStationary => &["ns_ucb", "ucb", "ns_ths", "ths"],
            NonStationaryUcb => &["ns_ucb", "ucb"],
            NonStationaryThompson => &["ns_ths", "ths"],
            Contextual => &["ctx_ucb", "a_ucb", "d_ucb", "ctx_ths", "a_ths", "d_ths"],
            ContextualUcb => &["ctx_ucb", "a_ucb", "d_ucb"],
            ContextualThompson => &["ctx_ths", "a_ths", "d_ths"],
            ContextualNonStationary => &[
                "ctx_ns_ucb",
                "a_ns_ucb",
                "d_ns_ucb",
                "ctx_ns_ths",
                "a_ns_ths",
                "d_ns_ths",
            ],
            ContextualNonStationaryUcb => &["ctx_ns_ucb", "a_ns_ucb", "d_ns_ucb"],
            ContextualNonStationaryThompson => &["ctx_ns_ths", "a_ns_ths", "d_ns_ths"],
        };
        ids.iter()
            .filter_map(|id| id.parse().ok())
            .collect()
    }

    /// Whether any algorithm in the family needs a sliding window.
    pub fn needs_window(self) -> bool {
        self.algorithms().iter().any(|a| a.is_windowed())
    }
}

impl fmt::Display for AlgorithmFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = FAMILIES
            .iter()
            .find(|(fam, _)| fam == self)
            .map(|(_, n)| *n)
            .unwrap_or("?");
        f.write_str(name)
    }
}

impl FromStr for AlgorithmFamily {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        FAMILIES
            .iter()
            .find(|(_, name)| *name == s)
            .map(|(fam, _)| *fam)
            .ok_or_else(|| Error::UnknownFamily(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_IDS: [&str; 17] = [
        "greedy",
        "ucb",
        "ths",
        "ns_ucb",
        "ns_ths",
        "ctx_ucb",
        "a_ucb",
        "d_ucb",
        "ctx_ths",
        "a_ths",
        "d_ths",
        "ctx_ns_ucb",
        "a_ns_ucb",
        "d_ns_ucb",
        "ctx_ns_ths",
        "a_ns_ths",
        "d_ns_ths",
    ];

    #[test]
    fn every_id_round_trips() {
        for id in ALL_IDS {
            let a: Algorithm = id.parse().unwrap();
            assert_eq!(a.to_string(), id);
        }
    }

    #[test]
    fn ids_are_distinct_hash_keys() {
        let set: std::collections::HashSet<Algorithm> =
            ALL_IDS.iter().map(|id| id.parse().unwrap()).collect();
        assert_eq!(set.len(), ALL_IDS.len());
    }

    #[test]
    fn unknown_ids_are_rejected() {
        for bad in ["", "ucb1", "ns_greedy", "ctx_greedy", "ctx", "x_ucb", "ns_ns_ucb"] {
            assert_eq!(
                bad.parse::<Algorithm>().unwrap_err(),
                Error::UnknownAlgorithm(bad.to_string()),
                "{bad}"
            );
        }
        assert!("ab".parse::<AlgorithmFamily>().is_err());
    }

    #[test]
    fn families_resolve_to_expected_members() {
        let f: AlgorithmFamily = "ns".parse().unwrap();
        let ids: Vec<String> = f.algorithms().iter().map(|a| a.to_string()).collect();
        assert_eq!(ids, vec!["ns_ucb", "ucb", "ns_ths", "ths"]);
        assert_eq!(f.environment_kind(), EnvironmentKind::NonStationary);
        assert!(f.needs_window());

        let f: AlgorithmFamily = "ctx_ths".parse().unwrap();
        assert_eq!(f.algorithms().len(), 3);
        assert!(f.algorithms().iter().all(|a| a.is_contextual()));
        assert!(!f.needs_window());

        for fam in AlgorithmFamily::all() {
            assert_eq!(fam.to_string().parse::<AlgorithmFamily>().unwrap(), fam);
            assert!(!fam.algorithms().is_empty());
        }
    }

    #[test]
    fn windowed_algorithm_without_window_fails_at_build() {
        let a: Algorithm = "ns_ths".parse().unwrap();
        let err = a.build_estimator(&[1.0, 2.0], 100, None, 0).err().unwrap();
        assert_eq!(
            err,
            Error::MissingWindowSize {
                algorithm: "ns_ths".to_string()
            }
        );
    }

    #[test]
    fn contextual_build_has_one_estimator_per_context() {
        let a: Algorithm = "ctx_ns_ucb".parse().unwrap();
        let learner = a.build(&[1.0, 2.0], 100, Some(10), 3, |i| i).unwrap();
        match learner {
            Learner::Contextual(c) => {
                assert_eq!(c.n_contexts(), 3);
                assert!(c.is_phased());
                assert_eq!(c.mode(), SplitMode::Adaptive);
            }
            Learner::Plain(_) => panic!("expected a contextual learner"),
        }
    }
}
