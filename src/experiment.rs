//! Experiment sets: every algorithm of a family, run against the same demand data.

use std::time::Instant;

use tracing::info;

use crate::{
    derive_seed, AlgorithmFamily, Error, ExperimentConfig, ExperimentSummary, Optimum,
    ProbabilityProvider, ProbabilityTable, Reporter, Result, TrialRunner,
};

/// One [`TrialRunner`] per algorithm of a family, plus the optimum to score them against.
#[derive(Debug)]
pub struct ExperimentSet {
    config: ExperimentConfig,
    family: AlgorithmFamily,
    table: ProbabilityTable,
    prices: Vec<f64>,
    optimum: Optimum,
    runners: Vec<TrialRunner>,
}

impl ExperimentSet {
    /// Resolve `family` into runners, fetching demand data from `provider`.
    ///
    /// Each algorithm gets its own environment built from the same table, so one
    /// algorithm's trials never move another algorithm's phase clock.
    pub fn new(
        config: ExperimentConfig,
        family: AlgorithmFamily,
        provider: &dyn ProbabilityProvider,
    ) -> Result<Self> {
        config.validate()?;
        let kind = family.environment_kind();
        let (table, prices) = provider.probabilities(kind)?;
        table.expect_kind(kind)?;
        table.validate(prices.len())?;
        if prices.len() != config.n_arms {
            return Err(Error::PriceCountMismatch {
                arms: config.n_arms,
                prices: prices.len(),
            });
        }
        if kind.is_contextual() && table.n_contexts() != config.n_contexts {
            return Err(Error::ShapeMismatch {
                what: "contexts",
                expected: config.n_contexts,
                actual: table.n_contexts(),
            });
        }
        if kind.is_phased() && table.n_phases() != config.n_phases {
            return Err(Error::ShapeMismatch {
                what: "phases",
                expected: config.n_phases,
                actual: table.n_phases(),
            });
        }

        let window = config.window_for(family)?;
        let phase_len = config.phase_len() as u64;
        let runners = family
            .algorithms()
            .into_iter()
            .map(|algorithm| {
                let source = table.build_source(phase_len)?;
                let seed = derive_seed(config.seed, &algorithm.to_string(), 0);
                Ok(TrialRunner::new(algorithm, source, prices.clone(), config.time_horizon)?
                    .with_window_size(window)
                    .with_seed(seed))
            })
            .collect::<Result<Vec<_>>>()?;
        let optimum = Optimum::new(&table, &prices)?;

        Ok(Self {
            config,
            family,
            table,
            prices,
            optimum,
            runners,
        })
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn family(&self) -> AlgorithmFamily {
        self.family
    }

    pub fn table(&self) -> &ProbabilityTable {
        &self.table
    }

    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    pub fn optimum(&self) -> &Optimum {
        &self.optimum
    }

    pub fn runners(&self) -> &[TrialRunner] {
        &self.runners
    }

    /// Run `n_experiments` trials per algorithm, report each summary, and return them.
    pub fn run(&mut self, reporter: &mut dyn Reporter) -> Result<Vec<ExperimentSummary>> {
        let started = Instant::now();
        let names: Vec<String> = self.runners.iter().map(|r| r.algorithm().to_string()).collect();
        info!(
            family = %self.family,
            algorithms = ?names,
            horizon = self.config.time_horizon,
            trials = self.config.n_experiments,
            "experiment set starting"
        );

        let mut summaries = Vec::with_capacity(self.runners.len());
        for runner in &mut self.runners {
            let t0 = Instant::now();
            runner.run_experiment(self.config.n_experiments)?;
            let summary = runner.summary(&self.optimum);
            info!(
                algorithm = %summary.algorithm,
                final_regret = summary.final_regret().unwrap_or(0.0),
                elapsed_ms = t0.elapsed().as_millis() as u64,
                "algorithm finished"
            );
            reporter.report(&summary);
            summaries.push(summary);
        }

        info!(
            family = %self.family,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "experiment set finished"
        );
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CollectingReporter, EnvironmentKind, StaticProvider};

    fn small() -> ExperimentConfig {
        ExperimentConfig::default()
            .with_n_arms(11)
            .with_time_horizon(200)
            .with_n_experiments(2)
            .with_window_size(Some(50))
    }

    #[test]
    fn builds_one_runner_per_algorithm() {
        let p = StaticProvider::seasonal(0, None).unwrap();
        let set = ExperimentSet::new(small(), AlgorithmFamily::Contextual, &p).unwrap();
        assert_eq!(set.runners().len(), 6);
        assert_eq!(set.table().kind(), EnvironmentKind::Contextual);
        assert_eq!(set.optimum().per_context().len(), 3);
    }

    #[test]
    fn default_config_fits_seasonal_prices() {
        let p = StaticProvider::seasonal(0, None).unwrap();
        let set =
            ExperimentSet::new(ExperimentConfig::default(), AlgorithmFamily::Stationary, &p)
                .unwrap();
        assert_eq!(set.config().n_arms, p.prices().len());
    }

    #[test]
    fn arm_count_must_match_prices() {
        let p = StaticProvider::seasonal(0, None).unwrap();
        let err = ExperimentSet::new(small().with_n_arms(8), AlgorithmFamily::Stationary, &p)
            .unwrap_err();
        assert_eq!(err, Error::PriceCountMismatch { arms: 8, prices: 11 });
    }

    #[test]
    fn missing_table_is_reported() {
        let p = StaticProvider::new(vec![1.0, 2.0]).unwrap();
        let err = ExperimentSet::new(
            small().with_n_arms(2),
            AlgorithmFamily::NonStationary,
            &p,
        )
        .unwrap_err();
        assert!(matches!(err, Error::TableKindMismatch { .. }));
    }

    #[test]
    fn run_reports_every_algorithm() {
        let p = StaticProvider::seasonal(1, Some(0)).unwrap();
        let mut set = ExperimentSet::new(small(), AlgorithmFamily::NonStationaryUcb, &p).unwrap();
        let mut rep = CollectingReporter::new();
        let out = set.run(&mut rep).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(rep.summaries(), out.as_slice());
        for s in &out {
            assert_eq!(s.trials, 2);
            assert_eq!(s.rewards.len(), 200);
            assert_eq!(s.cumulative_regret.len(), 200);
        }
    }
}
