//! Seasonal pricing demo: run one algorithm family on city demand data.
//!
//! ```text
//! RUST_LOG=info cargo run --example seasonal_pricing --features serde -- ctx_ns 50
//! ```
//!
//! Arguments: family id (default `ns`), trials per algorithm (default 50).
//! Prints the summaries as JSON on stdout; progress goes to the log.

use std::error::Error;

use pricing_bandits::{
    suggested_window_size, AlgorithmFamily, ExperimentConfig, ExperimentSet, Reporter,
    StaticProvider, TracingReporter,
};
use tracing_subscriber::EnvFilter;

/// Logs every summary and keeps it for the JSON dump.
#[derive(Default)]
struct JsonReporter {
    log: TracingReporter,
    rows: Vec<serde_json::Value>,
}

impl Reporter for JsonReporter {
    fn report(&mut self, summary: &pricing_bandits::ExperimentSummary) {
        self.log.report(summary);
        match serde_json::to_value(summary) {
            Ok(v) => self.rows.push(v),
            Err(e) => tracing::warn!(error = %e, "summary not serializable"),
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let family: AlgorithmFamily = args.next().as_deref().unwrap_or("ns").parse()?;
    let trials: usize = args.next().as_deref().unwrap_or("50").parse()?;

    let horizon = 6000;
    let n_phases = 4;
    let config = ExperimentConfig::default()
        .with_n_arms(11)
        .with_time_horizon(horizon)
        .with_n_phases(n_phases)
        .with_n_experiments(trials)
        .with_window_size(Some(suggested_window_size(horizon, n_phases - 1)))
        .with_seed(2019);

    // Summer demand for the stationary tables, all neighbourhoods averaged.
    let provider = StaticProvider::seasonal(2, None)?;
    let mut set = ExperimentSet::new(config, family, &provider)?;
    tracing::info!(
        optimum = ?set.optimum().aggregate(),
        window = ?config.window_size,
        "seasonal demand loaded"
    );

    let mut reporter = JsonReporter::default();
    set.run(&mut reporter)?;
    println!("{}", serde_json::to_string_pretty(&reporter.rows)?);
    Ok(())
}
