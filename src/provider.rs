//! Demand data: probability tables, the providers that serve them, and the optimum.
//!
//! A [`ProbabilityTable`] holds true conversion probabilities in one of four shapes,
//! matching [`EnvironmentKind`]. A [`ProbabilityProvider`] hands out a table plus the
//! price of each arm; [`StaticProvider`] keeps them in memory. [`Optimum`] is the
//! clairvoyant expected reward `max_i p_i * price_i` that regret is measured against.

use crate::{
    BernoulliEnvironment, ContextualEnvironment, EnvironmentKind, Error,
    PhasedContextualEnvironment, PhasedEnvironment, Result, RewardSource,
};

/// True conversion probabilities, shaped by environment kind.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProbabilityTable {
    /// `[arm]`
    Flat(Vec<f64>),
    /// `[phase][arm]`
    Phased(Vec<Vec<f64>>),
    /// `[context][arm]`
    Contextual(Vec<Vec<f64>>),
    /// `[context][phase][arm]`
    PhasedContextual(Vec<Vec<Vec<f64>>>),
}

fn check_row(row: &[f64], n_arms: usize) -> Result<()> {
    if row.len() != n_arms {
        return Err(Error::ShapeMismatch {
            what: "probability row",
            expected: n_arms,
            actual: row.len(),
        });
    }
    match row.iter().find(|p| !(0.0..=1.0).contains(*p)) {
        Some(&bad) => Err(Error::InvalidProbability { value: bad }),
        None => Ok(()),
    }
}

fn check_rows(rows: &[Vec<f64>], n_arms: usize) -> Result<()> {
    if rows.is_empty() {
        return Err(Error::ShapeMismatch {
            what: "probability rows",
            expected: 1,
            actual: 0,
        });
    }
    rows.iter().try_for_each(|r| check_row(r, n_arms))
}

fn best_value(row: &[f64], prices: &[f64]) -> f64 {
    row.iter()
        .zip(prices)
        .map(|(p, price)| p * price)
        .fold(0.0, f64::max)
}

fn mean_rows(rows: &[&Vec<f64>]) -> Vec<f64> {
    let n = rows.len() as f64;
    let width = rows.first().map_or(0, |r| r.len());
    (0..width)
        .map(|i| rows.iter().map(|r| r[i]).sum::<f64>() / n)
        .collect()
}

impl ProbabilityTable {
    pub fn kind(&self) -> EnvironmentKind {
        match self {
            ProbabilityTable::Flat(_) => EnvironmentKind::Stationary,
            ProbabilityTable::Phased(_) => EnvironmentKind::NonStationary,
            ProbabilityTable::Contextual(_) => EnvironmentKind::Contextual,
            ProbabilityTable::PhasedContextual(_) => EnvironmentKind::ContextualNonStationary,
        }
    }

    fn kind_name(kind: EnvironmentKind) -> &'static str {
        match kind {
            EnvironmentKind::Stationary => "flat",
            EnvironmentKind::NonStationary => "phased",
            EnvironmentKind::Contextual => "contextual",
            EnvironmentKind::ContextualNonStationary => "phased-contextual",
        }
    }

    /// Arm count of the first row (`0` for an empty table).
    pub fn n_arms(&self) -> usize {
        match self {
            ProbabilityTable::Flat(row) => row.len(),
            ProbabilityTable::Phased(rows) | ProbabilityTable::Contextual(rows) => {
                rows.first().map_or(0, |r| r.len())
            }
            ProbabilityTable::PhasedContextual(ctx) => ctx
                .first()
                .and_then(|phases| phases.first())
                .map_or(0, |r| r.len()),
        }
    }

    pub fn n_contexts(&self) -> usize {
        match self {
            ProbabilityTable::Contextual(rows) => rows.len(),
            ProbabilityTable::PhasedContextual(ctx) => ctx.len(),
            _ => 1,
        }
    }

    pub fn n_phases(&self) -> usize {
        match self {
            ProbabilityTable::Phased(rows) => rows.len(),
            ProbabilityTable::PhasedContextual(ctx) => ctx.first().map_or(0, |p| p.len()),
            _ => 1,
        }
    }

    /// Check every probability is in `[0, 1]` and every row has one entry per price.
    pub fn validate(&self, n_prices: usize) -> Result<()> {
        if n_prices == 0 {
            return Err(Error::NoArms);
        }
        if self.n_arms() != n_prices {
            return Err(Error::PriceCountMismatch {
                arms: self.n_arms(),
                prices: n_prices,
            });
        }
        match self {
            ProbabilityTable::Flat(row) => check_row(row, n_prices),
            ProbabilityTable::Phased(rows) => check_rows(rows, n_prices),
            ProbabilityTable::Contextual(rows) => {
                if rows.is_empty() {
                    return Err(Error::NoContexts);
                }
                check_rows(rows, n_prices)
            }
            ProbabilityTable::PhasedContextual(ctx) => {
                if ctx.is_empty() {
                    return Err(Error::NoContexts);
                }
                let n_phases = ctx[0].len();
                for phases in ctx {
                    if phases.len() != n_phases {
                        return Err(Error::ShapeMismatch {
                            what: "phases per context",
                            expected: n_phases,
                            actual: phases.len(),
                        });
                    }
                    check_rows(phases, n_prices)?;
                }
                Ok(())
            }
        }
    }

    /// Fail unless this table has the shape `kind` asks for.
    pub fn expect_kind(&self, kind: EnvironmentKind) -> Result<()> {
        if self.kind() == kind {
            Ok(())
        } else {
            Err(Error::TableKindMismatch {
                expected: Self::kind_name(kind),
                actual: Self::kind_name(self.kind()),
            })
        }
    }

    /// Build the matching environment; `phase_len` only matters for phased tables.
    pub fn build_source(&self, phase_len: u64) -> Result<Box<dyn RewardSource>> {
        Ok(match self {
            ProbabilityTable::Flat(row) => Box::new(BernoulliEnvironment::new(row.clone())?),
            ProbabilityTable::Phased(rows) => {
                Box::new(PhasedEnvironment::new(rows.clone(), phase_len)?)
            }
            ProbabilityTable::Contextual(rows) => {
                Box::new(ContextualEnvironment::new(rows.clone())?)
            }
            ProbabilityTable::PhasedContextual(ctx) => {
                Box::new(PhasedContextualEnvironment::new(ctx.clone(), phase_len)?)
            }
        })
    }

    /// Per-context phase rows: `[context][phase][arm]`, borrowed.
    fn context_phases(&self) -> Vec<Vec<&Vec<f64>>> {
        match self {
            ProbabilityTable::Flat(row) => vec![vec![row]],
            ProbabilityTable::Phased(rows) => vec![rows.iter().collect()],
            ProbabilityTable::Contextual(rows) => rows.iter().map(|r| vec![r]).collect(),
            ProbabilityTable::PhasedContextual(ctx) => {
                ctx.iter().map(|phases| phases.iter().collect()).collect()
            }
        }
    }

    /// Element-wise mean over contexts, one row per phase.
    pub fn aggregate(&self) -> Vec<Vec<f64>> {
        let per_ctx = self.context_phases();
        let n_phases = per_ctx.first().map_or(0, |p| p.len());
        (0..n_phases)
            .map(|phase| {
                let rows: Vec<&Vec<f64>> = per_ctx.iter().map(|p| p[phase]).collect();
                mean_rows(&rows)
            })
            .collect()
    }
}

/// Source of probability tables and arm prices.
pub trait ProbabilityProvider {
    /// Table of the requested shape plus one price per arm.
    fn probabilities(&self, kind: EnvironmentKind) -> Result<(ProbabilityTable, Vec<f64>)>;
}

/// In-memory provider: one table per environment kind, shared prices.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StaticProvider {
    prices: Vec<f64>,
    tables: Vec<ProbabilityTable>,
}

impl StaticProvider {
    pub fn new(prices: Vec<f64>) -> Result<Self> {
        if prices.is_empty() {
            return Err(Error::NoArms);
        }
        if let Some(&bad) = prices.iter().find(|p| !p.is_finite() || **p < 0.0) {
            return Err(Error::InvalidPrice { value: bad });
        }
        Ok(Self {
            prices,
            tables: Vec::new(),
        })
    }

    /// Add (or replace) the table for its kind.
    pub fn with_table(mut self, table: ProbabilityTable) -> Result<Self> {
        table.validate(self.prices.len())?;
        self.tables.retain(|t| t.kind() != table.kind());
        self.tables.push(table);
        Ok(self)
    }

    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    /// Seasonal city demand: three neighbourhoods, four seasons, prices `0..=10`.
    ///
    /// Stationary and contextual tables use season `season`; the phased tables use all
    /// four seasons. Non-contextual tables use neighbourhood `context`, except that the
    /// stationary and phased tables are built from the element-wise mean over
    /// neighbourhoods when `context` is `None`.
    pub fn seasonal(season: usize, context: Option<usize>) -> Result<Self> {
        let curves = seasonal_curves();
        let n_seasons = curves[0].len();
        if season >= n_seasons {
            return Err(Error::ShapeMismatch {
                what: "season index",
                expected: n_seasons,
                actual: season,
            });
        }
        let full = ProbabilityTable::PhasedContextual(curves.clone());
        let phased = match context {
            Some(c) => curves
                .get(c)
                .cloned()
                .ok_or(Error::ShapeMismatch {
                    what: "context index",
                    expected: curves.len(),
                    actual: c,
                })?,
            None => full.aggregate(),
        };
        let flat = phased[season].clone();
        let contextual: Vec<Vec<f64>> = curves.iter().map(|c| c[season].clone()).collect();

        let prices = (0..=10).map(f64::from).collect();
        Self::new(prices)?
            .with_table(ProbabilityTable::Flat(flat))?
            .with_table(ProbabilityTable::Phased(phased))?
            .with_table(ProbabilityTable::Contextual(contextual))?
            .with_table(full)
    }
}

impl ProbabilityProvider for StaticProvider {
    fn probabilities(&self, kind: EnvironmentKind) -> Result<(ProbabilityTable, Vec<f64>)> {
        let table = self
            .tables
            .iter()
            .find(|t| t.kind() == kind)
            .ok_or(Error::TableKindMismatch {
                expected: ProbabilityTable::kind_name(kind),
                actual: "none",
            })?;
        Ok((table.clone(), self.prices.clone()))
    }
}

/// `[context][season][price]` conversion rates for prices `0..=10`.
fn seasonal_curves() -> Vec<Vec<Vec<f64>>> {
    vec![
        vec![
            vec![1.0, 0.80, 0.65, 0.54, 0.43, 0.38, 0.21, 0.07, 0.01, 0.005, 0.0],
            vec![1.0, 0.95, 0.90, 0.80, 0.70, 0.60, 0.45, 0.40, 0.20, 0.10, 0.0],
            vec![1.0, 0.95, 0.90, 0.80, 0.68, 0.50, 0.30, 0.10, 0.06, 0.03, 0.0],
            vec![1.0, 0.72, 0.54, 0.47, 0.42, 0.40, 0.35, 0.31, 0.26, 0.12, 0.0],
        ],
        vec![
            vec![1.0, 0.86, 0.78, 0.75, 0.64, 0.53, 0.32, 0.20, 0.10, 0.05, 0.0],
            vec![1.0, 0.95, 0.90, 0.76, 0.61, 0.52, 0.45, 0.30, 0.15, 0.10, 0.0],
            vec![1.0, 0.99, 0.92, 0.86, 0.72, 0.66, 0.54, 0.42, 0.20, 0.10, 0.0],
            vec![1.0, 0.60, 0.54, 0.46, 0.40, 0.32, 0.31, 0.24, 0.12, 0.05, 0.0],
        ],
        vec![
            vec![1.0, 0.80, 0.70, 0.60, 0.50, 0.40, 0.30, 0.20, 0.10, 0.005, 0.0],
            vec![1.0, 0.85, 0.80, 0.66, 0.40, 0.37, 0.31, 0.26, 0.12, 0.08, 0.0],
            vec![1.0, 0.50, 0.35, 0.22, 0.15, 0.07, 0.02, 0.009, 0.005, 0.001, 0.0],
            vec![1.0, 0.85, 0.80, 0.66, 0.40, 0.37, 0.31, 0.26, 0.12, 0.08, 0.0],
        ],
    ]
}

/// Clairvoyant expected reward per phase, aggregate and per context.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Optimum {
    aggregate: Vec<f64>,
    per_context: Vec<Vec<f64>>,
}

impl Optimum {
    pub fn new(table: &ProbabilityTable, prices: &[f64]) -> Result<Self> {
        table.validate(prices.len())?;
        let aggregate = table
            .aggregate()
            .iter()
            .map(|row| best_value(row, prices))
            .collect();
        let per_context = table
            .context_phases()
            .iter()
            .map(|phases| phases.iter().map(|row| best_value(row, prices)).collect())
            .collect();
        Ok(Self {
            aggregate,
            per_context,
        })
    }

    /// Optimal value per phase for the aggregate demand curve.
    pub fn aggregate(&self) -> &[f64] {
        &self.aggregate
    }

    /// `[context][phase]` optimal values.
    pub fn per_context(&self) -> &[Vec<f64>] {
        &self.per_context
    }

    pub fn n_phases(&self) -> usize {
        self.aggregate.len()
    }

    fn phase_of(&self, round: usize, phase_len: usize) -> usize {
        (round / phase_len.max(1)) % self.n_phases().max(1)
    }

    /// Aggregate optimum at `round` (0-based) when phases last `phase_len` rounds.
    pub fn aggregate_at(&self, round: usize, phase_len: usize) -> f64 {
        self.aggregate[self.phase_of(round, phase_len)]
    }

    /// Optimum for `context` at `round`.
    ///
    /// # Panics
    ///
    /// Panics if `context` is out of range.
    pub fn context_at(&self, context: usize, round: usize, phase_len: usize) -> f64 {
        self.per_context[context][self.phase_of(round, phase_len)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optimum_picks_best_price_weighted_probability() {
        let t = ProbabilityTable::Flat(vec![0.9, 0.1]);
        let o = Optimum::new(&t, &[1.0, 5.0]).unwrap();
        assert!((o.aggregate()[0] - 0.9).abs() < 1e-12);
        assert_eq!(o.per_context().len(), 1);
    }

    #[test]
    fn contextual_optimum_aggregates_by_mean() {
        let t = ProbabilityTable::Contextual(vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        let o = Optimum::new(&t, &[1.0, 2.0]).unwrap();
        // Mean curve [0.5, 0.5] -> best 0.5 * 2.
        assert!((o.aggregate()[0] - 1.0).abs() < 1e-12);
        assert_eq!(o.per_context(), &[vec![1.0], vec![2.0]]);
        assert_eq!(o.context_at(1, 999, 10), 2.0);
    }

    #[test]
    fn phased_optimum_cycles_by_round() {
        let t = ProbabilityTable::Phased(vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        let o = Optimum::new(&t, &[1.0, 3.0]).unwrap();
        assert_eq!(o.aggregate_at(0, 5), 1.0);
        assert_eq!(o.aggregate_at(5, 5), 3.0);
        assert_eq!(o.aggregate_at(10, 5), 1.0);
    }

    #[test]
    fn validation_catches_bad_tables() {
        let t = ProbabilityTable::Flat(vec![0.5, 0.5]);
        assert_eq!(
            t.validate(3).unwrap_err(),
            Error::PriceCountMismatch { arms: 2, prices: 3 }
        );
        let t = ProbabilityTable::Phased(vec![vec![0.5, 0.5], vec![0.5]]);
        assert!(matches!(t.validate(2), Err(Error::ShapeMismatch { .. })));
        let t = ProbabilityTable::Contextual(vec![vec![0.5, -0.1]]);
        assert_eq!(
            t.validate(2).unwrap_err(),
            Error::InvalidProbability { value: -0.1 }
        );
    }

    #[test]
    fn static_provider_serves_by_kind() {
        let p = StaticProvider::new(vec![1.0, 2.0])
            .unwrap()
            .with_table(ProbabilityTable::Flat(vec![0.3, 0.2]))
            .unwrap();
        let (t, prices) = p.probabilities(EnvironmentKind::Stationary).unwrap();
        assert_eq!(t, ProbabilityTable::Flat(vec![0.3, 0.2]));
        assert_eq!(prices, vec![1.0, 2.0]);
        assert!(matches!(
            p.probabilities(EnvironmentKind::Contextual),
            Err(Error::TableKindMismatch { .. })
        ));
    }

    #[test]
    fn seasonal_provider_covers_every_kind() {
        let p = StaticProvider::seasonal(2, None).unwrap();
        for kind in [
            EnvironmentKind::Stationary,
            EnvironmentKind::NonStationary,
            EnvironmentKind::Contextual,
            EnvironmentKind::ContextualNonStationary,
        ] {
            let (t, prices) = p.probabilities(kind).unwrap();
            assert_eq!(t.kind(), kind);
            assert_eq!(prices.len(), 11);
            t.expect_kind(kind).unwrap();
        }
        let (t, _) = p.probabilities(EnvironmentKind::ContextualNonStationary).unwrap();
        assert_eq!((t.n_contexts(), t.n_phases()), (3, 4));
        assert!(StaticProvider::seasonal(4, None).is_err());
        assert!(StaticProvider::seasonal(0, Some(3)).is_err());
    }
}
