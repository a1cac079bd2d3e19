//! Group-wise reductions (max, mean) of numeric fields.

use std::{fmt, str::FromStr};

use anyhow::{Context, anyhow, bail};
use strum_macros::{Display, EnumString};

use crate::{
    aggregate::UnifiedTable,
    join::{KeyVal, keyval_outer_join},
    record::{Dimension, GroupKey, NumericField},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum Reduction {
    #[strum(to_string = "max", serialize = "Max")]
    Max,
    #[strum(
        to_string = "mean",
        serialize = "Mean",
        serialize = "avg",
        serialize = "average"
    )]
    Mean,
}

impl Reduction {
    /// None for an empty sequence.
    pub fn reduce(self, values: impl IntoIterator<Item = f64>) -> Option<f64> {
        let mut values = values.into_iter();
        let first = values.next()?;
        match self {
            Reduction::Max => Some(values.fold(first, f64::max)),
            Reduction::Mean => {
                let (sum, n) = values.fold((first, 1usize), |(sum, n), v| (sum + v, n + 1));
                Some(sum / n as f64)
            }
        }
    }
}

/// A field together with how to reduce it, written as
/// `field:reduction`, e.g. `bunnies:max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricSpec {
    pub field: NumericField,
    pub reduction: Reduction,
}

impl MetricSpec {
    pub fn new(field: NumericField, reduction: Reduction) -> Self {
        Self { field, reduction }
    }
}

impl fmt::Display for MetricSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field, self.reduction)
    }
}

impl FromStr for MetricSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((field, reduction)) = s.split_once(':') else {
            bail!("expecting `field:reduction`, e.g. `fps_game:mean`, got {s:?}")
        };
        Ok(Self {
            field: field
                .parse()
                .with_context(|| anyhow!("unknown field {field:?}"))?,
            reduction: reduction
                .parse()
                .with_context(|| anyhow!("expecting `max` or `mean`, got {reduction:?}"))?,
        })
    }
}

/// The result for one metric: one row per group that has at least one
/// value for the field, in group key order.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSummary {
    pub spec: MetricSpec,
    pub rows: Vec<KeyVal<GroupKey, f64>>,
}

pub fn summarize_one(
    table: &UnifiedTable,
    dimensions: &[Dimension],
    spec: MetricSpec,
) -> MetricSummary {
    let rows = table
        .group_by(dimensions)
        .into_iter()
        .filter_map(|(key, records)| {
            let val = spec
                .reduction
                .reduce(records.iter().filter_map(|r| r.get(spec.field)))?;
            Some(KeyVal { key, val })
        })
        .collect();
    MetricSummary { spec, rows }
}

pub fn summarize(
    table: &UnifiedTable,
    dimensions: &[Dimension],
    specs: &[MetricSpec],
) -> Vec<MetricSummary> {
    specs
        .iter()
        .map(|spec| summarize_one(table, dimensions, *spec))
        .collect()
}

/// Several metric summaries side by side; a cell is None where a
/// group has no values for that metric.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryTable {
    pub dimensions: Vec<Dimension>,
    pub specs: Vec<MetricSpec>,
    pub rows: Vec<KeyVal<GroupKey, Vec<Option<f64>>>>,
}

impl SummaryTable {
    pub fn new(table: &UnifiedTable, dimensions: &[Dimension], specs: &[MetricSpec]) -> Self {
        let summaries = summarize(table, dimensions, specs);
        let rows = keyval_outer_join(summaries.into_iter().map(|s| s.rows).collect());
        Self {
            dimensions: dimensions.to_owned(),
            specs: specs.to_owned(),
            rows,
        }
    }

    /// Keep only the rows that have a value for every metric.
    pub fn complete_rows(&self) -> impl Iterator<Item = KeyVal<&GroupKey, Vec<f64>>> {
        self.rows.iter().filter_map(|KeyVal { key, val }| {
            let vals = val.iter().copied().collect::<Option<Vec<f64>>>()?;
            Some(KeyVal { key, val: vals })
        })
    }
}
