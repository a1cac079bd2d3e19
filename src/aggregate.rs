//! Combining the record sets of one or more cohorts into the single
//! table that all analysis runs on.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
};

use anyhow::Result;
use kstring::KString;
use strum_macros::{Display, EnumIter, EnumString};

use crate::{
    cohort::{Cohort, CohortRules},
    info,
    load::{RecordSet, list_input_files},
    record::{Dimension, GroupKey, NumericField, RunRecord},
    warn,
};

/// Which cohorts feed the unified table.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Display,
    EnumString,
    EnumIter,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum CohortSelection {
    #[default]
    #[strum(serialize = "default-only")]
    #[serde(rename = "default-only")]
    DefaultOnly,
    #[strum(serialize = "default+opt-low")]
    #[serde(rename = "default+opt-low")]
    DefaultPlusOptLow,
    #[strum(serialize = "default+opt-high")]
    #[serde(rename = "default+opt-high")]
    DefaultPlusOptHigh,
    #[strum(serialize = "laptop-only")]
    #[serde(rename = "laptop-only")]
    LaptopOnly,
}

impl CohortSelection {
    /// In concatenation order.
    pub fn cohorts(self) -> &'static [Cohort] {
        match self {
            CohortSelection::DefaultOnly => &[Cohort::Default],
            CohortSelection::DefaultPlusOptLow => &[Cohort::Default, Cohort::OptLow],
            CohortSelection::DefaultPlusOptHigh => &[Cohort::Default, Cohort::OptHigh],
            CohortSelection::LaptopOnly => &[Cohort::Laptop],
        }
    }

    /// Whether records are tagged with their cohort of origin, which
    /// is the case when optimization levels are being compared.
    pub fn tags_origin(self) -> bool {
        match self {
            CohortSelection::DefaultOnly | CohortSelection::LaptopOnly => false,
            CohortSelection::DefaultPlusOptLow | CohortSelection::DefaultPlusOptHigh => true,
        }
    }

    /// The dimensions that identify one curve.
    pub fn group_dimensions(self) -> &'static [Dimension] {
        if self.tags_origin() {
            &[Dimension::Lang, Dimension::Browser, Dimension::OptLevel]
        } else {
            &[Dimension::Lang, Dimension::Browser]
        }
    }
}

/// The loaded record sets, by cohort. Each cohort's sets are kept in
/// the order the files were read.
#[derive(Debug, Default)]
pub struct CohortSets {
    sets: BTreeMap<Cohort, Vec<RecordSet>>,
}

impl CohortSets {
    /// Classifies and reads every CSV file in `dir`. Fails if there
    /// are none, or if any of them can't be parsed.
    pub fn load(dir: &Path, rules: &CohortRules) -> Result<Self> {
        let mut slf = Self::default();
        for file in list_input_files(dir, rules)? {
            let set = RecordSet::read_file(&file.path)?;
            slf.push(file.cohort, set);
        }
        info!(
            "loaded {} files with {} records from {dir:?}",
            slf.num_files(),
            slf.num_records()
        );
        Ok(slf)
    }

    pub fn push(&mut self, cohort: Cohort, set: RecordSet) {
        self.sets.entry(cohort).or_default().push(set);
    }

    pub fn cohort(&self, cohort: Cohort) -> &[RecordSet] {
        self.sets.get(&cohort).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn num_files(&self) -> usize {
        self.sets.values().map(|v| v.len()).sum()
    }

    pub fn num_records(&self) -> usize {
        self.sets.values().flatten().map(|s| s.len()).sum()
    }

    pub fn unified(&self, selection: CohortSelection) -> UnifiedTable {
        let tag = selection.tags_origin();
        let sources = selection.cohorts().iter().map(|cohort| {
            let sets = self.cohort(*cohort);
            if sets.is_empty() {
                warn!("cohort {cohort} selected via {selection} has no input files");
            }
            (sets, tag.then_some(*cohort))
        });
        UnifiedTable::concat(sources)
    }
}

/// All records of the selected cohorts. Not modified after
/// construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnifiedTable {
    records: Vec<RunRecord>,
}

impl UnifiedTable {
    /// Renumbers the `index` of the given records contiguously.
    pub fn from_records(records: impl IntoIterator<Item = RunRecord>) -> Self {
        let records = records
            .into_iter()
            .enumerate()
            .map(|(index, mut record)| {
                record.index = index;
                record
            })
            .collect();
        Self { records }
    }

    /// Concatenates the record sets of each source in the given
    /// order, keeping the row order within each set. No deduplication
    /// happens. If a source comes with a cohort, its records are
    /// tagged with it (`Dimension::OptLevel`).
    pub fn concat<'s>(
        sources: impl IntoIterator<Item = (&'s [RecordSet], Option<Cohort>)>,
    ) -> Self {
        Self::from_records(sources.into_iter().flat_map(|(sets, tag)| {
            sets.iter().flat_map(|set| &set.records).map(move |record| {
                let mut record = record.clone();
                if let Some(cohort) = tag {
                    record.opt_level = Some(cohort);
                }
                record
            })
        }))
    }

    pub fn records(&self) -> &[RunRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether any record has a value for `field`.
    pub fn has_data(&self, field: NumericField) -> bool {
        self.records.iter().any(|r| r.get(field).is_some())
    }

    /// The distinct values of `dimension` in order of first
    /// appearance; records without a value are skipped.
    pub fn unique(&self, dimension: Dimension) -> Vec<KString> {
        let mut seen = BTreeSet::new();
        let mut vals = Vec::new();
        for record in &self.records {
            if let Some(val) = record.dimension(dimension) {
                if seen.insert(val) {
                    vals.push(KString::from_ref(val));
                }
            }
        }
        vals
    }

    /// Records that have values for all `dimensions`, grouped by them,
    /// in table order within each group.
    pub fn group_by(&self, dimensions: &[Dimension]) -> BTreeMap<GroupKey, Vec<&RunRecord>> {
        let mut groups: BTreeMap<GroupKey, Vec<&RunRecord>> = BTreeMap::new();
        for record in &self.records {
            if let Some(key) = record.group_key(dimensions) {
                groups.entry(key).or_default().push(record);
            }
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(name: &str, lang: &str, bunnies: &[f64]) -> RecordSet {
        RecordSet {
            path: Path::new(name).into(),
            records: bunnies
                .iter()
                .enumerate()
                .map(|(i, b)| {
                    RunRecord::new(i, Some(KString::from_ref(lang)), Some("Firefox".into()))
                        .with(NumericField::Bunnies, *b)
                })
                .collect(),
        }
    }

    fn bunnies(table: &UnifiedTable) -> Vec<f64> {
        table.records().iter().filter_map(|r| r.bunnies()).collect()
    }

    #[test]
    fn t_concat_preserves_order() {
        let a = [set("a1", "Go", &[3., 1.]), set("a2", "Go", &[2.])];
        let b = [set("b1", "Rust", &[9., 8., 7.])];
        let table = UnifiedTable::concat([(&a[..], None), (&b[..], None)]);
        assert_eq!(table.len(), 6);
        assert_eq!(bunnies(&table), [3., 1., 2., 9., 8., 7.]);
        let indices: Vec<usize> = table.records().iter().map(|r| r.index).collect();
        assert_eq!(indices, [0, 1, 2, 3, 4, 5]);
        assert!(table.records().iter().all(|r| r.opt_level.is_none()));
    }

    #[test]
    fn t_no_deduplication() {
        let a = [set("a", "Go", &[1., 2.])];
        let table = UnifiedTable::concat([(&a[..], None), (&a[..], None)]);
        assert_eq!(bunnies(&table), [1., 2., 1., 2.]);
    }

    #[test]
    fn t_selection_tags_origin() {
        let mut sets = CohortSets::default();
        sets.push(Cohort::OptLow, set("low", "Go", &[5.]));
        sets.push(Cohort::Default, set("def", "Go", &[1., 2.]));
        sets.push(Cohort::Laptop, set("lap", "Go", &[100.]));

        let table = sets.unified(CohortSelection::DefaultPlusOptLow);
        assert_eq!(bunnies(&table), [1., 2., 5.]);
        let tags: Vec<_> = table.records().iter().map(|r| r.opt_level).collect();
        assert_eq!(
            tags,
            [Some(Cohort::Default), Some(Cohort::Default), Some(Cohort::OptLow)]
        );

        let table = sets.unified(CohortSelection::DefaultOnly);
        assert_eq!(bunnies(&table), [1., 2.]);
        assert_eq!(table.records()[0].opt_level, None);

        let table = sets.unified(CohortSelection::LaptopOnly);
        assert_eq!(bunnies(&table), [100.]);

        // No opt-high files: only the default rows
        let table = sets.unified(CohortSelection::DefaultPlusOptHigh);
        assert_eq!(bunnies(&table), [1., 2.]);
    }

    #[test]
    fn t_unique_and_group_by() {
        let table = UnifiedTable::from_records([
            RunRecord::new(0, Some("Rust".into()), Some("Firefox".into())),
            RunRecord::new(0, Some("Go".into()), Some("Chromium".into())),
            RunRecord::new(0, Some("Rust".into()), Some("Chromium".into())),
            RunRecord::new(0, None, Some("Chromium".into())),
        ]);
        let unique = |d| -> Vec<String> {
            table.unique(d).iter().map(|s| s.to_string()).collect()
        };
        assert_eq!(unique(Dimension::Lang), ["Rust", "Go"]);
        assert_eq!(unique(Dimension::Browser), ["Firefox", "Chromium"]);

        let groups = table.group_by(&[Dimension::Lang, Dimension::Browser]);
        let keys: Vec<String> = groups.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, ["Go / Chromium", "Rust / Chromium", "Rust / Firefox"]);
        assert_eq!(groups.values().map(|v| v.len()).sum::<usize>(), 3);
    }

    #[test]
    fn t_selection_names() {
        assert_eq!(
            "default+opt-high".parse::<CohortSelection>().unwrap(),
            CohortSelection::DefaultPlusOptHigh
        );
        assert_eq!(CohortSelection::LaptopOnly.to_string(), "laptop-only");
    }
}
