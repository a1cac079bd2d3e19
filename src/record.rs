//! One row of a benchmark log, and the keys to group rows by.

use std::fmt;

use kstring::KString;
use smallvec::SmallVec;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::cohort::Cohort;

/// The numeric columns of a benchmark log. `Bunnies` is the
/// independent variable (workload), the others are measurements.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    serde::Serialize,
    serde::Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NumericField {
    Bunnies,
    FpsJs,
    FpsGame,
    Tps,
    AvgFrame,
    MinFrame,
    MaxFrame,
    HeapMb,
    WasmExecMs,
    ClickLatencyMs,
}

const NUM_NUMERIC_FIELDS: usize = NumericField::ClickLatencyMs as usize + 1;

impl NumericField {
    pub fn column_name(self) -> &'static str {
        self.into()
    }

    /// Short unit label for table headers
    pub fn unit(self) -> Option<&'static str> {
        use NumericField::*;
        match self {
            Bunnies => None,
            FpsJs | FpsGame => Some("fps"),
            Tps => Some("ticks/s"),
            AvgFrame | MinFrame | MaxFrame | WasmExecMs | ClickLatencyMs => Some("ms"),
            HeapMb => Some("MB"),
        }
    }
}

/// The categorical columns that rows can be grouped by.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    EnumIter,
    serde::Serialize,
    serde::Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Lang,
    Browser,
    /// Derived, only set when two optimization cohorts are merged
    OptLevel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    /// Position in the containing record set or unified table
    pub index: usize,
    pub lang: Option<KString>,
    pub browser: Option<KString>,
    /// The cohort this record was tagged with when merged
    pub opt_level: Option<Cohort>,
    values: [Option<f64>; NUM_NUMERIC_FIELDS],
}

impl RunRecord {
    pub fn new(index: usize, lang: Option<KString>, browser: Option<KString>) -> Self {
        Self {
            index,
            lang,
            browser,
            opt_level: None,
            values: [None; NUM_NUMERIC_FIELDS],
        }
    }

    /// Builder style setter, mostly for constructing test data.
    pub fn with(mut self, field: NumericField, value: f64) -> Self {
        self.set(field, Some(value));
        self
    }

    #[inline]
    pub fn get(&self, field: NumericField) -> Option<f64> {
        self.values[field as usize]
    }

    #[inline]
    pub fn set(&mut self, field: NumericField, value: Option<f64>) {
        self.values[field as usize] = value;
    }

    pub fn bunnies(&self) -> Option<f64> {
        self.get(NumericField::Bunnies)
    }

    pub fn dimension(&self, dimension: Dimension) -> Option<&str> {
        match dimension {
            Dimension::Lang => self.lang.as_deref(),
            Dimension::Browser => self.browser.as_deref(),
            Dimension::OptLevel => self.opt_level.map(<&'static str>::from),
        }
    }

    /// None if any of the dimensions has no value in this record; such
    /// records do not participate in grouping.
    pub fn group_key(&self, dimensions: &[Dimension]) -> Option<GroupKey> {
        dimensions
            .iter()
            .map(|d| self.dimension(*d).map(KString::from_ref))
            .collect::<Option<SmallVec<_>>>()
            .map(GroupKey)
    }
}

/// The values of the grouping dimensions of a group, in the order the
/// dimensions were given. Ordered lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey(pub SmallVec<[KString; 3]>);

impl GroupKey {
    pub fn values(&self) -> &[KString] {
        &self.0
    }

    /// Look up the value for `dimension`, given the dimensions the key
    /// was built with.
    pub fn get(&self, dimensions: &[Dimension], dimension: Dimension) -> Option<&str> {
        let i = dimensions.iter().position(|d| *d == dimension)?;
        self.0.get(i).map(|s| s.as_str())
    }
}

impl<'s> FromIterator<&'s str> for GroupKey {
    fn from_iter<T: IntoIterator<Item = &'s str>>(iter: T) -> Self {
        GroupKey(iter.into_iter().map(KString::from_ref).collect())
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut is_first = true;
        for val in &self.0 {
            if !is_first {
                f.write_str(" / ")?;
            }
            f.write_str(val)?;
            is_first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn t_column_names() {
        let names: Vec<&str> = NumericField::iter().map(NumericField::column_name).collect();
        assert_eq!(
            names,
            [
                "bunnies",
                "fps_js",
                "fps_game",
                "tps",
                "avg_frame",
                "min_frame",
                "max_frame",
                "heap_mb",
                "wasm_exec_ms",
                "click_latency_ms"
            ]
        );
        assert_eq!(NumericField::iter().count(), NUM_NUMERIC_FIELDS);
        assert_eq!(
            "heap_mb".parse::<NumericField>().unwrap(),
            NumericField::HeapMb
        );
    }

    #[test]
    fn t_group_key() {
        let mut r = RunRecord::new(0, Some("Rust".into()), Some("Firefox".into()));
        let dims = [Dimension::Lang, Dimension::Browser];
        let key = r.group_key(&dims).unwrap();
        assert_eq!(key, ["Rust", "Firefox"].into_iter().collect::<GroupKey>());
        assert_eq!(key.get(&dims, Dimension::Browser), Some("Firefox"));
        assert_eq!(key.to_string(), "Rust / Firefox");

        let dims3 = [Dimension::Lang, Dimension::Browser, Dimension::OptLevel];
        assert_eq!(r.group_key(&dims3), None);
        r.opt_level = Some(Cohort::OptHigh);
        assert_eq!(
            r.group_key(&dims3),
            Some(["Rust", "Firefox", "opt-high"].into_iter().collect::<GroupKey>())
        );

        let r = RunRecord::new(1, None, Some("Firefox".into()));
        assert_eq!(r.group_key(&dims), None);
    }

    #[test]
    fn t_values() {
        let r = RunRecord::new(0, None, None)
            .with(NumericField::Bunnies, 1500.)
            .with(NumericField::FpsGame, 61.5);
        assert_eq!(r.bunnies(), Some(1500.));
        assert_eq!(r.get(NumericField::FpsGame), Some(61.5));
        assert_eq!(r.get(NumericField::Tps), None);
    }
}
