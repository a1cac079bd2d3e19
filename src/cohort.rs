//! Routing of input files into cohorts, purely by file name.

use std::path::Path;

use kstring::KString;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

/// A partition of benchmark runs that were collected in the same
/// context.
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
#[strum(serialize_all = "kebab_case")]
#[serde(rename_all = "kebab-case")]
pub enum Cohort {
    /// The regular desktop runs, i.e. no marker matched
    Default,
    Laptop,
    /// Built with the low optimization setting
    OptLow,
    /// Built with the high optimization setting
    OptHigh,
}

/// The substrings looked for in file names.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
#[serde(default)]
pub struct CohortMarkers {
    pub laptop: String,
    pub opt_low: String,
    pub opt_high: String,
}

impl Default for CohortMarkers {
    fn default() -> Self {
        Self {
            laptop: "laptop".into(),
            opt_low: "opt_low".into(),
            opt_high: "opt_high".into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CohortRule {
    pub marker: KString,
    pub cohort: Cohort,
}

/// Ordered list of rules, the first rule whose marker is contained in
/// the file name wins; if none matches, the file belongs to
/// `Cohort::Default`.
#[derive(Debug, Clone)]
pub struct CohortRules {
    rules: Vec<CohortRule>,
}

impl CohortRules {
    pub fn new(rules: Vec<CohortRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[CohortRule] {
        &self.rules
    }

    pub fn classify_file_name(&self, file_name: &str) -> Cohort {
        self.rules
            .iter()
            .find(|rule| file_name.contains(rule.marker.as_str()))
            .map(|rule| rule.cohort)
            .unwrap_or(Cohort::Default)
    }

    /// Only the last path segment is considered; directory names
    /// containing a marker have no effect.
    pub fn classify(&self, path: &Path) -> Cohort {
        match path.file_name() {
            Some(file_name) => self.classify_file_name(&file_name.to_string_lossy()),
            None => Cohort::Default,
        }
    }
}

impl From<&CohortMarkers> for CohortRules {
    fn from(markers: &CohortMarkers) -> Self {
        let CohortMarkers {
            laptop,
            opt_low,
            opt_high,
        } = markers;
        CohortRules::new(vec![
            CohortRule {
                marker: KString::from_ref(laptop),
                cohort: Cohort::Laptop,
            },
            CohortRule {
                marker: KString::from_ref(opt_low),
                cohort: Cohort::OptLow,
            },
            CohortRule {
                marker: KString::from_ref(opt_high),
                cohort: Cohort::OptHigh,
            },
        ])
    }
}

impl Default for CohortRules {
    fn default() -> Self {
        (&CohortMarkers::default()).into()
    }
}
