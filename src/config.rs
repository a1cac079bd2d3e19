use std::{collections::BTreeMap, path::PathBuf};

use anyhow::Result;
use strum::IntoEnumIterator;

use crate::{
    aggregate::CohortSelection,
    charts::ChartKind,
    cohort::{CohortMarkers, CohortRules},
    color::RgbColor,
    config_file::LoadConfigFile,
    crossing::CrossingAnalysis,
};

/// Direct representation of the bunnybench config file. All fields
/// are optional.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
#[serde(default)]
pub struct BenchConfig {
    /// Where the benchmark logs (`*.csv`) are read from
    pub data_dir: PathBuf,

    /// Where chart files are written to when saving
    pub output_dir: PathBuf,

    /// If true, write chart files instead of showing the charts on
    /// stdout
    pub save_to_files: bool,

    /// Display colour per language, `#rrggbb`
    pub lang_colors: BTreeMap<String, RgbColor>,

    /// Display colour per browser, `#rrggbb`, for browser names and
    /// rows keyed by browser
    pub browser_colors: BTreeMap<String, RgbColor>,

    /// Which cohorts to analyze together
    pub cohort_selection: CohortSelection,

    /// The file name substrings that assign files to cohorts
    pub markers: CohortMarkers,

    /// The frame rate whose crossing is marked
    pub threshold: f64,

    /// Crossings at smaller workloads than this are ignored
    pub lower_bound: f64,

    /// The browser for which heap usage is charted
    pub heap_browser: String,

    /// The charts to produce
    pub charts: Vec<ChartKind>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        let lang_colors = [
            ("Go", RgbColor::new(0x01, 0xae, 0xd8)),
            ("Rust", RgbColor::new(0xe4, 0x37, 0x15)),
            ("JS", RgbColor::new(0xf7, 0xdf, 0x1d)),
        ]
        .into_iter()
        .map(|(lang, color)| (lang.to_string(), color))
        .collect();
        let analysis = CrossingAnalysis::default();
        Self {
            data_dir: "./data".into(),
            output_dir: "./img".into(),
            save_to_files: false,
            lang_colors,
            browser_colors: BTreeMap::new(),
            cohort_selection: CohortSelection::default(),
            markers: CohortMarkers::default(),
            threshold: analysis.threshold,
            lower_bound: analysis.lower_bound,
            heap_browser: "Chromium".into(),
            charts: ChartKind::iter().collect(),
        }
    }
}

impl BenchConfig {
    pub fn cohort_rules(&self) -> CohortRules {
        (&self.markers).into()
    }

    pub fn crossing_analysis(&self) -> CrossingAnalysis {
        CrossingAnalysis {
            threshold: self.threshold,
            lower_bound: self.lower_bound,
            ..Default::default()
        }
    }
}

impl LoadConfigFile for BenchConfig {
    fn default_config_path_without_suffix() -> Result<Option<PathBuf>> {
        Ok(Some("./bunnybench".into()))
    }
}
