//! The data of one pipeline run, loaded once and handed to every
//! stage.

use anyhow::Result;

use crate::{
    aggregate::{CohortSelection, CohortSets, UnifiedTable},
    charts::{ChartInput, ChartKind, ChartRegistry, Renderer},
    config::BenchConfig,
    crossing::{CrossingAnalysis, CrossingEvent},
    info,
    record::Dimension,
    summary::{MetricSpec, SummaryTable},
    warn,
};

pub struct PipelineContext {
    pub selection: CohortSelection,
    pub cohort_sets: CohortSets,
    pub table: UnifiedTable,
    pub analysis: CrossingAnalysis,
    pub crossings: Vec<CrossingEvent>,
    pub heap_browser: String,
}

impl PipelineContext {
    /// Reads all input files named by `config`, then builds the
    /// unified table and the crossing events. Fails if there are no
    /// input files, or one can't be read.
    pub fn load(config: &BenchConfig) -> Result<Self> {
        let cohort_sets = CohortSets::load(&config.data_dir, &config.cohort_rules())?;
        Ok(Self::from_cohort_sets(config, cohort_sets))
    }

    /// Builds the context from already loaded data.
    pub fn from_cohort_sets(config: &BenchConfig, cohort_sets: CohortSets) -> Self {
        let selection = config.cohort_selection;
        let table = cohort_sets.unified(selection);
        info!(
            "unified table for {selection} has {} records",
            table.len()
        );
        let analysis = config.crossing_analysis();
        let crossings = analysis.events(&table, selection.group_dimensions());
        Self {
            selection,
            cohort_sets,
            table,
            analysis,
            crossings,
            heap_browser: config.heap_browser.clone(),
        }
    }

    pub fn dimensions(&self) -> &'static [Dimension] {
        self.selection.group_dimensions()
    }

    pub fn chart_input(&self) -> ChartInput<'_> {
        ChartInput {
            table: &self.table,
            dimensions: self.dimensions(),
            crossings: &self.crossings,
            analysis: self.analysis,
            heap_browser: &self.heap_browser,
        }
    }

    pub fn summary(&self, dimensions: &[Dimension], specs: &[MetricSpec]) -> SummaryTable {
        SummaryTable::new(&self.table, dimensions, specs)
    }

    /// Prepares and renders each of `charts`, in the given order.
    /// Returns the charts that were rendered; those without data are
    /// skipped with a warning.
    pub fn render_charts(
        &self,
        registry: &ChartRegistry,
        charts: &[ChartKind],
        renderer: &mut dyn Renderer,
    ) -> Result<Vec<ChartKind>> {
        let input = self.chart_input();
        let mut rendered = Vec::new();
        for kind in charts {
            match registry.prepare(*kind, &input)? {
                Some(chart) => {
                    renderer.render(&chart)?;
                    rendered.push(*kind);
                }
                None => warn!("no data for chart {kind}, skipping it"),
            }
        }
        Ok(rendered)
    }
}
