//! The visualizations that can be produced from a unified table, as a
//! registry mapping each chart name to a function that prepares its
//! data. Drawing is left to a `Renderer`.

use std::collections::BTreeMap;

use anyhow::{Result, bail};
use kstring::KString;
use noisy_float::types::R64;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{
    aggregate::UnifiedTable,
    crossing::{CrossingAnalysis, CrossingEvent},
    distribution::BoxStats,
    output_table::ColumnHeader,
    record::{Dimension, GroupKey, NumericField, RunRecord},
    summary::{MetricSpec, Reduction, SummaryTable},
};

/// The charts, named as their output artifacts.
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
pub enum ChartKind {
    #[strum(serialize = "FPS_vs_Bunnies")]
    #[serde(rename = "FPS_vs_Bunnies")]
    FpsVsBunnies,
    #[strum(serialize = "Max_Bunnies")]
    #[serde(rename = "Max_Bunnies")]
    MaxBunnies,
    #[strum(serialize = "TPS_Stability")]
    #[serde(rename = "TPS_Stability")]
    TpsStability,
    #[strum(serialize = "Frame_Time_Distribution")]
    #[serde(rename = "Frame_Time_Distribution")]
    FrameTimeDistribution,
    #[strum(serialize = "Heap_Usage")]
    #[serde(rename = "Heap_Usage")]
    HeapUsage,
    #[strum(serialize = "Click_Latency")]
    #[serde(rename = "Click_Latency")]
    ClickLatency,
    #[strum(serialize = "Radar_Chart")]
    #[serde(rename = "Radar_Chart")]
    RadarChart,
}

impl ChartKind {
    pub fn name(self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(KString),
    /// A browser name, coloured as that browser
    Browser(KString),
    /// None is shown as missing
    Number(Option<f64>),
    /// A threshold crossing, None meaning there was none
    Marker(Option<f64>),
    Blank,
}

/// What a row is coloured by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Series {
    Lang(KString),
    Browser(KString),
}

impl Series {
    pub fn name(&self) -> &str {
        match self {
            Series::Lang(s) | Series::Browser(s) => s.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PanelRow {
    pub series: Option<Series>,
    pub cells: Vec<Cell>,
}

/// One sub-plot of a chart, as a table.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub title: String,
    pub header: Vec<ColumnHeader>,
    pub rows: Vec<PanelRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    pub kind: ChartKind,
    pub panels: Vec<Panel>,
}

impl ChartData {
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}

/// Everything the chart preparation functions get to see.
#[derive(Debug, Clone, Copy)]
pub struct ChartInput<'t> {
    pub table: &'t UnifiedTable,
    /// The dimensions identifying a curve, `crossings` are keyed by
    /// them
    pub dimensions: &'t [Dimension],
    pub crossings: &'t [CrossingEvent],
    pub analysis: CrossingAnalysis,
    /// The browser whose heap usage is charted
    pub heap_browser: &'t str,
}

impl<'t> ChartInput<'t> {
    /// The curve dimensions without `dimension`.
    fn other_dimensions(&self, dimension: Dimension) -> Vec<Dimension> {
        self.dimensions
            .iter()
            .copied()
            .filter(|d| *d != dimension)
            .collect()
    }
}

/// Returns None if there is no data for the chart.
pub type PrepareChart = fn(&ChartInput) -> Result<Option<ChartData>>;

/// Something that turns prepared chart data into artifacts.
pub trait Renderer {
    fn render(&mut self, chart: &ChartData) -> Result<()>;
}

pub struct ChartRegistry {
    entries: BTreeMap<ChartKind, PrepareChart>,
}

impl ChartRegistry {
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Returns the previously registered function for `kind`, if any.
    pub fn register(&mut self, kind: ChartKind, prepare: PrepareChart) -> Option<PrepareChart> {
        self.entries.insert(kind, prepare)
    }

    pub fn kinds(&self) -> impl Iterator<Item = ChartKind> + '_ {
        self.entries.keys().copied()
    }

    pub fn prepare(&self, kind: ChartKind, input: &ChartInput) -> Result<Option<ChartData>> {
        let Some(prepare) = self.entries.get(&kind) else {
            bail!("no chart registered under the name {kind}")
        };
        prepare(input)
    }
}

impl Default for ChartRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        for kind in ChartKind::iter() {
            let prepare: PrepareChart = match kind {
                ChartKind::FpsVsBunnies => fps_vs_bunnies,
                ChartKind::MaxBunnies => max_bunnies,
                ChartKind::TpsStability => tps_stability,
                ChartKind::FrameTimeDistribution => frame_time_distribution,
                ChartKind::HeapUsage => heap_usage,
                ChartKind::ClickLatency => click_latency,
                ChartKind::RadarChart => radar_chart,
            };
            registry.register(kind, prepare);
        }
        registry
    }
}

fn field_header(field: NumericField) -> ColumnHeader {
    ColumnHeader::number(field.column_name(), field.unit())
}

fn dimension_headers(dimensions: &[Dimension]) -> Vec<ColumnHeader> {
    dimensions
        .iter()
        .map(|d| ColumnHeader::string(d.to_string()))
        .collect()
}

/// The values of `dimensions` in `key` (which was built from
/// `key_dimensions`), as text cells.
fn key_cells(key: &GroupKey, key_dimensions: &[Dimension], dimensions: &[Dimension]) -> Vec<Cell> {
    dimensions
        .iter()
        .map(|d| {
            key.get(key_dimensions, *d)
                .map(|v| dimension_cell(*d, v))
                .unwrap_or(Cell::Blank)
        })
        .collect()
}

pub fn dimension_cell(dimension: Dimension, value: &str) -> Cell {
    match dimension {
        Dimension::Browser => Cell::Browser(KString::from_ref(value)),
        Dimension::Lang | Dimension::OptLevel => Cell::Text(KString::from_ref(value)),
    }
}

fn series(key: &GroupKey, key_dimensions: &[Dimension]) -> Option<Series> {
    key.get(key_dimensions, Dimension::Lang)
        .map(|lang| Series::Lang(KString::from_ref(lang)))
}

/// Mean `y` per distinct `x` value, ascending by `x`.
fn mean_by_x(records: &[&RunRecord], x: NumericField, y: NumericField) -> Vec<(f64, f64)> {
    let mut buckets: BTreeMap<R64, Vec<f64>> = BTreeMap::new();
    for record in records {
        if let (Some(xv), Some(yv)) = (record.get(x), record.get(y)) {
            if xv.is_finite() {
                buckets.entry(R64::from_f64(xv)).or_default().push(yv);
            }
        }
    }
    buckets
        .into_iter()
        .filter_map(|(xv, ys)| Some((xv.raw(), Reduction::Mean.reduce(ys)?)))
        .collect()
}

/// Per browser, the mean game frame rate per workload of each curve,
/// with the point where it first crosses the threshold.
fn fps_vs_bunnies(input: &ChartInput) -> Result<Option<ChartData>> {
    let ChartInput {
        table,
        dimensions,
        crossings,
        analysis,
        ..
    } = *input;
    let series_dimensions = input.other_dimensions(Dimension::Browser);
    let groups = table.group_by(dimensions);
    let crossings: BTreeMap<&GroupKey, Option<f64>> =
        crossings.iter().map(|e| (&e.key, e.crossing)).collect();

    let mut header = dimension_headers(&series_dimensions);
    header.push(field_header(analysis.x));
    header.push(field_header(analysis.y));
    header.push(ColumnHeader::number(
        format!("below_{}", analysis.threshold),
        None,
    ));

    let mut panels = Vec::new();
    for browser in table.unique(Dimension::Browser) {
        let mut rows = Vec::new();
        for (key, records) in &groups {
            if key.get(dimensions, Dimension::Browser) != Some(browser.as_str()) {
                continue;
            }
            let curve = mean_by_x(records, analysis.x, analysis.y);
            let crossing = crossings.get(key).copied().flatten();
            for (i, (x, y)) in curve.into_iter().enumerate() {
                let mut cells = key_cells(key, dimensions, &series_dimensions);
                cells.push(Cell::Number(Some(x)));
                cells.push(Cell::Number(Some(y)));
                cells.push(if i == 0 {
                    Cell::Marker(crossing)
                } else {
                    Cell::Blank
                });
                rows.push(PanelRow {
                    series: series(key, dimensions),
                    cells,
                });
            }
        }
        panels.push(Panel {
            title: format!("{}_{browser}", ChartKind::FpsVsBunnies),
            header: header.clone(),
            rows,
        });
    }
    if panels.is_empty() {
        return Ok(None);
    }
    Ok(Some(ChartData {
        kind: ChartKind::FpsVsBunnies,
        panels,
    }))
}

/// The maximum workload reached per curve.
fn max_bunnies(input: &ChartInput) -> Result<Option<ChartData>> {
    let spec = MetricSpec::new(NumericField::Bunnies, Reduction::Max);
    let summary = SummaryTable::new(input.table, input.dimensions, &[spec]);
    let mut header = dimension_headers(input.dimensions);
    header.push(ColumnHeader::number("max_bunnies", None));
    let rows: Vec<PanelRow> = summary
        .complete_rows()
        .map(|kv| {
            let mut cells = key_cells(kv.key, input.dimensions, input.dimensions);
            cells.extend(kv.val.iter().map(|v| Cell::Number(Some(*v))));
            PanelRow {
                series: kv
                    .key
                    .get(input.dimensions, Dimension::Browser)
                    .map(|browser| Series::Browser(KString::from_ref(browser))),
                cells,
            }
        })
        .collect();
    if rows.is_empty() {
        return Ok(None);
    }
    Ok(Some(ChartData {
        kind: ChartKind::MaxBunnies,
        panels: vec![Panel {
            title: ChartKind::MaxBunnies.to_string(),
            header,
            rows,
        }],
    }))
}

/// Ticks per second against workload, one panel per language and
/// browser, in table order. Combinations without records give empty
/// panels.
fn tps_stability(input: &ChartInput) -> Result<Option<ChartData>> {
    let table = input.table;
    let extra = input.other_dimensions(Dimension::Lang);
    let extra: Vec<Dimension> = extra
        .into_iter()
        .filter(|d| *d != Dimension::Browser)
        .collect();
    let mut header = dimension_headers(&extra);
    header.push(field_header(NumericField::Bunnies));
    header.push(field_header(NumericField::Tps));

    let langs = table.unique(Dimension::Lang);
    let browsers = table.unique(Dimension::Browser);
    let mut panels = Vec::new();
    for lang in &langs {
        for browser in &browsers {
            let rows = table
                .records()
                .iter()
                .filter(|r| {
                    r.lang.as_deref() == Some(lang.as_str())
                        && r.browser.as_deref() == Some(browser.as_str())
                })
                .filter_map(|r| {
                    let bunnies = r.bunnies()?;
                    let tps = r.get(NumericField::Tps)?;
                    let mut cells: Vec<Cell> = extra
                        .iter()
                        .map(|d| {
                            r.dimension(*d)
                                .map(|v| dimension_cell(*d, v))
                                .unwrap_or(Cell::Blank)
                        })
                        .collect();
                    cells.push(Cell::Number(Some(bunnies)));
                    cells.push(Cell::Number(Some(tps)));
                    Some(PanelRow {
                        series: Some(Series::Lang(lang.clone())),
                        cells,
                    })
                })
                .collect();
            panels.push(Panel {
                title: format!("{}_{lang}_{browser}", ChartKind::TpsStability),
                header: header.clone(),
                rows,
            });
        }
    }
    if panels.is_empty() {
        return Ok(None);
    }
    Ok(Some(ChartData {
        kind: ChartKind::TpsStability,
        panels,
    }))
}

fn box_stats_header() -> Vec<ColumnHeader> {
    let mut header = vec![ColumnHeader::string("lang"), ColumnHeader::number("n", None)];
    for label in ["min", "q1", "median", "q3", "max", "iqr"] {
        header.push(ColumnHeader::number(label, None));
    }
    header
}

fn box_stats_row(lang: &KString, stats: &BoxStats) -> PanelRow {
    let BoxStats {
        n,
        min,
        q1,
        median,
        q3,
        max,
    } = *stats;
    let mut cells = vec![Cell::Text(lang.clone()), Cell::Number(Some(n as f64))];
    cells.extend([min, q1, median, q3, max, stats.iqr()].map(|v| Cell::Number(Some(v))));
    PanelRow {
        series: Some(Series::Lang(lang.clone())),
        cells,
    }
}

/// Box statistics of `field` per language, over `records`.
fn box_stats_panel<'r>(
    title: String,
    records: impl IntoIterator<Item = &'r RunRecord>,
    field: NumericField,
) -> Panel {
    let mut by_lang: BTreeMap<KString, Vec<f64>> = BTreeMap::new();
    for record in records {
        if let (Some(lang), Some(val)) = (&record.lang, record.get(field)) {
            by_lang.entry(lang.clone()).or_default().push(val);
        }
    }
    let rows = by_lang
        .iter()
        .filter_map(|(lang, vals)| {
            let stats = BoxStats::from_values(vals.iter().copied())?;
            Some(box_stats_row(lang, &stats))
        })
        .collect();
    let mut header = box_stats_header();
    if let Some(unit) = field.unit() {
        for h in header.iter_mut().skip(2) {
            *h = ColumnHeader::number(h.label.clone(), Some(unit));
        }
    }
    Panel {
        title,
        header,
        rows,
    }
}

const FRAME_FIELDS: [NumericField; 3] = [
    NumericField::AvgFrame,
    NumericField::MinFrame,
    NumericField::MaxFrame,
];

/// Only records with all three frame time values are used.
fn frame_time_distribution(input: &ChartInput) -> Result<Option<ChartData>> {
    let complete: Vec<&RunRecord> = input
        .table
        .records()
        .iter()
        .filter(|r| FRAME_FIELDS.iter().all(|f| r.get(*f).is_some()))
        .collect();
    if complete.is_empty() {
        return Ok(None);
    }
    let panels = FRAME_FIELDS
        .iter()
        .map(|field| {
            box_stats_panel(
                format!("{}_{field}", ChartKind::FrameTimeDistribution),
                complete.iter().copied(),
                *field,
            )
        })
        .collect();
    Ok(Some(ChartData {
        kind: ChartKind::FrameTimeDistribution,
        panels,
    }))
}

/// Heap size against workload per language, for one browser.
fn heap_usage(input: &ChartInput) -> Result<Option<ChartData>> {
    let table = input.table;
    let mut rows = Vec::new();
    for lang in table.unique(Dimension::Lang) {
        for r in table.records() {
            if r.lang.as_deref() != Some(lang.as_str())
                || r.browser.as_deref() != Some(input.heap_browser)
            {
                continue;
            }
            let (Some(bunnies), Some(heap)) = (r.bunnies(), r.get(NumericField::HeapMb)) else {
                continue;
            };
            rows.push(PanelRow {
                series: Some(Series::Lang(lang.clone())),
                cells: vec![
                    Cell::Text(lang.clone()),
                    Cell::Number(Some(bunnies)),
                    Cell::Number(Some(heap)),
                ],
            });
        }
    }
    if rows.is_empty() {
        return Ok(None);
    }
    Ok(Some(ChartData {
        kind: ChartKind::HeapUsage,
        panels: vec![Panel {
            title: format!("{}_{}", ChartKind::HeapUsage, input.heap_browser),
            header: vec![
                ColumnHeader::string("lang"),
                field_header(NumericField::Bunnies),
                field_header(NumericField::HeapMb),
            ],
            rows,
        }],
    }))
}

fn click_latency(input: &ChartInput) -> Result<Option<ChartData>> {
    let field = NumericField::ClickLatencyMs;
    if !input.table.has_data(field) {
        return Ok(None);
    }
    Ok(Some(ChartData {
        kind: ChartKind::ClickLatency,
        panels: vec![box_stats_panel(
            ChartKind::ClickLatency.to_string(),
            input.table.records(),
            field,
        )],
    }))
}

const RADAR_FIELDS: [NumericField; 5] = [
    NumericField::FpsJs,
    NumericField::FpsGame,
    NumericField::Tps,
    NumericField::HeapMb,
    NumericField::ClickLatencyMs,
];

/// Maps each column's minimum to 0 and maximum to 1; columns where
/// all values are equal become 0.
pub fn normalize_columns(rows: &mut [Vec<f64>]) {
    let Some(width) = rows.first().map(|r| r.len()) else {
        return;
    };
    for col in 0..width {
        let (min, max) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| {
            (lo.min(r[col]), hi.max(r[col]))
        });
        let range = max - min;
        for row in rows.iter_mut() {
            row[col] = if range > 0. {
                (row[col] - min) / range
            } else {
                0.
            };
        }
    }
}

/// Per language means of the profile metrics, normalised across
/// languages. Languages lacking any of the metrics are left out.
fn radar_chart(input: &ChartInput) -> Result<Option<ChartData>> {
    let dims = [Dimension::Lang];
    let specs = RADAR_FIELDS.map(|f| MetricSpec::new(f, Reduction::Mean));
    let summary = SummaryTable::new(input.table, &dims, &specs);
    let (keys, mut vals): (Vec<&GroupKey>, Vec<Vec<f64>>) =
        summary.complete_rows().map(|kv| (kv.key, kv.val)).unzip();
    if keys.is_empty() {
        return Ok(None);
    }
    normalize_columns(&mut vals);

    let mut header = vec![ColumnHeader::string("lang")];
    header.extend(RADAR_FIELDS.iter().map(|f| ColumnHeader::number(f.column_name(), None)));
    let rows = keys
        .into_iter()
        .zip(vals)
        .map(|(key, vals)| {
            let mut cells = key_cells(key, &dims, &dims);
            cells.extend(vals.into_iter().map(|v| Cell::Number(Some(v))));
            PanelRow {
                series: series(key, &dims),
                cells,
            }
        })
        .collect();
    Ok(Some(ChartData {
        kind: ChartKind::RadarChart,
        panels: vec![Panel {
            title: ChartKind::RadarChart.to_string(),
            header,
            rows,
        }],
    }))
}
