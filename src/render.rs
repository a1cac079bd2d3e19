//! Rendering prepared charts as tables: shown on the terminal, or
//! saved as an Excel workbook plus one TSV file per panel.

use std::{
    borrow::Cow,
    collections::BTreeMap,
    io::stdout,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use genawaiter::rc::Gen;
use kstring::KString;

use crate::{
    charts::{Cell, ChartData, Panel, PanelRow, Renderer, Series, dimension_cell},
    color::RgbColor,
    config::BenchConfig,
    crossing::{CrossingAnalysis, CrossingEvent},
    info,
    load::InputFile,
    output_table::{
        ColumnHeader, Highlight, MISSING, TableView,
        excel::excel_file_write,
        format_opt_number,
        terminal::{TerminalTableOpts, print_table_view},
        tsv::tsv_file_write,
    },
    record::{Dimension, GroupKey},
    summary::SummaryTable,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
    /// Print to stdout
    Display,
    /// Write files into `output_dir`, which is created if missing
    Save { output_dir: PathBuf },
}

/// Language and browser names to display colours.
#[derive(Debug, Clone, Default)]
pub struct ColorScheme {
    pub lang_colors: BTreeMap<String, RgbColor>,
    pub browser_colors: BTreeMap<String, RgbColor>,
}

impl ColorScheme {
    pub fn from_config(config: &BenchConfig) -> Self {
        Self {
            lang_colors: config.lang_colors.clone(),
            browser_colors: config.browser_colors.clone(),
        }
    }

    pub fn color(&self, series: &Series) -> Option<RgbColor> {
        let color = match series {
            Series::Lang(lang) => self.lang_colors.get(lang.as_str()),
            Series::Browser(browser) => self.browser_colors.get(browser.as_str()),
        };
        color.copied()
    }

    pub fn highlight(&self, series: Option<&Series>) -> Highlight {
        series
            .and_then(|s| self.color(s))
            .map(Highlight::Color)
            .unwrap_or(Highlight::Neutral)
    }
}

/// A panel seen as a table, with the series colours applied.
pub struct PanelView<'p> {
    pub panel: &'p Panel,
    pub colors: &'p ColorScheme,
}

fn cell_view<'c>(
    cell: &'c Cell,
    series: Highlight,
    colors: &ColorScheme,
) -> (Cow<'c, str>, Highlight) {
    match cell {
        Cell::Text(s) => (s.as_str().into(), series),
        Cell::Browser(s) => (
            s.as_str().into(),
            colors.highlight(Some(&Series::Browser(s.clone()))),
        ),
        Cell::Number(v) => (format_opt_number(*v).into(), Highlight::Neutral),
        Cell::Marker(Some(x)) => (format_opt_number(Some(*x)).into(), Highlight::Red),
        Cell::Marker(None) => (MISSING.into(), Highlight::Neutral),
        Cell::Blank => ("".into(), Highlight::Neutral),
    }
}

impl<'p> TableView for PanelView<'p> {
    fn table_name(&self) -> Cow<'_, str> {
        self.panel.title.as_str().into()
    }

    fn table_view_header(&self) -> Cow<'_, [ColumnHeader]> {
        self.panel.header.as_slice().into()
    }

    fn table_view_body<'s>(
        &'s self,
    ) -> Box<dyn Iterator<Item = Cow<'s, [(Cow<'s, str>, Highlight)]>> + 's> {
        Box::new(
            Gen::new(|co| async move {
                for row in &self.panel.rows {
                    let series = self.colors.highlight(row.series.as_ref());
                    let vals: Vec<(Cow<'s, str>, Highlight)> = row
                        .cells
                        .iter()
                        .map(|cell| cell_view(cell, series, self.colors))
                        .collect();
                    co.yield_(vals.into()).await;
                }
            })
            .into_iter(),
        )
    }
}

fn key_row(key: &GroupKey, dimensions: &[Dimension]) -> PanelRow {
    PanelRow {
        series: key
            .get(dimensions, Dimension::Lang)
            .map(|lang| Series::Lang(KString::from_ref(lang))),
        cells: dimensions
            .iter()
            .zip(key.values())
            .map(|(d, v)| dimension_cell(*d, v))
            .collect(),
    }
}

fn dimension_headers(dimensions: &[Dimension]) -> Vec<ColumnHeader> {
    dimensions
        .iter()
        .map(|d| ColumnHeader::string(d.to_string()))
        .collect()
}

/// The input files with their cohorts.
pub fn input_files_panel(files: &[InputFile]) -> Panel {
    Panel {
        title: "Input_Files".into(),
        header: vec![ColumnHeader::string("cohort"), ColumnHeader::string("file")],
        rows: files
            .iter()
            .map(|InputFile { path, cohort }| PanelRow {
                series: None,
                cells: vec![
                    Cell::Text(KString::from_static((*cohort).into())),
                    Cell::Text(KString::from_string(path.to_string_lossy().into_owned())),
                ],
            })
            .collect(),
    }
}

/// One row per crossing event, keyed by `dimensions`.
pub fn crossings_panel(
    events: &[CrossingEvent],
    dimensions: &[Dimension],
    analysis: &CrossingAnalysis,
) -> Panel {
    let mut header = dimension_headers(dimensions);
    header.push(ColumnHeader::number(
        format!("{}_below_{}", analysis.x, analysis.threshold),
        None,
    ));
    Panel {
        title: "Crossings".into(),
        header,
        rows: events
            .iter()
            .map(|CrossingEvent { key, crossing }| {
                let mut row = key_row(key, dimensions);
                row.cells.push(Cell::Marker(*crossing));
                row
            })
            .collect(),
    }
}

/// One row per group, one column per metric.
pub fn summary_panel(summary: &SummaryTable) -> Panel {
    let mut header = dimension_headers(&summary.dimensions);
    header.extend(
        summary
            .specs
            .iter()
            .map(|spec| ColumnHeader::number(spec.to_string(), spec.field.unit())),
    );
    Panel {
        title: "Summary".into(),
        header,
        rows: summary
            .rows
            .iter()
            .map(|kv| {
                let mut row = key_row(&kv.key, &summary.dimensions);
                row.cells.extend(kv.val.iter().map(|v| Cell::Number(*v)));
                row
            })
            .collect(),
    }
}

/// Print a panel to stdout.
pub fn print_panel(panel: &Panel, colors: &ColorScheme, opts: &TerminalTableOpts) -> Result<()> {
    print_table_view(&PanelView { panel, colors }, opts, stdout())?;
    Ok(())
}

/// Replace characters that can't appear in file names.
fn file_name_safe(name: &str) -> String {
    name.chars()
        .map(|c| if c == '/' || c == '\\' || c == '\0' { '_' } else { c })
        .collect()
}

pub struct TableRenderer {
    mode: OutputMode,
    opts: TerminalTableOpts,
    colors: ColorScheme,
    written: Vec<PathBuf>,
}

impl TableRenderer {
    pub fn new(mode: OutputMode, opts: TerminalTableOpts, colors: ColorScheme) -> Self {
        Self {
            mode,
            opts,
            colors,
            written: Vec::new(),
        }
    }

    /// The files written so far, in order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn save(&mut self, chart: &ChartData, output_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(output_dir)
            .with_context(|| anyhow!("creating output directory {output_dir:?}"))?;
        let views: Vec<PanelView> = chart
            .panels
            .iter()
            .map(|panel| PanelView {
                panel,
                colors: &self.colors,
            })
            .collect();

        let path = output_dir.join(format!("{}.xlsx", chart.name()));
        excel_file_write(views.iter().map(|v| v as &dyn TableView), &path)?;
        info!("wrote {path:?}");
        self.written.push(path);

        for view in &views {
            let path = output_dir.join(format!("{}.tsv", file_name_safe(&view.panel.title)));
            tsv_file_write(view, &path)?;
            info!("wrote {path:?}");
            self.written.push(path);
        }
        Ok(())
    }
}

impl Renderer for TableRenderer {
    fn render(&mut self, chart: &ChartData) -> Result<()> {
        match self.mode.clone() {
            OutputMode::Display => {
                for panel in &chart.panels {
                    print_panel(panel, &self.colors, &self.opts)?;
                }
                Ok(())
            }
            OutputMode::Save { output_dir } => self
                .save(chart, &output_dir)
                .with_context(|| anyhow!("saving chart {}", chart.name())),
        }
    }
}
