use std::{fs, path::Path};

use anyhow::Result;
use approx::assert_relative_eq;
use bunnybench::{
    aggregate::CohortSelection,
    charts::{ChartKind, ChartRegistry},
    cohort::Cohort,
    config::BenchConfig,
    context::PipelineContext,
    load::{NoInputDataError, ParseError, list_input_files},
    output_table::terminal::TerminalTableOpts,
    record::{Dimension, NumericField},
    render::{ColorScheme, OutputMode, TableRenderer},
    summary::{MetricSpec, Reduction},
};
use tempfile::TempDir;

const HEADER: &str = ",lang,browser,bunnies,fps_js,fps_game,tps,heap_mb,click_latency_ms";

fn write_log(dir: &Path, name: &str, rows: &[&str]) -> Result<()> {
    let mut s = String::from(HEADER);
    s.push('\n');
    for (i, row) in rows.iter().enumerate() {
        s.push_str(&format!("{i},{row}\n"));
    }
    fs::write(dir.join(name), s)?;
    Ok(())
}

fn data_dir() -> Result<TempDir> {
    let dir = tempfile::tempdir()?;
    let d = dir.path();
    write_log(
        d,
        "a_rust.csv",
        &[
            "Rust,Firefox,1000,60,70,60,10,",
            "Rust,Firefox,1500,60,65,60,11,",
            "Rust,Firefox,1600,60,58,59,12,",
            "Rust,Firefox,1700,60,50,58,13,",
        ],
    )?;
    write_log(
        d,
        "b_go.csv",
        &["Go,Firefox,1500,60,80,60,30,", "Go,Chromium,2000,55,75,60,35,"],
    )?;
    write_log(d, "c_rust_opt_high.csv", &["Rust,Firefox,1500,60,90,60,9,"])?;
    write_log(
        d,
        "d_laptop_opt_low.csv",
        &["Rust,Firefox,800,60,40,30,8,", "JS,Firefox,800,60,35,30,50,"],
    )?;
    fs::write(d.join("notes.txt"), "not a log")?;
    Ok(dir)
}

fn config(dir: &Path) -> BenchConfig {
    BenchConfig {
        data_dir: dir.into(),
        ..Default::default()
    }
}

#[test]
fn classification() -> Result<()> {
    let dir = data_dir()?;
    let config = config(dir.path());
    let files = list_input_files(&config.data_dir, &config.cohort_rules())?;
    let cohorts: Vec<(String, Cohort)> = files
        .iter()
        .map(|f| {
            let name = f.path.file_name().unwrap().to_string_lossy().into_owned();
            (name, f.cohort)
        })
        .collect();
    assert_eq!(
        cohorts,
        [
            ("a_rust.csv".to_string(), Cohort::Default),
            ("b_go.csv".to_string(), Cohort::Default),
            ("c_rust_opt_high.csv".to_string(), Cohort::OptHigh),
            // laptop takes precedence over the opt marker
            ("d_laptop_opt_low.csv".to_string(), Cohort::Laptop),
        ]
    );
    Ok(())
}

#[test]
fn default_cohort_pipeline() -> Result<()> {
    let dir = data_dir()?;
    let ctx = PipelineContext::load(&config(dir.path()))?;

    assert_eq!(ctx.cohort_sets.num_files(), 4);
    assert_eq!(ctx.table.len(), 6);
    let bunnies: Vec<f64> = ctx.table.records().iter().filter_map(|r| r.bunnies()).collect();
    assert_eq!(bunnies, [1000., 1500., 1600., 1700., 1500., 2000.]);

    let crossings: Vec<(String, Option<f64>)> = ctx
        .crossings
        .iter()
        .map(|e| (e.key.to_string(), e.crossing))
        .collect();
    assert_eq!(crossings.len(), 3);
    assert_eq!(crossings[0], ("Go / Chromium".to_string(), None));
    assert_eq!(crossings[1], ("Go / Firefox".to_string(), None));
    assert_eq!(crossings[2].0, "Rust / Firefox");
    assert_relative_eq!(crossings[2].1.unwrap(), 1571.4285714285713, epsilon = 1e-9);

    let summary = ctx.summary(
        &[Dimension::Lang],
        &[
            MetricSpec::new(NumericField::Bunnies, Reduction::Max),
            MetricSpec::new(NumericField::HeapMb, Reduction::Mean),
            MetricSpec::new(NumericField::ClickLatencyMs, Reduction::Mean),
        ],
    );
    let rows: Vec<(String, Vec<Option<f64>>)> = summary
        .rows
        .iter()
        .map(|kv| (kv.key.to_string(), kv.val.clone()))
        .collect();
    assert_eq!(
        rows,
        [
            ("Go".to_string(), vec![Some(2000.), Some(32.5), None]),
            ("Rust".to_string(), vec![Some(1700.), Some(11.5), None]),
        ]
    );
    Ok(())
}

#[test]
fn cohort_selections() -> Result<()> {
    let dir = data_dir()?;
    let mut config = config(dir.path());

    config.cohort_selection = CohortSelection::DefaultPlusOptHigh;
    let ctx = PipelineContext::load(&config)?;
    assert_eq!(ctx.table.len(), 7);
    let last = &ctx.table.records()[6];
    assert_eq!(last.index, 6);
    assert_eq!(last.opt_level, Some(Cohort::OptHigh));
    assert_eq!(ctx.crossings.len(), 4);

    config.cohort_selection = CohortSelection::LaptopOnly;
    let ctx = PipelineContext::load(&config)?;
    let langs = ctx.table.unique(Dimension::Lang);
    assert_eq!(langs.len(), 2);
    assert_eq!(langs[0].as_str(), "Rust");
    assert_eq!(langs[1].as_str(), "JS");

    // No opt-low files: an empty cohort, but not an error
    config.cohort_selection = CohortSelection::DefaultPlusOptLow;
    let ctx = PipelineContext::load(&config)?;
    assert_eq!(ctx.table.len(), 6);
    Ok(())
}

#[test]
fn no_input_files() -> Result<()> {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("readme.md"), "nothing here")?;
    let err = PipelineContext::load(&config(dir.path())).err().expect("an error");
    assert!(err.downcast_ref::<NoInputDataError>().is_some(), "{err:#}");

    let missing = dir.path().join("does-not-exist");
    assert!(PipelineContext::load(&config(&missing)).is_err());
    Ok(())
}

#[test]
fn parse_error_is_fatal() -> Result<()> {
    let dir = data_dir()?;
    write_log(dir.path(), "e_broken.csv", &["Go,Firefox,abc,60,60,60,1,"])?;
    let err = PipelineContext::load(&config(dir.path())).err().expect("an error");
    let parse_error = err.downcast_ref::<ParseError>().expect("a ParseError");
    assert!(parse_error.path.ends_with("e_broken.csv"));
    assert_eq!(parse_error.line, 2);
    assert_eq!(parse_error.column, "bunnies");
    Ok(())
}

#[test]
fn infinite_workload_is_fatal() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_log(
        dir.path(),
        "a_rust.csv",
        &["Rust,Firefox,1500,60,65,60,10,", "Rust,Firefox,inf,60,58,60,10,"],
    )?;
    let err = PipelineContext::load(&config(dir.path())).err().expect("an error");
    let parse_error = err.downcast_ref::<ParseError>().expect("a ParseError");
    assert_eq!(parse_error.line, 3);
    assert_eq!(parse_error.column, "bunnies");
    assert_eq!(parse_error.value, "inf");
    Ok(())
}

fn save_charts(config: &BenchConfig, output_dir: &Path) -> Result<Vec<ChartKind>> {
    let ctx = PipelineContext::load(config)?;
    let mut renderer = TableRenderer::new(
        OutputMode::Save {
            output_dir: output_dir.into(),
        },
        TerminalTableOpts::default(),
        ColorScheme::from_config(config),
    );
    ctx.render_charts(&ChartRegistry::default(), &config.charts, &mut renderer)
}

fn tsv_files(dir: &Path) -> Result<Vec<(String, String)>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().map(|e| e == "tsv").unwrap_or(false) {
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            files.push((name, fs::read_to_string(&path)?));
        }
    }
    files.sort();
    Ok(files)
}

#[test]
fn rerun_is_idempotent() -> Result<()> {
    let dir = data_dir()?;
    let config = config(dir.path());

    let a = PipelineContext::load(&config)?;
    let b = PipelineContext::load(&config)?;
    assert_eq!(a.table, b.table);
    assert_eq!(a.crossings, b.crossings);

    let out = tempfile::tempdir()?;
    let rendered_1 = save_charts(&config, &out.path().join("1"))?;
    let rendered_2 = save_charts(&config, &out.path().join("2"))?;
    assert_eq!(rendered_1, rendered_2);
    // No click latency values in the default cohort
    assert!(!rendered_1.contains(&ChartKind::ClickLatency));
    assert!(rendered_1.contains(&ChartKind::FpsVsBunnies));

    let files_1 = tsv_files(&out.path().join("1"))?;
    assert!(
        files_1
            .iter()
            .any(|(name, _)| name == "FPS_vs_Bunnies_Firefox.tsv")
    );
    assert!(out.path().join("1").join("FPS_vs_Bunnies.xlsx").is_file());
    assert_eq!(files_1, tsv_files(&out.path().join("2"))?);
    Ok(())
}
