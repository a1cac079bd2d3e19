//! Reading benchmark log files (CSV as exported by the measurement
//! harness, with a leading row counter column) into `RunRecord`s.

use std::{
    fs::File,
    io::{BufReader, Read},
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result, anyhow};
use kstring::KString;
use walkdir::WalkDir;

use crate::{
    cohort::{Cohort, CohortRules},
    debug, info,
    record::{NumericField, RunRecord},
};

#[derive(Debug, thiserror::Error)]
#[error("no CSV files found in {dir:?}")]
pub struct NoInputDataError {
    pub dir: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("file {path:?} has no columns")]
    NoColumns { path: PathBuf },
    #[error("file {path:?} is missing the required column {column:?}")]
    MissingColumn { path: PathBuf, column: &'static str },
}

#[derive(Debug, thiserror::Error)]
#[error("file {path:?}, line {line}: column {column:?} has value {value:?}, which is not a finite number")]
pub struct ParseError {
    pub path: PathBuf,
    pub line: u64,
    pub column: &'static str,
    pub value: String,
}

/// Empty cells and pandas' `NaN` mean "not measured". Anything else
/// must be a finite number, `inf` is rejected.
fn parse_numeric_cell(cell: &str) -> Result<Option<f64>, ()> {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    match f64::from_str(cell) {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(()),
    }
}

fn categorical_cell(cell: &str) -> Option<KString> {
    let cell = cell.trim();
    if cell.is_empty() {
        None
    } else {
        Some(KString::from_ref(cell))
    }
}

/// Where in a CSV row the columns we know about are.
struct ColumnMap {
    lang: usize,
    browser: usize,
    numeric: Vec<(usize, NumericField)>,
}

impl ColumnMap {
    /// Column 0 is always skipped, it is the row counter written by
    /// the exporter.
    fn from_headers(path: &Path, headers: &csv::StringRecord) -> Result<Self, SchemaError> {
        if headers.is_empty() {
            return Err(SchemaError::NoColumns { path: path.into() });
        }
        let mut lang = None;
        let mut browser = None;
        let mut numeric = Vec::new();
        for (i, name) in headers.iter().enumerate().skip(1) {
            match name.trim() {
                "lang" => lang = Some(i),
                "browser" => browser = Some(i),
                name => {
                    if let Ok(field) = NumericField::from_str(name) {
                        numeric.push((i, field));
                    } else {
                        debug!("{path:?}: ignoring unknown column {name:?}");
                    }
                }
            }
        }
        let missing = |column| SchemaError::MissingColumn {
            path: path.into(),
            column,
        };
        if !numeric.iter().any(|(_, f)| *f == NumericField::Bunnies) {
            return Err(missing(NumericField::Bunnies.column_name()));
        }
        Ok(ColumnMap {
            lang: lang.ok_or_else(|| missing("lang"))?,
            browser: browser.ok_or_else(|| missing("browser"))?,
            numeric,
        })
    }
}

/// The records of one input file, in file order.
#[derive(Debug, Clone)]
pub struct RecordSet {
    pub path: Box<Path>,
    pub records: Vec<RunRecord>,
}

impl RecordSet {
    pub fn read_file(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| anyhow!("opening data file {path:?}"))?;
        Self::from_reader(path, BufReader::new(file))
    }

    /// `path` is only used for error messages.
    pub fn from_reader(path: &Path, input: impl Read) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(input);
        let headers = reader
            .headers()
            .with_context(|| anyhow!("reading the header line of {path:?}"))?
            .clone();
        let columns = ColumnMap::from_headers(path, &headers)?;

        let mut records = Vec::new();
        for (index, row) in reader.records().enumerate() {
            let row = row.with_context(|| anyhow!("parsing CSV file {path:?}"))?;
            let line = row.position().map(|p| p.line()).unwrap_or(0);
            let cell = |i: usize| row.get(i).unwrap_or("");

            let mut record = RunRecord::new(
                index,
                categorical_cell(cell(columns.lang)),
                categorical_cell(cell(columns.browser)),
            );
            for (i, field) in &columns.numeric {
                let value = parse_numeric_cell(cell(*i)).map_err(|()| ParseError {
                    path: path.into(),
                    line,
                    column: field.column_name(),
                    value: cell(*i).into(),
                })?;
                record.set(*field, value);
            }
            records.push(record);
        }
        debug!("read {} records from {path:?}", records.len());

        Ok(RecordSet {
            path: path.into(),
            records,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub path: PathBuf,
    pub cohort: Cohort,
}

fn is_csv_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

/// All `*.csv` files directly inside `dir`, sorted by file name, each
/// with its cohort. Errors with `NoInputDataError` if there are none.
pub fn list_input_files(dir: &Path, rules: &CohortRules) -> Result<Vec<InputFile>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| anyhow!("listing data directory {dir:?}"))?;
        if entry.file_type().is_file() && is_csv_file(entry.path()) {
            let path = entry.into_path();
            let cohort = rules.classify(&path);
            info!("{path:?}: cohort {cohort}");
            files.push(InputFile { path, cohort });
        }
    }
    if files.is_empty() {
        return Err(NoInputDataError { dir: dir.into() }.into());
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
,lang,browser,bunnies,fps_js,fps_game,tps,heap_mb
0,Rust,Firefox,1000,60,70,60,12.5
1,Rust,Firefox,1500,60,NaN,60,
2,Go,,2000,59,58.5,60,30
";

    fn read(s: &str) -> Result<RecordSet> {
        RecordSet::from_reader(Path::new("sample.csv"), s.as_bytes())
    }

    #[test]
    fn t_read() -> Result<()> {
        let set = read(SAMPLE)?;
        assert_eq!(set.len(), 3);
        let r = &set.records[0];
        assert_eq!(r.index, 0);
        assert_eq!(r.lang.as_deref(), Some("Rust"));
        assert_eq!(r.browser.as_deref(), Some("Firefox"));
        assert_eq!(r.bunnies(), Some(1000.));
        assert_eq!(r.get(NumericField::HeapMb), Some(12.5));
        assert_eq!(r.get(NumericField::AvgFrame), None);

        let r = &set.records[1];
        assert_eq!(r.get(NumericField::FpsGame), None);
        assert_eq!(r.get(NumericField::HeapMb), None);

        let r = &set.records[2];
        assert_eq!(r.index, 2);
        assert_eq!(r.browser, None);
        assert_eq!(r.get(NumericField::FpsGame), Some(58.5));
        Ok(())
    }

    #[test]
    fn t_first_column_is_dropped() -> Result<()> {
        // Even if it is named like a known column
        let set = read("bunnies,lang,browser,bunnies\n7,JS,Chromium,100\n")?;
        assert_eq!(set.records[0].bunnies(), Some(100.));
        Ok(())
    }

    #[test]
    fn t_missing_column() {
        let e = read(",browser,bunnies\n0,Firefox,100\n").unwrap_err();
        match e.downcast_ref::<SchemaError>() {
            Some(SchemaError::MissingColumn { column, .. }) => assert_eq!(*column, "lang"),
            _ => panic!("unexpected error {e:#}"),
        }
    }

    #[test]
    fn t_no_columns() {
        let e = read("").unwrap_err();
        assert!(matches!(
            e.downcast_ref::<SchemaError>(),
            Some(SchemaError::NoColumns { .. })
        ));
    }

    #[test]
    fn t_bad_number() {
        let e = read(",lang,browser,bunnies,tps\n0,Go,Firefox,100,60\n1,Go,Firefox,200,abc\n")
            .unwrap_err();
        let e = e.downcast_ref::<ParseError>().expect("a ParseError");
        assert_eq!(e.line, 3);
        assert_eq!(e.column, "tps");
        assert_eq!(e.value, "abc");
    }

    #[test]
    fn t_infinite_number() {
        for cell in ["inf", "-Infinity"] {
            let e = read(&format!(",lang,browser,bunnies,fps_game\n0,Rust,Firefox,{cell},58\n"))
                .unwrap_err();
            let e = e.downcast_ref::<ParseError>().expect("a ParseError");
            assert_eq!(e.line, 2);
            assert_eq!(e.column, "bunnies");
            assert_eq!(e.value, cell);
        }
    }

    #[test]
    fn t_ragged_rows_are_an_error() {
        assert!(read(",lang,browser,bunnies\n0,Go,Firefox\n").is_err());
    }
}
