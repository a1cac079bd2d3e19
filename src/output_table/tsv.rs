//! Writing a `TableView` as a tab separated file, with quoting where
//! needed (unlike the TSV mode of `terminal`).

use std::{fs::File, io::Write, path::Path};

use anyhow::{Context, Result, anyhow};

use super::TableView;

pub fn write_table_view<W: Write>(table: &dyn TableView, out: W) -> Result<W> {
    let mut writer = csv::WriterBuilder::new().delimiter(b'\t').from_writer(out);
    let header = table.table_view_header();
    writer.write_record(header.iter().map(|h| h.label_with_unit(" ").into_owned()))?;
    for row in table.table_view_body() {
        writer.write_record(row.iter().map(|(val, _)| val.as_bytes()))?;
    }
    writer
        .into_inner()
        .map_err(|e| anyhow!("flushing TSV output: {}", e.error()))
}

pub fn tsv_file_write(table: &dyn TableView, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| anyhow!("creating TSV file {path:?}"))?;
    write_table_view(table, file).with_context(|| anyhow!("writing TSV file {path:?}"))?;
    Ok(())
}
