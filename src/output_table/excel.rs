use std::{collections::BTreeSet, path::Path};

use anyhow::{Context, Result, anyhow};
use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook};

use super::{ColumnFormatting, Highlight, TableView, Unit};

/// How many characters to add to the automatic column width
/// calculation to try to avoid setting widths too small to accomodate
/// the strings in the cells.
const WIDTH_SAFETY_MARGIN_CHARS: f64 = 2.0;

/// Excel's limit for worksheet names
const MAX_SHEET_NAME_CHARS: usize = 31;

/// Make `name` acceptable as a worksheet name, unique within `used`.
pub fn sheet_name(name: &str, used: &mut BTreeSet<String>) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            c => c,
        })
        .take(MAX_SHEET_NAME_CHARS)
        .collect();
    let mut candidate = cleaned.clone();
    let mut i = 2;
    while used.contains(&candidate) {
        let suffix = format!("~{i}");
        let keep = MAX_SHEET_NAME_CHARS - suffix.chars().count();
        candidate = cleaned.chars().take(keep).chain(suffix.chars()).collect();
        i += 1;
    }
    used.insert(candidate.clone());
    candidate
}

fn char_width(s: &str) -> usize {
    s.split('\n').map(|s| s.chars().count()).max().unwrap_or(0)
}

/// Write each table into its own worksheet of a new workbook at
/// `file`. The file is first written under a temporary name, then
/// renamed.
pub fn excel_file_write<'t>(
    tables: impl IntoIterator<Item = &'t (dyn TableView + 't)>,
    file: &Path,
) -> Result<()> {
    let mut workbook = Workbook::new();
    let mut used_names = BTreeSet::new();

    for table in tables {
        let worksheet = workbook.add_worksheet();
        let name = sheet_name(&table.table_name(), &mut used_names);
        worksheet
            .set_name(&name)
            .with_context(|| anyhow!("trying to use table name as worksheet name: {name:?}"))?;

        let header = table.table_view_header();
        let mut column_widths: Vec<usize> = header.iter().map(|_| 1).collect();

        let mut num_lines = 1;
        for (i, column) in header.iter().enumerate() {
            let colnum = u16::try_from(i).with_context(|| anyhow!("too many columns for excel"))?;
            let val = column.label_with_unit("\n");
            column_widths[i] = column_widths[i].max(char_width(&val));
            num_lines = num_lines.max(match column.unit {
                Unit::None => 1,
                Unit::Label(_) => 2,
            });
            worksheet
                .write_with_format(0, colnum, &*val, &Format::new().set_bold())
                .with_context(|| anyhow!("write title value {val:?}"))?;
        }
        let height = (num_lines * 15) as f64;
        worksheet
            .set_row_height(0, height)
            .with_context(|| anyhow!("setting height of title row to {height}"))?;

        for (rowidx, row) in table.table_view_body().enumerate() {
            let rownum = u32::try_from(rowidx + 1)
                .with_context(|| anyhow!("too many rows for excel"))?;
            for (i, (val, highlight)) in row.iter().enumerate() {
                let colnum =
                    u16::try_from(i).with_context(|| anyhow!("too many columns for excel"))?;
                let mut format = Format::new();
                if let Some(column) = header.get(i) {
                    if column.formatting == ColumnFormatting::Number {
                        format = format.set_align(FormatAlign::Right);
                    }
                }
                match highlight {
                    Highlight::Neutral => (),
                    Highlight::Red => format = format.set_font_color(Color::Red),
                    Highlight::Color(rgb) => format = format.set_font_color(Color::from(*rgb)),
                }
                if let Some(width) = column_widths.get_mut(i) {
                    *width = (*width).max(char_width(val));
                }
                worksheet
                    .write_with_format(rownum, colnum, &**val, &format)
                    .with_context(|| anyhow!("write value {val:?}"))?;
            }
        }

        // Our own character counting, autofit works badly for numbers
        // in LibreOffice.
        for (i, num_chars) in column_widths.iter().enumerate() {
            let colnum = u16::try_from(i).with_context(|| anyhow!("too many columns for excel"))?;
            let width = *num_chars as f64 + WIDTH_SAFETY_MARGIN_CHARS;
            worksheet
                .set_column_width(colnum, width)
                .with_context(|| anyhow!("setting column width on column {colnum} to {width}"))?;
        }
    }

    let mut tmp = file.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = Path::new(&tmp);
    workbook
        .save(tmp)
        .with_context(|| anyhow!("saving excel file to {tmp:?}"))?;
    std::fs::rename(tmp, file).with_context(|| anyhow!("renaming {tmp:?} to {file:?}"))?;
    Ok(())
}
