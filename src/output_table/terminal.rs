//! Table printing to a terminal in human-readable format (with spaces
//! for padding, and ANSI sequences for formatting), or as TSV.

//! Does not escape anything in TSV mode, thus values containing tabs
//! or newlines make the output ambiguous; use the `tsv` module for
//! files.

use std::io::{BufWriter, IsTerminal, Write};

use anyhow::{Result, anyhow, bail};
use itertools::{EitherOrBoth, Itertools};
use strum_macros::EnumString;
use yansi::{Paint, Style};

use super::{ColumnFormatting, Highlight, TableView};

#[derive(Debug, EnumString, PartialEq, Clone, Copy)]
#[strum(serialize_all = "kebab_case")]
pub enum ColorOpt {
    Auto,
    Always,
    Never,
}

impl ColorOpt {
    pub fn want_color(self, detected_terminal: bool) -> bool {
        match self {
            ColorOpt::Auto => detected_terminal,
            ColorOpt::Always => true,
            ColorOpt::Never => false,
        }
    }
}

#[derive(Debug, clap::Args, Clone)]
pub struct TerminalTableOpts {
    /// Show tables as TSV (with '\t' as separator) instead of
    /// human-readable
    #[arg(long)]
    pub tsv: bool,

    /// Whether to use ANSI codes to format human-readable output on
    /// terminals (auto, always, never)
    #[arg(long, default_value = "auto")]
    pub color: ColorOpt,
}

impl Default for TerminalTableOpts {
    fn default() -> Self {
        Self {
            tsv: false,
            color: ColorOpt::Auto,
        }
    }
}

impl TerminalTableOpts {
    pub fn want_color(&self, detected_terminal: bool) -> bool {
        let Self { tsv, color } = self;
        if *tsv {
            false
        } else {
            color.want_color(detected_terminal)
        }
    }
}

fn highlight_style(highlight: Highlight) -> Option<Style> {
    match highlight {
        Highlight::Neutral => None,
        Highlight::Red => Some(Style::new().red()),
        Highlight::Color(rgb) => Some(Style::new().fg(rgb.into())),
    }
}

/// Capable of streaming, which requires defining the column widths
/// beforehand. If a value is wider than the defined column width for
/// that value, a single space is still printed between the value and
/// the next. The last column does not need a width, and no padding is
/// printed.
pub struct TerminalTable<O: Write + IsTerminal> {
    opts: TerminalTableOpts,
    widths: Vec<usize>,
    number_columns: Vec<bool>,
    padding: String,
    use_color: bool,
    out: BufWriter<O>,
}

impl<O: Write + IsTerminal> TerminalTable<O> {
    /// How many spaces to put between columns in human-readable
    /// format at minimum, even if a value is longer than anticipated.
    const MINIMAL_PADDING_LEN: usize = 1;

    /// The length of `widths` must be one less than that of `titles`.
    /// `widths` must include the spacing between the columns.
    pub fn start(
        widths: &[usize],
        titles: &[&str],
        number_columns: &[bool],
        opts: TerminalTableOpts,
        out: O,
    ) -> Result<Self> {
        if widths.len() + 1 != titles.len() || titles.len() != number_columns.len() {
            bail!(
                "need widths for all but the last column and a formatting for every \
                 column, got {} widths, {} titles, {} formattings",
                widths.len(),
                titles.len(),
                number_columns.len()
            )
        }
        let max_width = widths.iter().max().copied().unwrap_or(0);
        let use_color = opts.want_color(out.is_terminal());
        let mut slf = Self {
            opts,
            widths: widths.to_owned(),
            number_columns: number_columns.to_owned(),
            padding: " ".repeat(max_width),
            use_color,
            out: BufWriter::new(out),
        };
        const TITLE_STYLE: Style = Style::new().bold().italic();
        let titles: Vec<(&str, Option<Style>)> =
            titles.iter().map(|t| (*t, Some(TITLE_STYLE))).collect();
        slf.write_row(&titles, false)?;
        Ok(slf)
    }

    fn write_row(&mut self, row: &[(&str, Option<Style>)], align_numbers: bool) -> Result<()> {
        if row.len() != self.widths.len() + 1 {
            bail!(
                "row has {} columns, table has {}",
                row.len(),
                self.widths.len() + 1
            )
        }
        let tsv = self.opts.tsv;
        for (i, either_or_both) in row.iter().zip_longest(&self.widths).enumerate() {
            let ((text, style), width) = match either_or_both {
                EitherOrBoth::Both(cell, width) => (cell, Some(*width)),
                EitherOrBoth::Left(cell) => (cell, None),
                EitherOrBoth::Right(_) => unreachable!("row len has been checked against widths"),
            };
            if tsv {
                if i > 0 {
                    self.out.write_all(b"\t")?;
                }
                self.out.write_all(text.as_bytes())?;
                continue;
            }

            let text_len = text.chars().count();
            let missing_padding_len = width.map(|w| w.saturating_sub(text_len));
            let right_align = align_numbers && self.number_columns[i];
            // Numbers are right-aligned within their column, keeping
            // the minimal padding to the right
            if right_align {
                if let Some(missing) = missing_padding_len {
                    let left = missing.saturating_sub(Self::MINIMAL_PADDING_LEN);
                    self.out.write_all(self.padding[0..left].as_bytes())?;
                }
            }
            match style {
                Some(style) if self.use_color => {
                    write!(self.out, "{}", text.paint(style.clone()))?
                }
                _ => self.out.write_all(text.as_bytes())?,
            }
            if let Some(missing) = missing_padding_len {
                let len = if right_align {
                    missing.min(Self::MINIMAL_PADDING_LEN)
                } else {
                    missing.max(Self::MINIMAL_PADDING_LEN)
                };
                self.out.write_all(self.padding[0..len].as_bytes())?;
            }
        }
        self.out.write_all(b"\n")?;
        Ok(())
    }

    pub fn write_data_row(&mut self, data: &[(&str, Highlight)]) -> Result<()> {
        let row: Vec<(&str, Option<Style>)> = data
            .iter()
            .map(|(text, highlight)| (*text, highlight_style(*highlight)))
            .collect();
        self.write_row(&row, true)
    }

    pub fn print(&mut self, s: &str) -> Result<()> {
        self.out.write_all(s.as_bytes())?;
        Ok(())
    }

    pub fn finish(self) -> Result<O> {
        self.out
            .into_inner()
            .map_err(|e| anyhow!("flushing the buffer: {}", e.error()))
    }
}

/// Print a whole `TableView`, preceded by its name, with column widths
/// fitted to the contents.
pub fn print_table_view<O: Write + IsTerminal>(
    table: &dyn TableView,
    opts: &TerminalTableOpts,
    mut out: O,
) -> Result<O> {
    const SPACING: usize = 2;

    let header = table.table_view_header();
    let titles: Vec<String> = header.iter().map(|h| h.label_with_unit(" ").into()).collect();
    let body: Vec<_> = table.table_view_body().collect();

    let mut widths: Vec<usize> = titles.iter().map(|t| t.chars().count()).collect();
    for row in &body {
        for (width, (text, _)) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(text.chars().count());
        }
    }
    let widths: Vec<usize> = widths
        .iter()
        .take(titles.len().saturating_sub(1))
        .map(|w| w + SPACING)
        .collect();
    let number_columns: Vec<bool> = header
        .iter()
        .map(|h| h.formatting == ColumnFormatting::Number)
        .collect();

    if !opts.tsv {
        writeln!(out, "{}:", table.table_name())?;
    }
    let title_refs: Vec<&str> = titles.iter().map(|t| t.as_str()).collect();
    let mut tt = TerminalTable::start(&widths, &title_refs, &number_columns, opts.clone(), out)?;
    for row in &body {
        let cells: Vec<(&str, Highlight)> = row.iter().map(|(t, h)| (t.as_ref(), *h)).collect();
        tt.write_data_row(&cells)?;
    }
    tt.print("\n")?;
    tt.finish()
}

#[cfg(test)]
mod tests {
    use std::{
        borrow::Cow,
        fs::File,
        io::{self, Read, Seek, SeekFrom},
    };

    use super::*;
    use crate::output_table::ColumnHeader;

    /// Output that is not a terminal: an anonymous temporary file
    /// (`IsTerminal` is sealed, so an in-memory type can't implement it).
    fn buf() -> io::Result<File> {
        tempfile::tempfile()
    }

    /// Read back everything written to `f`.
    fn contents(mut f: File) -> io::Result<Vec<u8>> {
        f.seek(SeekFrom::Start(0))?;
        let mut v = Vec::new();
        f.read_to_end(&mut v)?;
        Ok(v)
    }

    struct Fixed;

    impl TableView for Fixed {
        fn table_name(&self) -> Cow<'_, str> {
            "Fixed".into()
        }

        fn table_view_header(&self) -> Cow<'_, [ColumnHeader]> {
            vec![
                ColumnHeader::string("lang"),
                ColumnHeader::number("fps", None),
            ]
            .into()
        }

        fn table_view_body<'s>(
            &'s self,
        ) -> Box<dyn Iterator<Item = Cow<'s, [(Cow<'s, str>, Highlight)]>> + 's> {
            Box::new(
                [("Rust", "61"), ("Go", "120")]
                    .into_iter()
                    .map(|(a, b)| {
                        Cow::Owned(vec![
                            (Cow::Borrowed(a), Highlight::Neutral),
                            (Cow::Borrowed(b), Highlight::Red),
                        ])
                    }),
            )
        }
    }

    #[test]
    fn t_human_readable() -> Result<()> {
        let out = print_table_view(&Fixed, &TerminalTableOpts::default(), buf()?)?;
        let s = String::from_utf8(contents(out)?)?;
        assert_eq!(s, "Fixed:\nlang  fps\nRust  61\nGo    120\n\n");
        Ok(())
    }

    #[test]
    fn t_tsv() -> Result<()> {
        let opts = TerminalTableOpts {
            tsv: true,
            color: ColorOpt::Always,
        };
        let out = print_table_view(&Fixed, &opts, buf()?)?;
        let s = String::from_utf8(contents(out)?)?;
        assert_eq!(s, "lang\tfps\nRust\t61\nGo\t120\n\n");
        Ok(())
    }

    #[test]
    fn t_color_opt() {
        assert_eq!("never".parse::<ColorOpt>().unwrap(), ColorOpt::Never);
        assert!(ColorOpt::Auto.want_color(true));
        assert!(!ColorOpt::Auto.want_color(false));
    }
}
