//! A representation of tables as title row and body rows of strings
//! plus formatting instructions, independent of serialisation
//! format. `terminal` shows them to humans (or as TSV), `excel` and
//! `tsv` write them to files.

use std::borrow::Cow;

use crate::color::RgbColor;

pub mod excel;
pub mod terminal;
pub mod tsv;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    /// No unit, e.g. for categorical columns
    None,
    /// E.g. "ms" or "fps"
    Label(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Highlight {
    /// No special formatting
    Neutral,
    /// "Bad", e.g. a marker where the frame rate dropped too low
    Red,
    /// Series colour, e.g. of a language
    Color(RgbColor),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnFormatting {
    /// Values are numbers: right-adjusted, and auto-width
    Number,
    /// Values are strings, left-adjusted
    String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnHeader {
    pub label: Cow<'static, str>,
    pub unit: Unit,
    pub formatting: ColumnFormatting,
}

impl ColumnHeader {
    pub fn string(label: impl Into<Cow<'static, str>>) -> Self {
        Self {
            label: label.into(),
            unit: Unit::None,
            formatting: ColumnFormatting::String,
        }
    }

    pub fn number(label: impl Into<Cow<'static, str>>, unit: Option<&'static str>) -> Self {
        Self {
            label: label.into(),
            unit: unit.map(Unit::Label).unwrap_or(Unit::None),
            formatting: ColumnFormatting::Number,
        }
    }

    /// The label with the unit appended on a separate line, if any.
    pub fn label_with_unit(&self, separator: &str) -> Cow<'_, str> {
        match self.unit {
            Unit::None => self.label.as_ref().into(),
            Unit::Label(unit) => format!("{}{separator}({unit})", self.label).into(),
        }
    }
}

/// A full table. dyn compatible.
pub trait TableView {
    fn table_name(&self) -> Cow<'_, str>;

    fn table_view_header(&self) -> Cow<'_, [ColumnHeader]>;

    fn table_view_body<'s>(
        &'s self,
    ) -> Box<dyn Iterator<Item = Cow<'s, [(Cow<'s, str>, Highlight)]>> + 's>;
}

/// Used for missing values in all output formats.
pub const MISSING: &str = "-";

/// Integral values without decimals, others with 2.
pub fn format_number(x: f64) -> String {
    if x.fract() == 0. && x.abs() < 1e15 {
        format!("{x:.0}")
    } else {
        format!("{x:.2}")
    }
}

pub fn format_opt_number(x: Option<f64>) -> String {
    x.map(format_number).unwrap_or_else(|| MISSING.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_format_number() {
        assert_eq!(format_number(1500.), "1500");
        assert_eq!(format_number(-3.), "-3");
        assert_eq!(format_number(1571.4285714), "1571.43");
        assert_eq!(format_number(0.5), "0.50");
        assert_eq!(format_opt_number(None), "-");
    }

    #[test]
    fn t_label_with_unit() {
        let h = ColumnHeader::number("heap_mb", Some("MB"));
        assert_eq!(h.label_with_unit("\n"), "heap_mb\n(MB)");
        let h = ColumnHeader::string("lang");
        assert_eq!(h.label_with_unit(" "), "lang");
    }
}
