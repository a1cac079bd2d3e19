//! `#rrggbb` colours from the configuration, convertible to the
//! terminal and Excel colour types.

use std::{fmt, str::FromStr};

use anyhow::{anyhow, bail};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_u32(self) -> u32 {
        (u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b)
    }
}

impl FromStr for RgbColor {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some(hex) = s.strip_prefix('#') else {
            bail!("colour must start with '#', got {s:?}")
        };
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            bail!("colour must be of the form #rrggbb, got {s:?}")
        }
        let component = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|e| anyhow!("colour {s:?}: {e}"))
        };
        Ok(RgbColor::new(component(0)?, component(2)?, component(4)?))
    }
}

impl TryFrom<String> for RgbColor {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RgbColor> for String {
    fn from(value: RgbColor) -> Self {
        value.to_string()
    }
}

impl fmt::Display for RgbColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let RgbColor { r, g, b } = self;
        write!(f, "#{r:02x}{g:02x}{b:02x}")
    }
}

impl From<RgbColor> for yansi::Color {
    fn from(value: RgbColor) -> Self {
        yansi::Color::Rgb(value.r, value.g, value.b)
    }
}

impl From<RgbColor> for rust_xlsxwriter::Color {
    fn from(value: RgbColor) -> Self {
        rust_xlsxwriter::Color::RGB(value.to_u32())
    }
}
