#![forbid(unsafe_code)]

//! Accent colors of task groups.
//!
//! Colors are stored as plain RGBA bytes and exchanged as `#RRGGBB` or
//! `#RRGGBBAA` hex strings.

use std::fmt;
use std::str::FromStr;

/// Errors from parsing a hex color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorParseError {
    /// The string did not start with `#`.
    MissingHash,
    /// The digits were neither 6 nor 8 long.
    InvalidLength(usize),
    /// A character was not a hex digit.
    InvalidDigit(char),
}

impl fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingHash => write!(f, "color must start with '#'"),
            Self::InvalidLength(len) => {
                write!(f, "expected 6 or 8 hex digits, found {len}")
            }
            Self::InvalidDigit(c) => write!(f, "invalid hex digit '{c}'"),
        }
    }
}

impl std::error::Error for ColorParseError {}

/// An 8-bit-per-channel RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    /// Create an opaque color.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Create a color with explicit alpha.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#RRGGBB` (opaque) or `#RRGGBBAA`.
    pub fn from_hex(input: &str) -> Result<Self, ColorParseError> {
        let digits = input
            .trim()
            .strip_prefix('#')
            .ok_or(ColorParseError::MissingHash)?;
        if let Some(c) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(ColorParseError::InvalidDigit(c));
        }
        let channel = |i: usize| -> Result<u8, ColorParseError> {
            let pair = &digits[i * 2..i * 2 + 2];
            u8::from_str_radix(pair, 16)
                .map_err(|_| ColorParseError::InvalidDigit(pair.chars().next().unwrap_or('?')))
        };
        match digits.len() {
            6 => Ok(Self::rgb(channel(0)?, channel(1)?, channel(2)?)),
            8 => Ok(Self::new(channel(0)?, channel(1)?, channel(2)?, channel(3)?)),
            len => Err(ColorParseError::InvalidLength(len)),
        }
    }

    /// Format as `#RRGGBB` when opaque, `#RRGGBBAA` otherwise.
    #[must_use]
    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }
}

impl FromStr for Rgba {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
