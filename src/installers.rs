//! Parser for `softwareupdate --list-full-installers` output.
//!
//! The tool prints one installer per line:
//!
//! ```text
//! * Title: macOS Sonoma, Version: 14.5, Size: 13353707K, Build: 23F79
//! ```
//!
//! Each matching line becomes a [`Suggestion`] keyed by the version; anything
//! else is dropped without failing the batch.

use crate::suggestion::{Suggestion, SuggestionKind};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref INSTALLER_LINE: Regex = Regex::new(
        r"\* ?Title: (?P<name>.*), Version: (?P<version>[0-9.]+), Size: (?P<size>\d+)K(?:iB)?, Build: (?P<build>[0-9A-Z]+)"
    )
    .expect("installer line pattern is valid");
}

/// How the reported kilobyte size becomes the "GB" figure in descriptions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeUnits {
    /// `size / 1000^3`: what the upstream completion spec computes, even
    /// though the input is already in kilobytes.
    #[default]
    Faithful,
    /// `size / 1000^2`
    Decimal,
    /// `size / 1024^2`
    Binary,
}

impl SizeUnits {
    pub fn divisor(self) -> f64 {
        match self {
            SizeUnits::Faithful => 1000f64.powi(3),
            SizeUnits::Decimal => 1000f64.powi(2),
            SizeUnits::Binary => 1024f64.powi(2),
        }
    }

    pub fn to_gigabytes(self, size_kb: u64) -> f64 {
        size_kb as f64 / self.divisor()
    }
}

impl std::str::FromStr for SizeUnits {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "faithful" => Ok(SizeUnits::Faithful),
            "decimal" => Ok(SizeUnits::Decimal),
            "binary" => Ok(SizeUnits::Binary),
            other => Err(format!("unknown size units: {}", other)),
        }
    }
}

/// One installer line, with its fields pulled out.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallerRecord {
    pub name: String,
    pub version: String,
    pub size_kb: u64,
    pub build: String,
}

impl InstallerRecord {
    /// Parse a single line. Returns `None` for anything that is not an
    /// installer entry, including sizes too large for a `u64`.
    pub fn parse(line: &str) -> Option<Self> {
        let caps = INSTALLER_LINE.captures(line)?;
        Some(Self {
            name: caps["name"].to_string(),
            version: caps["version"].to_string(),
            size_kb: caps["size"].parse().ok()?,
            build: caps["build"].to_string(),
        })
    }

    pub fn describe(&self, units: SizeUnits) -> String {
        format!(
            "{} {} ({}) Size: {}GB",
            self.name,
            self.version,
            self.build,
            to_fixed_2(units.to_gigabytes(self.size_kb))
        )
    }

    pub fn to_suggestion(&self, units: SizeUnits) -> Suggestion {
        Suggestion::new(self.version.clone(), SuggestionKind::Arg).with_description(self.describe(units))
    }
}

/// Parse full tool output into installer records, in output order.
pub fn parse_records(output: &str) -> Vec<InstallerRecord> {
    output
        .split('\n')
        .filter(|line| line.starts_with('*'))
        .filter_map(InstallerRecord::parse)
        .collect()
}

/// Parse full tool output straight into suggestions.
pub fn parse_installers(output: &str, units: SizeUnits) -> Vec<Suggestion> {
    parse_records(output)
        .iter()
        .map(|record| record.to_suggestion(units))
        .collect()
}

/// Two-decimal formatting with JavaScript `toFixed` rounding.
///
/// Rust rounds exact binary ties to even; `toFixed` rounds them up. Ties at
/// two decimals only exist for multiples of 1/8, so those are bumped by hand.
fn to_fixed_2(value: f64) -> String {
    let scaled = value * 100.0;
    if (value * 8.0).fract() == 0.0 && scaled.fract() == 0.5 {
        return format!("{:.2}", scaled.ceil() / 100.0);
    }
    format!("{:.2}", value)
}
