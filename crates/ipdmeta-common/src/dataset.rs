//! Names of the three dataset partitions and the files derived from them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitName {
    Pilot,
    Development,
    Validation,
}

impl SplitName {
    pub const ALL: [SplitName; 3] = [SplitName::Pilot, SplitName::Development, SplitName::Validation];

    pub fn as_str(&self) -> &'static str {
        match self {
            SplitName::Pilot       => "pilot",
            SplitName::Development => "development",
            SplitName::Validation  => "validation",
        }
    }

    /// `pilot_set.json` etc., written by the structurer.
    pub fn set_file(&self) -> String {
        format!("{}_set.json", self.as_str())
    }

    /// `pilot_output.csv` etc., written by the extractor.
    pub fn output_file(&self) -> String {
        format!("{}_output.csv", self.as_str())
    }

    pub fn failures_file(&self) -> String {
        format!("{}_failures.csv", self.as_str())
    }

    pub fn audit_file(&self) -> String {
        format!("{}_audit.jsonl", self.as_str())
    }
}

impl fmt::Display for SplitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SplitName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pilot"       => Ok(SplitName::Pilot),
            "development" => Ok(SplitName::Development),
            "validation"  => Ok(SplitName::Validation),
            other => Err(format!("unknown split '{other}' (expected pilot, development or validation)")),
        }
    }
}
