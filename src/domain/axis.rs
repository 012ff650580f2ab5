//! Watermark axes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One dimension of the composite watermark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    /// Primary ordering key: the row's update timestamp
    UpdateTs,
    /// Secondary dimension within one update timestamp
    Partition,
}

impl Axis {
    /// Both axes, update-ts first
    pub const ALL: [Axis; 2] = [Axis::UpdateTs, Axis::Partition];

    /// Stable lowercase name used in logs and the CLI
    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::UpdateTs => "update_ts",
            Axis::Partition => "partition",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Axis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "update_ts" | "update" | "update-ts" => Ok(Axis::UpdateTs),
            "partition" => Ok(Axis::Partition),
            other => Err(format!(
                "Invalid axis '{other}'. Must be one of: update_ts, partition"
            )),
        }
    }
}
