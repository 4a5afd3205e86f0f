// RAM / swap models

use serde::{Deserialize, Serialize};

/// Which accounting formula produced a [`RamInfo`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemMode {
    #[serde(rename = "htoplike")]
    #[default]
    HtopLike,
    /// Generic platform reading, total - available.
    #[serde(rename = "gopsutil")]
    Platform,
    #[serde(rename = "callFree")]
    CallFree,
    #[serde(rename = "includeCache")]
    IncludeCache,
}

impl std::fmt::Display for MemMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            MemMode::HtopLike => "htoplike",
            MemMode::Platform => "gopsutil",
            MemMode::CallFree => "callFree",
            MemMode::IncludeCache => "includeCache",
        })
    }
}

/// One memory measurement. Used uniformly for RAM and swap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RamInfo {
    pub total: u64,
    pub used: u64,
    pub mode: MemMode,
}

impl RamInfo {
    pub fn zero(mode: MemMode) -> Self {
        Self {
            total: 0,
            used: 0,
            mode,
        }
    }
}
