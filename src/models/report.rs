// Combined host report (CLI output envelope)

use serde::{Deserialize, Serialize};

use super::{DiskInfo, RamInfo};

/// Sentinel GPU identity when no adapter could be resolved.
pub const NO_GPU: &str = "None";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostReport {
    pub disk: DiskInfo,
    pub ram: RamInfo,
    pub swap: RamInfo,
    pub gpu: String,
}
