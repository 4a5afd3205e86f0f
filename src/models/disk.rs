// Disk aggregate model

use serde::{Deserialize, Serialize};

/// Capacity and usage summed over the deduplicated physical partition set.
/// Upstream sources do not guarantee `used <= total`; no clamping is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskInfo {
    pub total: u64,
    pub used: u64,
}
