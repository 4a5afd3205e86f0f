// Domain models

mod disk;
mod memory;
mod report;

pub use disk::DiskInfo;
pub use memory::{MemMode, RamInfo};
pub use report::{HostReport, NO_GPU};
