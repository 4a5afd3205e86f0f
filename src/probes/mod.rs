// Resolver probes and their OS-facing collaborators

pub mod disk;
pub mod gpu;
pub mod memory;
mod os;

pub use disk::{
    DiskProbe, PartitionLister, PartitionRecord, UsageReader, UsageStat, is_physical_disk,
};
pub use gpu::{GpuProbe, decode_soc_model};
pub use memory::{MeminfoSnapshot, MemoryProbe, MemorySource, SwapMemory, VirtualMemory};
pub use os::{ProcMounts, Statvfs, SysinfoMemory, SystemRunner};

/// Runs an external utility to completion and captures stdout as text.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> anyhow::Result<String>;
}
