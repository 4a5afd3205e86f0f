// Linux/Unix backends for the probe collaborator traits

use std::path::PathBuf;
use std::process::Command;

use anyhow::Context;

use super::memory::{MemorySource, SwapMemory, VirtualMemory};
use super::{CommandRunner, PartitionLister, PartitionRecord, UsageReader, UsageStat};

/// Partition lister backed by /proc/mounts.
pub struct ProcMounts {
    path: PathBuf,
}

impl ProcMounts {
    pub fn new() -> Self {
        Self::with_path("/proc/mounts")
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for ProcMounts {
    fn default() -> Self {
        Self::new()
    }
}

impl PartitionLister for ProcMounts {
    fn partitions(&self) -> anyhow::Result<Vec<PartitionRecord>> {
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("read {}", self.path.display()))?;
        Ok(parse_mount_table(&text))
    }
}

/// Parse mount-table lines: device mountpoint fstype options dump pass.
fn parse_mount_table(text: &str) -> Vec<PartitionRecord> {
    text.lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let device = fields.next()?;
            let mountpoint = fields.next()?;
            let fstype = fields.next()?;
            let options = fields.next().unwrap_or("");
            Some(PartitionRecord {
                device: unescape_mount_path(device),
                mountpoint: unescape_mount_path(mountpoint),
                fstype: fstype.to_string(),
                options: options
                    .split(',')
                    .filter(|o| !o.is_empty())
                    .map(String::from)
                    .collect(),
            })
        })
        .collect()
}

/// The kernel escapes spaces and tabs octal-style in mount paths.
fn unescape_mount_path(s: &str) -> String {
    s.replace("\\040", " ").replace("\\011", "\t")
}

/// Per-mountpoint usage via statvfs. total = blocks * frsize,
/// used = (blocks - bfree) * frsize.
pub struct Statvfs;

impl UsageReader for Statvfs {
    fn usage(&self, mountpoint: &str) -> anyhow::Result<UsageStat> {
        let c_path = std::ffi::CString::new(mountpoint)?;
        let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
        let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
        if rc != 0 {
            return Err(anyhow::anyhow!(
                "statvfs({}): {}",
                mountpoint,
                std::io::Error::last_os_error()
            ));
        }
        let frsize = stat.f_frsize as u64;
        let blocks = stat.f_blocks as u64;
        let bfree = stat.f_bfree as u64;
        Ok(UsageStat {
            total: blocks * frsize,
            used: blocks.saturating_sub(bfree) * frsize,
        })
    }
}

/// Platform memory counters via sysinfo.
pub struct SysinfoMemory;

impl MemorySource for SysinfoMemory {
    fn virtual_memory(&self) -> anyhow::Result<VirtualMemory> {
        let mut sys = sysinfo::System::new();
        sys.refresh_memory();
        Ok(VirtualMemory {
            total: sys.total_memory(),
            available: sys.available_memory(),
            free: sys.free_memory(),
        })
    }

    fn swap_memory(&self) -> anyhow::Result<SwapMemory> {
        let mut sys = sysinfo::System::new();
        sys.refresh_memory();
        Ok(SwapMemory {
            total: sys.total_swap(),
            used: sys.used_swap(),
        })
    }
}

/// Runs external utilities via std::process.
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> anyhow::Result<String> {
        let output = Command::new(program)
            .args(args)
            .output()
            .with_context(|| format!("spawn {program}"))?;
        anyhow::ensure!(
            output.status.success(),
            "{program} exited with {}",
            output.status
        );
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
