// Memory accounting models and the selection policy between them

use std::path::{Path, PathBuf};

use tracing::instrument;

use super::CommandRunner;
use crate::config::MonitoringConfig;
use crate::models::{MemMode, RamInfo};

/// Fixed counter set read from the kernel meminfo pseudo-file, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeminfoSnapshot {
    pub mem_total: u64,
    pub mem_free: u64,
    pub mem_available: u64,
    pub buffers: u64,
    pub cached: u64,
    pub swap_total: u64,
    pub swap_free: u64,
    pub swap_cached: u64,
    pub shmem: u64,
    pub sreclaimable: u64,
    pub zswap: u64,
    pub zswapped: u64,
}

impl MeminfoSnapshot {
    /// Parse meminfo text. Values are kB and converted to bytes; unknown
    /// keys are ignored and malformed values skipped.
    pub fn parse(text: &str) -> Self {
        let mut info = Self::default();
        for line in text.lines() {
            let mut fields = line.split_whitespace();
            let (Some(key), Some(value)) = (fields.next(), fields.next()) else {
                continue;
            };
            let Ok(value) = value.parse::<u64>() else {
                continue;
            };
            let value = value * 1024;
            match key.trim_end_matches(':') {
                "MemTotal" => info.mem_total = value,
                "MemFree" => info.mem_free = value,
                "MemAvailable" => info.mem_available = value,
                "Buffers" => info.buffers = value,
                "Cached" => info.cached = value,
                "SwapTotal" => info.swap_total = value,
                "SwapFree" => info.swap_free = value,
                "SwapCached" => info.swap_cached = value,
                "Shmem" => info.shmem = value,
                "SReclaimable" => info.sreclaimable = value,
                "Zswap" => info.zswap = value,
                "Zswapped" => info.zswapped = value,
                _ => {}
            }
        }
        info
    }

    /// Read and parse the kernel meminfo pseudo-file. Fails only when the
    /// file cannot be opened.
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::parse(&text))
    }

    /// htop's used-memory convention: reclaimable, cache and buffer pages
    /// are not "used", and Zswap-held pages are not counted twice.
    pub fn htop_like(&self) -> RamInfo {
        let mut info = RamInfo {
            total: self.mem_total,
            used: 0,
            mode: MemMode::HtopLike,
        };

        let used_diff = self.mem_free + self.cached + self.sreclaimable + self.buffers;
        info.used = if self.mem_total >= used_diff {
            self.mem_total - used_diff
        } else {
            self.mem_total - self.mem_free
        };

        if self.zswap > 0 || self.zswapped > 0 {
            info.used = info.used.saturating_sub(self.zswap);
        }
        info
    }

    /// Swap usage: total minus free and cached, falling back to total minus
    /// free if the deductions overshoot.
    pub fn swap(&self) -> RamInfo {
        let mut info = RamInfo {
            total: self.swap_total,
            used: 0,
            mode: MemMode::HtopLike,
        };
        let deductions = self.swap_free + self.swap_cached;
        info.used = if self.swap_total >= deductions {
            self.swap_total - deductions
        } else {
            self.swap_total - self.swap_free
        };
        info
    }
}

/// Whole-system memory counters from the platform library.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VirtualMemory {
    pub total: u64,
    pub available: u64,
    pub free: u64,
}

/// Whole-system swap counters from the platform library.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwapMemory {
    pub total: u64,
    pub used: u64,
}

pub trait MemorySource {
    fn virtual_memory(&self) -> anyhow::Result<VirtualMemory>;
    fn swap_memory(&self) -> anyhow::Result<SwapMemory>;
}

pub struct MemoryProbe<S, R> {
    source: S,
    runner: R,
    meminfo_path: PathBuf,
}

impl<S: MemorySource, R: CommandRunner> MemoryProbe<S, R> {
    pub fn new(source: S, runner: R) -> Self {
        Self::with_meminfo_path(source, runner, "/proc/meminfo")
    }

    pub fn with_meminfo_path(source: S, runner: R, meminfo_path: impl Into<PathBuf>) -> Self {
        Self {
            source,
            runner,
            meminfo_path: meminfo_path.into(),
        }
    }

    fn snapshot(&self) -> anyhow::Result<MeminfoSnapshot> {
        MeminfoSnapshot::read(&self.meminfo_path)
    }

    /// htop-like model. Zero-valued off Linux or when the kernel snapshot is
    /// unavailable or reports no memory.
    pub fn htop_like(&self) -> RamInfo {
        if cfg!(target_os = "linux") {
            if let Ok(snapshot) = self.snapshot() {
                if snapshot.mem_total > 0 {
                    return snapshot.htop_like();
                }
            }
        }
        RamInfo::zero(MemMode::HtopLike)
    }

    /// Generic platform model: used = total - available.
    pub fn platform(&self) -> RamInfo {
        let mut info = RamInfo::zero(MemMode::Platform);
        if let Ok(vm) = self.source.virtual_memory() {
            info.total = vm.total;
            info.used = vm.total.saturating_sub(vm.available);
        }
        info
    }

    /// What the `free` utility reports, for hosts where every other model
    /// gets disputed. Zero-valued on platforms without `free`.
    pub fn call_free(&self) -> RamInfo {
        let mut info = RamInfo::zero(MemMode::CallFree);
        if !cfg!(any(target_os = "linux", target_os = "freebsd")) {
            return info;
        }

        let Ok(out) = self.runner.run("free", &["-b"]) else {
            return info;
        };

        // Header line first, then: Mem: total used free shared buff/cache available
        for line in out.lines().skip(1) {
            if line.starts_with("Mem:") {
                let fields: Vec<&str> = line.split_whitespace().collect();
                if fields.len() >= 3 {
                    if let Ok(total) = fields[1].parse() {
                        info.total = total;
                    }
                    if let Ok(used) = fields[2].parse() {
                        info.used = used;
                    }
                }
                break;
            }
        }
        info
    }

    /// Cache-counts-as-used model: used = total - free.
    pub fn include_cache(&self) -> RamInfo {
        let mut info = RamInfo::zero(MemMode::IncludeCache);
        if let Ok(vm) = self.source.virtual_memory() {
            info.total = vm.total;
            info.used = vm.total.saturating_sub(vm.free);
        }
        info
    }

    /// Select the RAM accounting model per configuration; first applicable
    /// rule wins.
    #[instrument(skip(self, config), fields(probe = "memory", operation = "ram"))]
    pub fn ram(&self, config: &MonitoringConfig) -> RamInfo {
        if config.memory_include_cache {
            return self.include_cache();
        }

        if config.memory_report_raw_used {
            return self.htop_like();
        }

        if cfg!(target_os = "linux") {
            let htop = self.htop_like();
            if htop.total > 0 {
                return htop;
            }
        }

        self.platform()
    }

    /// Swap usage from the kernel snapshot, falling back to the platform
    /// reading. A failed fallback reading yields zeros, not an error.
    #[instrument(skip(self), fields(probe = "memory", operation = "swap"))]
    pub fn swap(&self) -> RamInfo {
        if cfg!(target_os = "linux") {
            if let Ok(snapshot) = self.snapshot() {
                return snapshot.swap();
            }
        }

        let mut info = RamInfo::zero(MemMode::Platform);
        if let Ok(swap) = self.source.swap_memory() {
            info.total = swap.total;
            info.used = swap.used;
        }
        info
    }
}
