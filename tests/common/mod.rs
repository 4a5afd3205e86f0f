// Shared test fixtures: synthetic OS collaborators
#![allow(dead_code)]

use std::collections::HashMap;

use hostprobe::probes::{
    CommandRunner, MemorySource, PartitionLister, PartitionRecord, SwapMemory, UsageReader,
    UsageStat, VirtualMemory,
};

pub fn part(device: &str, mountpoint: &str, fstype: &str, options: &[&str]) -> PartitionRecord {
    PartitionRecord {
        device: device.into(),
        mountpoint: mountpoint.into(),
        fstype: fstype.into(),
        options: options.iter().map(|o| o.to_string()).collect(),
    }
}

pub struct StaticPartitions(pub Vec<PartitionRecord>);

impl PartitionLister for StaticPartitions {
    fn partitions(&self) -> anyhow::Result<Vec<PartitionRecord>> {
        Ok(self.0.clone())
    }
}

pub struct FailingPartitions;

impl PartitionLister for FailingPartitions {
    fn partitions(&self) -> anyhow::Result<Vec<PartitionRecord>> {
        Err(anyhow::anyhow!("mount table unavailable"))
    }
}

/// Usage per mountpoint; missing entries fail like a statvfs error.
pub struct UsageTable(pub HashMap<String, UsageStat>);

impl UsageTable {
    pub fn of(entries: &[(&str, u64, u64)]) -> Self {
        Self(
            entries
                .iter()
                .map(|(mount, total, used)| {
                    (
                        mount.to_string(),
                        UsageStat {
                            total: *total,
                            used: *used,
                        },
                    )
                })
                .collect(),
        )
    }
}

impl UsageReader for UsageTable {
    fn usage(&self, mountpoint: &str) -> anyhow::Result<UsageStat> {
        self.0
            .get(mountpoint)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("statvfs({mountpoint}) failed"))
    }
}

/// Memory source returning fixed counters; `None` fields fail the read.
#[derive(Default)]
pub struct StaticMemory {
    pub vm: Option<VirtualMemory>,
    pub swap: Option<SwapMemory>,
}

impl MemorySource for StaticMemory {
    fn virtual_memory(&self) -> anyhow::Result<VirtualMemory> {
        self.vm.ok_or_else(|| anyhow::anyhow!("no virtual memory"))
    }

    fn swap_memory(&self) -> anyhow::Result<SwapMemory> {
        self.swap.ok_or_else(|| anyhow::anyhow!("no swap memory"))
    }
}

/// Command runner replaying canned stdout; `None` fails like a missing
/// binary.
pub struct ScriptedRunner(pub Option<String>);

impl ScriptedRunner {
    pub fn output(stdout: &str) -> Self {
        Self(Some(stdout.to_string()))
    }

    pub fn failing() -> Self {
        Self(None)
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, _args: &[&str]) -> anyhow::Result<String> {
        self.0
            .clone()
            .ok_or_else(|| anyhow::anyhow!("{program}: command not found"))
    }
}
