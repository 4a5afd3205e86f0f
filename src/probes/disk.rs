// Disk partition classification, deduplication and aggregation

use std::collections::HashMap;

use tracing::instrument;

use crate::config::MonitoringConfig;
use crate::models::DiskInfo;

/// One OS-reported mount, as noisy as the kernel reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionRecord {
    pub device: String,
    pub mountpoint: String,
    pub fstype: String,
    pub options: Vec<String>,
}

/// Capacity and usage of a single mountpoint, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageStat {
    pub total: u64,
    pub used: u64,
}

/// Full mount table, pseudo filesystems included.
pub trait PartitionLister {
    fn partitions(&self) -> anyhow::Result<Vec<PartitionRecord>>;
}

/// Live usage query for one mountpoint.
pub trait UsageReader {
    fn usage(&self, mountpoint: &str) -> anyhow::Result<UsageStat>;
}

/// Mountpoint prefixes that never count toward physical capacity.
/// "/etc/host" also covers /etc/hosts and /etc/hostname.
const EXCLUDED_MOUNTPOINTS: &[&str] = &[
    "/tmp",
    "/var/tmp",
    "/dev/shm",
    "/run",
    "/run/lock",
    "/run/user",
    "/var/lib/containers",
    "/var/lib/docker",
    "/proc",
    "/dev/pts",
    "/sys",
    "/sys/fs/cgroup",
    "/dev/mqueue",
    "/etc/resolv.conf",
    "/etc/host",
    "/dev/hugepages",
    "/nix/store",
];

/// Filesystem type prefixes for pseudo, network and shared-folder mounts.
const EXCLUDED_FSTYPES: &[&str] = &[
    "tmpfs",
    "devtmpfs",
    "nfs",
    "cifs",
    "smb",
    "vboxsf",
    "9p",
    "fuse",
    "overlay",
    "proc",
    "devpts",
    "sysfs",
    "cgroup",
    "mqueue",
    "hugetlbfs",
];

/// Decide whether a partition backs real storage. Rules are ordered; the
/// first match wins.
pub fn is_physical_disk(part: &PartitionRecord) -> bool {
    // LXC and other loop-mounted roots still count as the root disk.
    if part.mountpoint == "/" {
        return true;
    }

    let mountpoint = part.mountpoint.to_lowercase();
    if EXCLUDED_MOUNTPOINTS
        .iter()
        .any(|mp| mountpoint.starts_with(mp))
    {
        return false;
    }

    let fstype = part.fstype.to_lowercase();

    // autofs trigger mounts: the real filesystem shows up as its own
    // partition, counting the trigger would double it.
    if fstype == "autofs" && !part.device.starts_with("/dev/") {
        return false;
    }

    // ntfs-3g mounts report as fuseblk but back a real disk.
    if fstype == "fuseblk" {
        return true;
    }

    if EXCLUDED_FSTYPES.iter().any(|fs| fstype.starts_with(fs)) {
        return false;
    }

    // Network drives are hard to spot by fstype alone; mount options
    // usually carry a remote/network token.
    let options = part.options.join(",").to_lowercase();
    if options.contains("remote") || options.contains("network") {
        return false;
    }

    if part.device.starts_with("/dev/loop") {
        return false;
    }

    true
}

/// Deduplication key: the device, except ZFS datasets collapse to their
/// pool name (pool/dataset -> pool).
fn logical_device_key(part: &PartitionRecord) -> &str {
    if part.fstype.eq_ignore_ascii_case("zfs") {
        if let Some(idx) = part.device.find('/') {
            return &part.device[..idx];
        }
    }
    &part.device
}

pub struct DiskProbe<L, U> {
    lister: L,
    usage: U,
}

impl<L: PartitionLister, U: UsageReader> DiskProbe<L, U> {
    pub fn new(lister: L, usage: U) -> Self {
        Self { lister, usage }
    }

    /// Total/used bytes over the deduplicated physical partition set, or
    /// over the configured allow-list when one is present. Degrades to a
    /// zero aggregate when the mount table cannot be enumerated.
    #[instrument(skip(self, config), fields(probe = "disk", operation = "aggregate"))]
    pub fn aggregate(&self, config: &MonitoringConfig) -> DiskInfo {
        let mut info = DiskInfo::default();

        let allowlist = config.mountpoint_allowlist();
        if !allowlist.is_empty() {
            for mountpoint in allowlist {
                let Ok(usage) = self.usage.usage(mountpoint) else {
                    continue;
                };
                info.total += usage.total;
                info.used += usage.used;
            }
            return info;
        }

        let Ok(partitions) = self.lister.partitions() else {
            return info;
        };

        let mut by_device: HashMap<String, UsageStat> = HashMap::new();
        for part in &partitions {
            if !is_physical_disk(part) {
                continue;
            }
            let Ok(usage) = self.usage.usage(&part.mountpoint) else {
                continue;
            };

            // A quota'd dataset reports a smaller total than its pool; keep
            // the larger figure per logical device.
            let key = logical_device_key(part);
            let keep_existing = by_device
                .get(key)
                .is_some_and(|existing| usage.total <= existing.total);
            if !keep_existing {
                by_device.insert(key.to_string(), usage);
            }
        }

        for usage in by_device.values() {
            info.total += usage.total;
            info.used += usage.used;
        }
        info
    }

    /// Descriptive labels for every mountpoint the aggregate would count.
    /// Unlike [`Self::aggregate`], enumeration failure propagates.
    #[instrument(skip(self, config), fields(probe = "disk", operation = "list_mountpoints"))]
    pub fn list_mountpoints(&self, config: &MonitoringConfig) -> anyhow::Result<Vec<String>> {
        let allowlist = config.mountpoint_allowlist();
        if !allowlist.is_empty() {
            return Ok(allowlist.into_iter().map(String::from).collect());
        }

        let partitions = self.lister.partitions()?;
        Ok(partitions
            .iter()
            .filter(|p| is_physical_disk(p))
            .map(|p| format!("{} ({})", p.mountpoint, p.fstype))
            .collect())
    }
}
