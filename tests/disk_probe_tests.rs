// Disk classification, deduplication and aggregation tests

mod common;

use common::{FailingPartitions, StaticPartitions, UsageTable, part};
use hostprobe::config::MonitoringConfig;
use hostprobe::probes::{DiskProbe, is_physical_disk};

fn allowlist_config(list: &str) -> MonitoringConfig {
    MonitoringConfig {
        include_mountpoints: list.into(),
        ..Default::default()
    }
}

#[test]
fn test_root_mountpoint_is_always_physical() {
    // Even a loop-mounted or tmpfs root counts (LXC containers).
    assert!(is_physical_disk(&part("/dev/loop0", "/", "ext4", &[])));
    assert!(is_physical_disk(&part("rootfs", "/", "tmpfs", &[])));
}

#[test]
fn test_excluded_mountpoint_prefixes() {
    assert!(!is_physical_disk(&part("/dev/sda1", "/tmp", "ext4", &[])));
    assert!(!is_physical_disk(&part("/dev/sda1", "/run/lock/foo", "ext4", &[])));
    assert!(!is_physical_disk(&part("tmpfs", "/dev/shm", "tmpfs", &[])));
    assert!(!is_physical_disk(&part("/dev/sda1", "/etc/hostname", "ext4", &[])));
    assert!(!is_physical_disk(&part("/dev/sda1", "/nix/store", "ext4", &[])));
}

#[test]
fn test_autofs_trigger_excluded_unless_dev_backed() {
    assert!(!is_physical_disk(&part("systemd-1", "/mnt/auto", "autofs", &[])));
    assert!(is_physical_disk(&part("/dev/sdb1", "/mnt/auto", "autofs", &[])));
}

#[test]
fn test_fuseblk_is_always_physical() {
    // ntfs-3g mounts: fuse-prefixed fstype, but a real disk.
    assert!(is_physical_disk(&part("/dev/sdb2", "/mnt/windows", "fuseblk", &[])));
}

#[test]
fn test_excluded_fstype_prefixes() {
    assert!(!is_physical_disk(&part("tmpfs", "/mnt/scratch", "tmpfs", &[])));
    assert!(!is_physical_disk(&part("server:/export", "/mnt/nfs", "nfs4", &[])));
    assert!(!is_physical_disk(&part("//srv/share", "/mnt/share", "cifs", &[])));
    assert!(!is_physical_disk(&part("overlay", "/mnt/layer", "overlay", &[])));
    assert!(!is_physical_disk(&part("gvfs", "/mnt/gvfs", "fuse.gvfsd-fuse", &[])));
}

#[test]
fn test_remote_mount_option_excludes() {
    assert!(!is_physical_disk(&part(
        "Z:",
        "/mnt/mapped",
        "drvfs",
        &["rw", "Remote"]
    )));
    assert!(!is_physical_disk(&part(
        "X:",
        "/mnt/mapped2",
        "drvfs",
        &["network-drive"]
    )));
    assert!(is_physical_disk(&part("/dev/sdc1", "/data", "xfs", &["rw", "noatime"])));
}

#[test]
fn test_loop_device_excluded() {
    assert!(!is_physical_disk(&part("/dev/loop3", "/mnt/snap", "squashfs", &[])));
}

#[test]
fn test_aggregate_sums_physical_partitions() {
    let probe = DiskProbe::new(
        StaticPartitions(vec![
            part("/dev/sda1", "/", "ext4", &["rw"]),
            part("/dev/sdb1", "/data", "xfs", &["rw"]),
            part("tmpfs", "/dev/shm", "tmpfs", &["rw"]),
        ]),
        UsageTable::of(&[("/", 1000, 400), ("/data", 2000, 500), ("/dev/shm", 64, 1)]),
    );
    let info = probe.aggregate(&MonitoringConfig::default());
    assert_eq!(info.total, 3000);
    assert_eq!(info.used, 900);
}

#[test]
fn test_zfs_pool_dedup_keeps_larger_capacity_entry() {
    // Two datasets of one pool: the quota'd one must not shrink the figure.
    let probe = DiskProbe::new(
        StaticPartitions(vec![
            part("tank/home", "/home", "zfs", &[]),
            part("tank/media", "/media", "zfs", &[]),
        ]),
        UsageTable::of(&[("/home", 500, 100), ("/media", 2000, 900)]),
    );
    let info = probe.aggregate(&MonitoringConfig::default());
    assert_eq!(info.total, 2000);
    assert_eq!(info.used, 900);
}

#[test]
fn test_zfs_dedup_tie_contributes_exactly_once() {
    let probe = DiskProbe::new(
        StaticPartitions(vec![
            part("tank/a", "/a", "zfs", &[]),
            part("tank/b", "/b", "zfs", &[]),
        ]),
        UsageTable::of(&[("/a", 1000, 200), ("/b", 1000, 300)]),
    );
    let info = probe.aggregate(&MonitoringConfig::default());
    // Tie-break is arbitrary; the invariant is a single contribution.
    assert_eq!(info.total, 1000);
    assert!(info.used == 200 || info.used == 300);
}

#[test]
fn test_non_zfs_devices_are_not_pooled() {
    let probe = DiskProbe::new(
        StaticPartitions(vec![
            part("/dev/sda1", "/", "ext4", &[]),
            part("/dev/sda2", "/var", "ext4", &[]),
        ]),
        UsageTable::of(&[("/", 1000, 100), ("/var", 500, 50)]),
    );
    let info = probe.aggregate(&MonitoringConfig::default());
    assert_eq!(info.total, 1500);
    assert_eq!(info.used, 150);
}

#[test]
fn test_bind_style_duplicate_device_counted_once() {
    let probe = DiskProbe::new(
        StaticPartitions(vec![
            part("/dev/sda1", "/", "ext4", &[]),
            part("/dev/sda1", "/srv/mirror", "ext4", &[]),
        ]),
        UsageTable::of(&[("/", 1000, 100), ("/srv/mirror", 1000, 100)]),
    );
    let info = probe.aggregate(&MonitoringConfig::default());
    assert_eq!(info.total, 1000);
    assert_eq!(info.used, 100);
}

#[test]
fn test_per_partition_usage_failure_is_skipped() {
    let probe = DiskProbe::new(
        StaticPartitions(vec![
            part("/dev/sda1", "/", "ext4", &[]),
            part("/dev/sdb1", "/stale", "ext4", &[]),
        ]),
        // No entry for /stale: its query fails and the entry is skipped.
        UsageTable::of(&[("/", 1000, 400)]),
    );
    let info = probe.aggregate(&MonitoringConfig::default());
    assert_eq!(info.total, 1000);
    assert_eq!(info.used, 400);
}

#[test]
fn test_enumeration_failure_degrades_to_zero_aggregate() {
    let probe = DiskProbe::new(FailingPartitions, UsageTable::of(&[]));
    let info = probe.aggregate(&MonitoringConfig::default());
    assert_eq!(info.total, 0);
    assert_eq!(info.used, 0);
}

#[test]
fn test_allowlist_bypasses_classification() {
    // /dev/shm would be excluded by classification; the allow-list wins.
    let probe = DiskProbe::new(
        StaticPartitions(vec![part("tmpfs", "/dev/shm", "tmpfs", &[])]),
        UsageTable::of(&[("/dev/shm", 64, 8), ("/data", 2000, 500)]),
    );
    let info = probe.aggregate(&allowlist_config("/data; /dev/shm"));
    assert_eq!(info.total, 2064);
    assert_eq!(info.used, 508);
}

#[test]
fn test_allowlist_skips_failing_entries_and_empties() {
    let probe = DiskProbe::new(
        StaticPartitions(vec![]),
        UsageTable::of(&[("/data", 2000, 500)]),
    );
    let info = probe.aggregate(&allowlist_config("/data;;/missing; "));
    assert_eq!(info.total, 2000);
    assert_eq!(info.used, 500);
}

#[test]
fn test_list_mountpoints_labels_physical_partitions() {
    let probe = DiskProbe::new(
        StaticPartitions(vec![
            part("/dev/sda1", "/", "ext4", &[]),
            part("tmpfs", "/run", "tmpfs", &[]),
            part("/dev/sdb1", "/data", "xfs", &[]),
        ]),
        UsageTable::of(&[]),
    );
    let list = probe.list_mountpoints(&MonitoringConfig::default()).unwrap();
    assert_eq!(list, vec!["/ (ext4)", "/data (xfs)"]);
}

#[test]
fn test_list_mountpoints_returns_allowlist_verbatim() {
    let probe = DiskProbe::new(StaticPartitions(vec![]), UsageTable::of(&[]));
    let list = probe
        .list_mountpoints(&allowlist_config("/data; /backup"))
        .unwrap();
    assert_eq!(list, vec!["/data", "/backup"]);
}

#[test]
fn test_list_mountpoints_propagates_enumeration_failure() {
    let probe = DiskProbe::new(FailingPartitions, UsageTable::of(&[]));
    let err = probe
        .list_mountpoints(&MonitoringConfig::default())
        .unwrap_err();
    assert!(err.to_string().contains("mount table"));
}

#[test]
fn test_aggregate_is_idempotent() {
    let probe = DiskProbe::new(
        StaticPartitions(vec![
            part("/dev/sda1", "/", "ext4", &[]),
            part("tank/home", "/home", "zfs", &[]),
        ]),
        UsageTable::of(&[("/", 1000, 400), ("/home", 2000, 500)]),
    );
    let config = MonitoringConfig::default();
    assert_eq!(probe.aggregate(&config), probe.aggregate(&config));
}
