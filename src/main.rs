use std::path::Path;

use anyhow::Result;
use clap::{Parser, Subcommand};
use hostprobe::config::{AppConfig, MonitoringConfig};
use hostprobe::models::{HostReport, RamInfo};
use hostprobe::probes::{
    DiskProbe, GpuProbe, MeminfoSnapshot, MemoryProbe, ProcMounts, Statvfs, SysinfoMemory,
    SystemRunner,
};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[derive(Parser)]
#[command(name = hostprobe::version::NAME, version = hostprobe::version::VERSION)]
#[command(about = "Normalized disk, memory and GPU measurements for this host")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the full host report as JSON
    Report,
    /// Dump the raw meminfo snapshot and every memory accounting model
    CheckMem,
    /// List the mountpoints counted as physical disks
    DiskList,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::debug!("config not loaded, using defaults: {e:#}");
            AppConfig::default()
        }
    };
    let monitoring = &config.monitoring;

    match Cli::parse().command.unwrap_or(Command::Report) {
        Command::Report => {
            let memory = MemoryProbe::new(SysinfoMemory, SystemRunner);
            let report = HostReport {
                disk: DiskProbe::new(ProcMounts::new(), Statvfs).aggregate(monitoring),
                ram: memory.ram(monitoring),
                swap: memory.swap(),
                gpu: GpuProbe::new(SystemRunner).name(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::CheckMem => check_mem(monitoring),
        Command::DiskList => {
            let probe = DiskProbe::new(ProcMounts::new(), Statvfs);
            for entry in probe.list_mountpoints(monitoring)? {
                println!("{entry}");
            }
        }
    }

    Ok(())
}

/// Print every memory accounting model side by side, for hosts where the
/// reported figure gets disputed against free/htop.
fn check_mem(config: &MonitoringConfig) {
    const MIB: u64 = 1024 * 1024;

    if let Ok(info) = MeminfoSnapshot::read(Path::new("/proc/meminfo")) {
        println!("--- /proc/meminfo ---");
        println!("MemTotal:     {} MiB", info.mem_total / MIB);
        println!("MemFree:      {} MiB", info.mem_free / MIB);
        println!("MemAvailable: {} MiB", info.mem_available / MIB);
        println!("Buffers:      {} MiB", info.buffers / MIB);
        println!("Cached:       {} MiB", info.cached / MIB);
        println!("SwapTotal:    {} MiB", info.swap_total / MIB);
        println!("SwapFree:     {} MiB", info.swap_free / MIB);
        println!("SwapCached:   {} MiB", info.swap_cached / MIB);
        println!("Shmem:        {} MiB", info.shmem / MIB);
        println!("SReclaimable: {} MiB", info.sreclaimable / MIB);
        println!("Zswap:        {} MiB", info.zswap / MIB);
        println!("Zswapped:     {} MiB", info.zswapped / MIB);
        println!("---------------------");
    }

    let print_ram = |info: RamInfo| {
        println!(
            "[{}] Total: {} bytes ({} MiB), Used: {} bytes ({} MiB)",
            info.mode,
            info.total,
            info.total / MIB,
            info.used,
            info.used / MIB,
        );
    };

    let memory = MemoryProbe::new(SysinfoMemory, SystemRunner);
    print_ram(memory.htop_like());
    print_ram(memory.platform());
    print_ram(memory.call_free());

    println!("--- Current Configured ---");
    print_ram(memory.ram(config));
}
