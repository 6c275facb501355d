//! sysprobe - Windows host telemetry CLI
//!
//! One subcommand per metric family; formatted text by default, `--json`
//! for machine output.

use clap::{Parser, Subcommand};
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use sysprobe::{HostMonitor, HostReport, ProbeConfig};

#[derive(Parser)]
#[command(name = "sysprobe")]
#[command(about = "Windows host telemetry probe", long_about = None)]
struct Cli {
    /// Emit JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show memory usage
    Memory,

    /// Show installed memory modules
    Hardware,

    /// Show CPU load, per-core load and identity
    Cpu,

    /// Show active network interfaces with throughput
    Network,

    /// Show TCP/UDP connection tables
    Connections,

    /// Show the process list with CPU usage
    Processes {
        /// Number of rows to show, sorted by CPU
        #[arg(short, long)]
        top: Option<usize>,
    },

    /// Show partitions and physical disks
    Disk,

    /// Show disk I/O rates
    Diskio,

    /// Show GPU adapters and displays
    Gpu,

    /// Show battery status
    Battery,

    /// Show host identity, uptime and object counts
    System,

    /// Capture one full report
    Report,

    /// Poll a full report on an interval
    Watch {
        /// Seconds between polls
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Show configuration
    Config {
        /// Write the default config file
        #[arg(long)]
        init: bool,
    },
}

/// Counter-backed families need a priming pass, and rate families need a
/// first sample, before live values exist.
async fn warm_up(monitor: &mut HostMonitor) {
    monitor.cpu_load();
    monitor.per_core_load();
    monitor.disk_io();
    monitor.system_stats();
    monitor.network();
    monitor.processes();
    tokio::time::sleep(Duration::from_millis(500)).await;
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    let config = ProbeConfig::default_path()
        .ok()
        .filter(|path| path.exists())
        .and_then(|path| ProbeConfig::load(&path).ok())
        .unwrap_or_default();
    let json = cli.json || config.json_output;

    let mut monitor = HostMonitor::new();

    match cli.command {
        Commands::Memory => {
            let memory = monitor.memory();
            if json {
                println!("{}", serde_json::to_string_pretty(&memory)?);
            } else {
                println!("Memory:");
                println!("  Total:     {}", fmt_bytes(memory.total));
                println!("  Used:      {} ({:.0}%)", fmt_bytes(memory.used), memory.used_percent);
                println!("  Free:      {}", fmt_bytes(memory.free));
                println!("  Swap:      {} / {}", fmt_bytes(memory.swap_used), fmt_bytes(memory.swap_total));
                if let (Some(committed), Some(limit)) = (memory.committed, memory.commit_limit) {
                    println!("  Committed: {} / {}", fmt_bytes(committed), fmt_bytes(limit));
                }
                if let Some(cached) = memory.cached {
                    println!("  Cached:    {}", fmt_bytes(cached));
                }
            }
        }

        Commands::Hardware => {
            let hardware = monitor.memory_hardware();
            if json {
                println!("{}", serde_json::to_string_pretty(&hardware)?);
            } else {
                match hardware.total_slots {
                    Some(total) => println!("Memory modules ({} of {} slots):", hardware.used_slots, total),
                    None => println!("Memory modules ({}):", hardware.used_slots),
                }
                for module in &hardware.modules {
                    println!(
                        "  {:<10} {:>10}  {:>5} MHz  {:<6} {:<7} {}",
                        module.bank.as_deref().unwrap_or("-"),
                        module.capacity.map(fmt_bytes).unwrap_or_else(|| "-".into()),
                        module.speed_mhz.unwrap_or(0),
                        module.memory_type.as_deref().unwrap_or("-"),
                        module.form_factor.as_deref().unwrap_or("-"),
                        module.manufacturer.as_deref().unwrap_or("-"),
                    );
                }
            }
        }

        Commands::Cpu => {
            warm_up(&mut monitor).await;
            let load = monitor.cpu_load();
            let per_core = monitor.per_core_load();
            let identity = monitor.cpu_identity();
            if json {
                let value = serde_json::json!({
                    "load": load,
                    "per_core": per_core,
                    "identity": identity,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                if let Some(brand) = &identity.brand {
                    println!("{}", brand);
                }
                println!(
                    "  Cores:     {} logical / {} physical",
                    identity.logical_cores, identity.physical_cores
                );
                if let Some(speed) = identity.speed_ghz {
                    println!("  Speed:     {:.2} GHz", speed);
                }
                println!("  Load:      {} {:.1}%", bar(load), load);
                for (core, core_load) in per_core.iter().enumerate() {
                    println!("  Core {:<2}    {} {:.1}%", core, bar(*core_load), core_load);
                }
            }
        }

        Commands::Network => {
            // Two polls so the rates have an interval to work with.
            monitor.network();
            tokio::time::sleep(Duration::from_secs(1)).await;
            let interfaces = monitor.network();
            if json {
                println!("{}", serde_json::to_string_pretty(&interfaces)?);
            } else if interfaces.is_empty() {
                println!("No active interfaces");
            } else {
                for iface in &interfaces {
                    println!("{} ({})", iface.name, iface.kind);
                    if let Some(ipv4) = &iface.ipv4 {
                        println!("  IPv4:      {}", ipv4);
                    }
                    if let Some(ipv6) = &iface.ipv6 {
                        println!("  IPv6:      {}", ipv6);
                    }
                    if let Some(mac) = &iface.mac {
                        println!("  MAC:       {}", mac);
                    }
                    if !iface.dns.is_empty() {
                        println!("  DNS:       {}", iface.dns.join(", "));
                    }
                    println!("  Link:      {:.0} Mbps, DHCP {}", iface.link_speed_mbps,
                        if iface.dhcp { "on" } else { "off" });
                    println!(
                        "  Rx:        {}/s ({} total)",
                        fmt_bytes(iface.rx_bytes_per_sec as u64),
                        fmt_bytes(iface.rx_bytes)
                    );
                    println!(
                        "  Tx:        {}/s ({} total)",
                        fmt_bytes(iface.tx_bytes_per_sec as u64),
                        fmt_bytes(iface.tx_bytes)
                    );
                }
            }
        }

        Commands::Connections => {
            let connections = monitor.connections();
            if json {
                println!("{}", serde_json::to_string_pretty(&connections)?);
            } else {
                println!(
                    "{:<5} {:<22} {:<22} {:<13} {:>7} {}",
                    "Proto", "Local", "Remote", "State", "PID", "Process"
                );
                for row in connections.tcp.iter().chain(connections.udp.iter()) {
                    println!(
                        "{:<5} {:<22} {:<22} {:<13} {:>7} {}",
                        row.protocol,
                        format!("{}:{}", row.local_address, row.local_port),
                        format!("{}:{}", row.remote_address, row.remote_port),
                        row.state,
                        row.pid,
                        row.process,
                    );
                }
            }
        }

        Commands::Processes { top } => {
            warm_up(&mut monitor).await;
            let mut processes = monitor.processes();
            processes.sort_by(|a, b| b.cpu_percent.total_cmp(&a.cpu_percent));
            let count = processes.len();
            processes.truncate(top.unwrap_or(config.top_processes));
            if json {
                println!("{}", serde_json::to_string_pretty(&processes)?);
            } else {
                println!(
                    "{:>7} {:<32} {:>6} {:>8} {:>8} {:>10}",
                    "PID", "Name", "CPU%", "Threads", "Handles", "Memory"
                );
                for process in &processes {
                    println!(
                        "{:>7} {:<32} {:>6.1} {:>8} {:>8} {:>10}",
                        process.pid,
                        process.name,
                        process.cpu_percent,
                        process.threads,
                        process.handles,
                        fmt_bytes(process.memory_bytes),
                    );
                }
                println!("{} processes", count);
            }
        }

        Commands::Disk => {
            let disk = monitor.disk();
            if json {
                println!("{}", serde_json::to_string_pretty(&disk)?);
            } else {
                for partition in &disk.partitions {
                    println!(
                        "{:<4} {:<6} {:>10} used of {:>10} ({:.0}%)",
                        partition.mount,
                        partition.filesystem.as_deref().unwrap_or("-"),
                        fmt_bytes(partition.used),
                        fmt_bytes(partition.size),
                        partition.used_percent,
                    );
                }
                for physical in &disk.physical {
                    println!(
                        "{} {} [{}] {}",
                        physical.vendor.as_deref().unwrap_or(""),
                        physical.model.as_deref().unwrap_or("Unknown disk"),
                        physical.bus,
                        physical.size.map(fmt_bytes).unwrap_or_default(),
                    );
                }
            }
        }

        Commands::Diskio => {
            warm_up(&mut monitor).await;
            let io = monitor.disk_io();
            if json {
                println!("{}", serde_json::to_string_pretty(&io)?);
            } else {
                println!("Disk I/O:");
                println!("  Read:      {}/s ({:.0} IOPS)", fmt_bytes(io.read_bytes_per_sec as u64), io.reads_per_sec);
                println!("  Write:     {}/s ({:.0} IOPS)", fmt_bytes(io.write_bytes_per_sec as u64), io.writes_per_sec);
                println!("  Active:    {:.1}%", io.active_time_percent);
                println!("  Queue:     {:.2}", io.queue_length);
                println!("  Latency:   {:.2} ms read / {:.2} ms write", io.avg_read_ms, io.avg_write_ms);
            }
        }

        Commands::Gpu => {
            let gpu = monitor.gpu();
            if json {
                println!("{}", serde_json::to_string_pretty(&gpu)?);
            } else {
                for adapter in &gpu.adapters {
                    match adapter.vram_bytes {
                        Some(vram) => println!("{} ({}, {} VRAM)", adapter.model, adapter.vendor, fmt_bytes(vram)),
                        None => println!("{} ({})", adapter.model, adapter.vendor),
                    }
                }
                for display in &gpu.displays {
                    println!(
                        "  {} {}x{} @ {} Hz{}",
                        display.model,
                        display.width,
                        display.height,
                        display.refresh_hz,
                        if display.primary { " (primary)" } else { "" },
                    );
                }
            }
        }

        Commands::Battery => {
            let battery = monitor.battery();
            if json {
                println!("{}", serde_json::to_string_pretty(&battery)?);
            } else if !battery.present {
                println!("No battery");
            } else {
                println!(
                    "Battery: {}%{}",
                    battery.percent.unwrap_or(0),
                    if battery.charging { " (charging)" } else { "" },
                );
            }
        }

        Commands::System => {
            warm_up(&mut monitor).await;
            let identity = monitor.system_identity();
            let stats = monitor.system_stats();
            let uptime = monitor.uptime_secs();
            if json {
                let value = serde_json::json!({
                    "identity": identity,
                    "stats": stats,
                    "uptime_secs": uptime,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("{} ({} build {}, {})", identity.hostname, identity.platform, identity.build, identity.arch);
                if let Some(manufacturer) = &identity.manufacturer {
                    println!("  Machine:   {} {}", manufacturer, identity.model.as_deref().unwrap_or(""));
                }
                println!("  Uptime:    {}", fmt_uptime(uptime));
                println!("  Processes: {}", stats.processes);
                println!("  Threads:   {}", stats.threads);
                println!("  Handles:   {}", stats.handles);
            }
        }

        Commands::Report => {
            warm_up(&mut monitor).await;
            let report = monitor.report();
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", render_summary(&report));
            }
        }

        Commands::Watch { interval } => {
            let secs = interval.unwrap_or(config.watch_interval_secs).max(1);
            info!("Polling every {}s", secs);
            warm_up(&mut monitor).await;
            loop {
                let report = monitor.report();
                if json {
                    println!("{}", serde_json::to_string(&report)?);
                } else {
                    print!("{}", render_summary(&report));
                }
                tokio::time::sleep(Duration::from_secs(secs)).await;
            }
        }

        Commands::Config { init } => {
            let path = ProbeConfig::default_path()?;
            if init {
                config.save(&path)?;
                println!("Wrote {}", path.display());
            } else {
                println!("# {}", path.display());
                print!("{}", toml::to_string_pretty(&config).unwrap_or_default());
            }
        }
    }

    Ok(())
}

fn bar(percent: f64) -> String {
    let width = 20usize;
    let filled = ((percent / 100.0) * width as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled.min(width)), "-".repeat(width - filled.min(width)))
}

fn fmt_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[unit])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

fn fmt_uptime(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;
    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else {
        format!("{}h {}m", hours, minutes)
    }
}

fn render_summary(report: &HostReport) -> String {
    let memory_percent = report.memory.used_percent;
    let top: Vec<String> = {
        let mut processes = report.processes.clone();
        processes.sort_by(|a, b| b.cpu_percent.total_cmp(&a.cpu_percent));
        processes
            .iter()
            .take(5)
            .map(|p| format!("{:<28} {:>5.1}%  {:>10}", p.name, p.cpu_percent, fmt_bytes(p.memory_bytes)))
            .collect()
    };
    let network: Vec<String> = report
        .network
        .iter()
        .map(|iface| {
            format!(
                "{:<20} rx {:>10}/s  tx {:>10}/s",
                iface.name,
                fmt_bytes(iface.rx_bytes_per_sec as u64),
                fmt_bytes(iface.tx_bytes_per_sec as u64),
            )
        })
        .collect();

    format!(
        "==== {} | {} | up {} ====\n\
         CPU    {} {:.1}%\n\
         Memory {} {:.0}%  ({} of {})\n\
         Disk   r {}/s  w {}/s  active {:.0}%\n\
         {}\n{}\n",
        report.system.hostname,
        report.captured_at,
        fmt_uptime(report.uptime_secs),
        bar(report.cpu_load),
        report.cpu_load,
        bar(memory_percent),
        memory_percent,
        fmt_bytes(report.memory.used),
        fmt_bytes(report.memory.total),
        fmt_bytes(report.disk_io.read_bytes_per_sec as u64),
        fmt_bytes(report.disk_io.write_bytes_per_sec as u64),
        report.disk_io.active_time_percent,
        network.join("\n"),
        top.join("\n"),
    )
}
