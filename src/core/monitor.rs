//! Long-lived host monitor owning all sampling state
//!
//! Rate samplers, counter handles and the name cache persist across calls,
//! so one `HostMonitor` lives for the process and hands out snapshots on
//! demand. There are no process-wide globals; callers that share a monitor
//! across threads wrap it in a mutex, since each poll is a read-modify-
//! write of the previous-sample store.

use std::collections::HashMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::counter::CounterCell;
use crate::core::name_cache::ProcessNameCache;
use crate::core::sampler::{cpu_percent, RateSampler};
use crate::windows::connections::{self, ConnectionsSnapshot};
use crate::windows::cpu::{self, CpuIdentity, CpuLoadCounter, PerCoreCounter};
use crate::windows::disk::{self, DiskIoCounter, DiskIoStats, DiskSnapshot};
use crate::windows::gpu::{self, GpuSnapshot};
use crate::windows::memory::{self, MemoryHardware, MemorySnapshot};
use crate::windows::network::{self, InterfaceStats};
use crate::windows::power::{self, BatteryStatus};
use crate::windows::process;
use crate::windows::system::{self, HandleCountCounter, SystemIdentity, SystemStats};

/// One process row with its derived CPU percentage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    pub threads: u32,
    pub memory_bytes: u64,
    pub handles: u32,
    pub cpu_percent: f64,
}

/// Everything at once, for watch mode and JSON consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostReport {
    pub captured_at: String,
    pub system: SystemIdentity,
    pub uptime_secs: u64,
    pub memory: MemorySnapshot,
    pub cpu_load: f64,
    pub per_core_load: Vec<f64>,
    pub stats: SystemStats,
    pub network: Vec<InterfaceStats>,
    pub processes: Vec<ProcessInfo>,
    pub disk: DiskSnapshot,
    pub disk_io: DiskIoStats,
    pub gpu: GpuSnapshot,
    pub battery: BatteryStatus,
}

/// The probe's single long-lived instance.
pub struct HostMonitor {
    net_rates: RateSampler<u32, 2>,
    proc_ticks: RateSampler<u32, 2>,
    cpu_load: CounterCell<CpuLoadCounter>,
    per_core: CounterCell<PerCoreCounter>,
    disk_io: CounterCell<DiskIoCounter>,
    handle_count: CounterCell<HandleCountCounter>,
    names: ProcessNameCache,
    logical_cores: usize,
}

impl HostMonitor {
    pub fn new() -> Self {
        let logical_cores = num_cpus::get();
        debug!(logical_cores, "host monitor created");
        Self {
            net_rates: RateSampler::new(),
            proc_ticks: RateSampler::new(),
            cpu_load: CounterCell::new(CpuLoadCounter::new()),
            per_core: CounterCell::new(PerCoreCounter::new()),
            disk_io: CounterCell::new(DiskIoCounter::new()),
            handle_count: CounterCell::new(HandleCountCounter::new()),
            names: ProcessNameCache::new(),
            logical_cores,
        }
    }

    pub fn memory(&self) -> MemorySnapshot {
        memory::sample()
    }

    pub fn memory_hardware(&self) -> MemoryHardware {
        memory::hardware()
    }

    /// Aggregate CPU load, 0-100. The first call primes the counter and
    /// reports zero.
    pub fn cpu_load(&mut self) -> f64 {
        self.cpu_load.sample()
    }

    /// Per-logical-core load, 0-100 each. Empty until primed.
    pub fn per_core_load(&mut self) -> Vec<f64> {
        self.per_core.sample()
    }

    pub fn cpu_identity(&self) -> CpuIdentity {
        cpu::identity()
    }

    /// Active interfaces with byte rates since the previous call.
    pub fn network(&mut self) -> Vec<InterfaceStats> {
        let mut interfaces = network::enumerate();

        let mut counters = HashMap::with_capacity(interfaces.len());
        for iface in &interfaces {
            counters.insert(iface.index, [iface.rx_bytes, iface.tx_bytes]);
        }
        let rates = self.net_rates.poll(counters, Instant::now());

        for iface in &mut interfaces {
            if let Some(rate) = rates.get(&iface.index) {
                iface.rx_bytes_per_sec = rate[0];
                iface.tx_bytes_per_sec = rate[1];
            }
            let capacity_bytes = iface.link_speed_mbps * 1e6 / 8.0;
            if capacity_bytes > 0.0 {
                let busier = iface.rx_bytes_per_sec.max(iface.tx_bytes_per_sec);
                iface.utilization_percent = (busier / capacity_bytes * 100.0).min(100.0);
            }
        }
        interfaces
    }

    /// Live processes with CPU percentages since the previous call.
    pub fn processes(&mut self) -> Vec<ProcessInfo> {
        let samples = process::enumerate();

        let mut ticks = HashMap::with_capacity(samples.len());
        for sample in &samples {
            if let Some((kernel, user)) = sample.ticks {
                ticks.insert(sample.pid, [kernel, user]);
            }
        }
        let rates = self.proc_ticks.poll(ticks, Instant::now());

        samples
            .into_iter()
            .map(|sample| ProcessInfo {
                cpu_percent: rates
                    .get(&sample.pid)
                    .map(|rate| cpu_percent(*rate, self.logical_cores))
                    .unwrap_or(0.0),
                pid: sample.pid,
                name: sample.name,
                threads: sample.threads,
                memory_bytes: sample.memory_bytes,
                handles: sample.handles,
            })
            .collect()
    }

    pub fn connections(&mut self) -> ConnectionsSnapshot {
        connections::enumerate(&mut self.names)
    }

    pub fn disk(&self) -> DiskSnapshot {
        disk::snapshot()
    }

    /// Disk I/O rates from the OS-side counters. Zero until primed.
    pub fn disk_io(&mut self) -> DiskIoStats {
        self.disk_io.sample()
    }

    pub fn gpu(&self) -> GpuSnapshot {
        gpu::snapshot()
    }

    pub fn battery(&self) -> BatteryStatus {
        power::status()
    }

    pub fn system_identity(&self) -> SystemIdentity {
        system::identity()
    }

    pub fn uptime_secs(&self) -> u64 {
        system::uptime_secs()
    }

    /// Process, thread and system handle counts.
    pub fn system_stats(&mut self) -> SystemStats {
        let (processes, threads) = system::object_counts();
        SystemStats {
            processes,
            threads,
            handles: self.handle_count.sample(),
        }
    }

    /// Capture every family in one pass.
    pub fn report(&mut self) -> HostReport {
        HostReport {
            captured_at: chrono::Utc::now().to_rfc3339(),
            system: self.system_identity(),
            uptime_secs: self.uptime_secs(),
            memory: self.memory(),
            cpu_load: self.cpu_load(),
            per_core_load: self.per_core_load(),
            stats: self.system_stats(),
            network: self.network(),
            processes: self.processes(),
            disk: self.disk(),
            disk_io: self.disk_io(),
            gpu: self.gpu(),
            battery: self.battery(),
        }
    }
}

impl Default for HostMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Off Windows every query degrades to an empty snapshot; the monitor
    // must still hand out well-formed reports without panicking.
    #[test]
    fn report_is_always_well_formed() {
        let mut monitor = HostMonitor::new();
        let report = monitor.report();
        assert!(!report.captured_at.is_empty());
        assert!(report.cpu_load >= 0.0 && report.cpu_load <= 100.0);
        for load in &report.per_core_load {
            assert!((0.0..=100.0).contains(load));
        }
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("captured_at"));
    }

    #[test]
    fn repeated_polls_never_panic() {
        let mut monitor = HostMonitor::new();
        for _ in 0..3 {
            let _ = monitor.network();
            let _ = monitor.processes();
            let _ = monitor.system_stats();
            let _ = monitor.disk_io();
        }
    }
}
