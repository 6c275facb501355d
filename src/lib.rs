//! sysprobe
//!
//! Windows host telemetry through a flat set of snapshot queries: memory,
//! CPU load, network interfaces, processes, disks, GPU, battery and system
//! identity. Each query is a synchronous call against one OS subsystem
//! (performance counters, registry, iphlpapi, toolhelp) returning a
//! serializable snapshot.
//!
//! ## Rates
//!
//! Throughput and per-process CPU are computed from consecutive polls of
//! cumulative OS counters. A [`HostMonitor`] keeps the previous sample per
//! entity and the performance-counter handles alive across calls, so hold
//! on to one instance instead of recreating it per query.
//!
//! ## Errors
//!
//! Telemetry reads are best-effort: a missing subsystem or failed call
//! degrades to a neutral default or an omitted field. No query returns an
//! error and none panics.

pub mod core;
pub mod error;
pub mod windows;

// Re-exports
pub use crate::core::config::ProbeConfig;
pub use crate::core::counter::{CounterCell, CounterSource, CounterState};
pub use crate::core::monitor::{HostMonitor, HostReport, ProcessInfo};
pub use crate::core::name_cache::ProcessNameCache;
pub use crate::core::sampler::{cpu_percent, RateSampler};
pub use crate::error::{ProbeError, ProbeResult};
pub use crate::windows::connections::{ConnectionRow, ConnectionsSnapshot};
pub use crate::windows::cpu::CpuIdentity;
pub use crate::windows::disk::{DiskIoStats, DiskSnapshot, Partition, PhysicalDisk};
pub use crate::windows::gpu::{DisplayInfo, GpuAdapter, GpuSnapshot};
pub use crate::windows::memory::{MemoryHardware, MemoryModule, MemorySnapshot};
pub use crate::windows::network::InterfaceStats;
pub use crate::windows::power::BatteryStatus;
pub use crate::windows::system::{SystemIdentity, SystemStats};
