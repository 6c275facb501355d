//! CPU load counters and processor identity

use serde::{Deserialize, Serialize};

use crate::core::counter::CounterSource;
#[cfg(windows)]
use super::perf::PdhQuery;

/// `% Processor Utility` is what Task Manager shows on modern CPUs; older
/// systems only have `% Processor Time`.
#[cfg(windows)]
const CPU_UTILITY_TOTAL: &str = r"\Processor Information(_Total)\% Processor Utility";
#[cfg(windows)]
const CPU_TIME_TOTAL: &str = r"\Processor(_Total)\% Processor Time";

/// Static processor identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CpuIdentity {
    pub logical_cores: u32,
    pub physical_cores: u32,
    pub brand: Option<String>,
    /// Base clock in GHz, from the registry rather than a live counter.
    pub speed_ghz: Option<f64>,
    pub virtualization: Option<String>,
}

/// Aggregate CPU load source.
pub struct CpuLoadCounter {
    #[cfg(windows)]
    query: Option<PdhQuery>,
}

impl CpuLoadCounter {
    pub fn new() -> Self {
        Self {
            #[cfg(windows)]
            query: None,
        }
    }
}

impl Default for CpuLoadCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(windows)]
impl CounterSource for CpuLoadCounter {
    type Value = f64;

    fn prime(&mut self) -> bool {
        if self.query.is_none() {
            let Some(mut query) = PdhQuery::open() else {
                return false;
            };
            if query.add_counter(CPU_UTILITY_TOTAL).is_none()
                && query.add_counter(CPU_TIME_TOTAL).is_none()
            {
                return false;
            }
            self.query = Some(query);
        }
        self.query.as_ref().map(PdhQuery::collect).unwrap_or(false)
    }

    fn collect(&mut self) -> Option<f64> {
        let query = self.query.as_ref()?;
        if !query.collect() {
            return None;
        }
        query.value(0).map(|load| load.clamp(0.0, 100.0))
    }
}

#[cfg(not(windows))]
impl CounterSource for CpuLoadCounter {
    type Value = f64;

    fn prime(&mut self) -> bool {
        false
    }

    fn collect(&mut self) -> Option<f64> {
        None
    }
}

/// Per-logical-core load source; one counter per core on a single query.
pub struct PerCoreCounter {
    #[cfg(windows)]
    query: Option<PdhQuery>,
    #[cfg(windows)]
    slots: Vec<Option<usize>>,
}

impl PerCoreCounter {
    pub fn new() -> Self {
        Self {
            #[cfg(windows)]
            query: None,
            #[cfg(windows)]
            slots: Vec::new(),
        }
    }
}

impl Default for PerCoreCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(windows)]
impl CounterSource for PerCoreCounter {
    type Value = Vec<f64>;

    fn prime(&mut self) -> bool {
        if self.query.is_none() {
            let Some(mut query) = PdhQuery::open() else {
                return false;
            };
            let cores = num_cpus::get();
            let mut slots = Vec::with_capacity(cores);
            for core in 0..cores {
                let utility = format!(r"\Processor Information(0,{core})\% Processor Utility");
                let slot = query.add_counter(&utility).or_else(|| {
                    let time = format!(r"\Processor({core})\% Processor Time");
                    query.add_counter(&time)
                });
                slots.push(slot);
            }
            if slots.iter().all(Option::is_none) {
                return false;
            }
            self.query = Some(query);
            self.slots = slots;
        }
        self.query.as_ref().map(PdhQuery::collect).unwrap_or(false)
    }

    fn collect(&mut self) -> Option<Vec<f64>> {
        let query = self.query.as_ref()?;
        if !query.collect() {
            return None;
        }
        let loads = self
            .slots
            .iter()
            .map(|slot| {
                slot.and_then(|s| query.value(s))
                    .map(|load| load.clamp(0.0, 100.0))
                    .unwrap_or(0.0)
            })
            .collect();
        Some(loads)
    }
}

#[cfg(not(windows))]
impl CounterSource for PerCoreCounter {
    type Value = Vec<f64>;

    fn prime(&mut self) -> bool {
        false
    }

    fn collect(&mut self) -> Option<Vec<f64>> {
        None
    }
}

#[cfg(windows)]
pub fn identity() -> CpuIdentity {
    use super::util::{reg_string, reg_u32};
    use windows::Win32::System::SystemInformation::{
        GetLogicalProcessorInformation, GetNativeSystemInfo, RelationProcessorCore,
        SYSTEM_INFO, SYSTEM_LOGICAL_PROCESSOR_INFORMATION,
    };

    const PROCESSOR_KEY: &str = r"HARDWARE\DESCRIPTION\System\CentralProcessor\0";

    let mut info = SYSTEM_INFO::default();
    unsafe { GetNativeSystemInfo(&mut info) };
    let logical_cores = info.dwNumberOfProcessors;

    let mut physical_cores = 0u32;
    let mut len = 0u32;
    unsafe {
        let _ = GetLogicalProcessorInformation(None, &mut len);
    }
    let entries = len as usize / std::mem::size_of::<SYSTEM_LOGICAL_PROCESSOR_INFORMATION>();
    if entries > 0 {
        let mut buffer = vec![SYSTEM_LOGICAL_PROCESSOR_INFORMATION::default(); entries];
        if unsafe { GetLogicalProcessorInformation(Some(buffer.as_mut_ptr()), &mut len) }.is_ok() {
            physical_cores = buffer
                .iter()
                .filter(|entry| entry.Relationship == RelationProcessorCore)
                .count() as u32;
        }
    }
    if physical_cores == 0 {
        physical_cores = (logical_cores / 2).max(1);
    }

    let virtualization = reg_string(PROCESSOR_KEY, "Identifier").map(|id| {
        if id.contains("AMD") || id.contains("Intel") {
            "Supported".to_string()
        } else {
            "Unknown".to_string()
        }
    });

    CpuIdentity {
        logical_cores,
        physical_cores,
        brand: reg_string(PROCESSOR_KEY, "ProcessorNameString"),
        speed_ghz: reg_u32(PROCESSOR_KEY, "~MHz").map(|mhz| mhz as f64 / 1000.0),
        virtualization,
    }
}

#[cfg(not(windows))]
pub fn identity() -> CpuIdentity {
    CpuIdentity::default()
}
