//! Physical memory snapshot and module inventory

use serde::{Deserialize, Serialize};

/// Point-in-time memory usage.
///
/// The commit/cache/pool breakdown comes from a second API and is omitted
/// when that call fails; the basic totals survive on their own.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub total: u64,
    pub free: u64,
    pub used: u64,
    pub used_percent: f64,
    /// Page file beyond physical memory; floored at zero on systems where
    /// the page file is smaller than RAM.
    pub swap_total: u64,
    pub swap_used: u64,
    pub swap_free: u64,
    pub committed: Option<u64>,
    pub commit_limit: Option<u64>,
    pub cached: Option<u64>,
    pub paged_pool: Option<u64>,
    pub non_paged_pool: Option<u64>,
    pub page_size: Option<u64>,
}

/// One installed memory module.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryModule {
    pub bank: Option<String>,
    pub capacity: Option<u64>,
    pub speed_mhz: Option<u32>,
    pub memory_type: Option<String>,
    pub form_factor: Option<String>,
    pub manufacturer: Option<String>,
    pub part_number: Option<String>,
}

/// Installed module inventory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryHardware {
    pub modules: Vec<MemoryModule>,
    pub used_slots: u32,
    pub total_slots: Option<u32>,
}

#[cfg(windows)]
pub fn sample() -> MemorySnapshot {
    use windows::Win32::System::ProcessStatus::{GetPerformanceInfo, PERFORMANCE_INFORMATION};
    use windows::Win32::System::SystemInformation::{GlobalMemoryStatusEx, MEMORYSTATUSEX};

    let mut snapshot = MemorySnapshot::default();

    let mut status = MEMORYSTATUSEX {
        dwLength: std::mem::size_of::<MEMORYSTATUSEX>() as u32,
        ..Default::default()
    };
    if unsafe { GlobalMemoryStatusEx(&mut status) }.is_ok() {
        snapshot.total = status.ullTotalPhys;
        snapshot.free = status.ullAvailPhys;
        snapshot.used = status.ullTotalPhys - status.ullAvailPhys;
        snapshot.used_percent = status.dwMemoryLoad as f64;
        let swap_total = status.ullTotalPageFile.saturating_sub(status.ullTotalPhys);
        let swap_free = status
            .ullAvailPageFile
            .saturating_sub(status.ullAvailPhys)
            .min(swap_total);
        snapshot.swap_total = swap_total;
        snapshot.swap_free = swap_free;
        snapshot.swap_used = swap_total - swap_free;
    }

    let cb = std::mem::size_of::<PERFORMANCE_INFORMATION>() as u32;
    let mut perf = PERFORMANCE_INFORMATION {
        cb,
        ..Default::default()
    };
    if unsafe { GetPerformanceInfo(&mut perf, cb) }.is_ok() {
        let page = perf.PageSize as u64;
        snapshot.committed = Some(perf.CommitTotal as u64 * page);
        snapshot.commit_limit = Some(perf.CommitLimit as u64 * page);
        snapshot.cached = Some(perf.SystemCache as u64 * page);
        snapshot.paged_pool = Some(perf.KernelPaged as u64 * page);
        snapshot.non_paged_pool = Some(perf.KernelNonpaged as u64 * page);
        snapshot.page_size = Some(page);
    }

    snapshot
}

#[cfg(not(windows))]
pub fn sample() -> MemorySnapshot {
    MemorySnapshot::default()
}

/// SMBIOS memory type codes that matter in practice.
fn memory_type_name(code: u64) -> Option<&'static str> {
    match code {
        24 => Some("DDR3"),
        26 => Some("DDR4"),
        34 => Some("DDR5"),
        _ => None,
    }
}

fn form_factor_name(code: u64) -> Option<&'static str> {
    match code {
        8 => Some("DIMM"),
        12 => Some("SODIMM"),
        _ => None,
    }
}

/// Query installed memory modules through CIM.
///
/// Runs a single PowerShell command and parses its JSON output; there is no
/// lighter-weight API for SMBIOS module data. An empty inventory is
/// returned when PowerShell is unavailable or the query fails.
#[cfg(windows)]
pub fn hardware() -> MemoryHardware {
    use std::process::Command;
    use tracing::debug;

    const QUERY: &str = concat!(
        "@{ modules = @(Get-CimInstance Win32_PhysicalMemory | ",
        "Select-Object BankLabel,Capacity,Speed,SMBIOSMemoryType,FormFactor,Manufacturer,PartNumber); ",
        "slots = (Get-CimInstance Win32_PhysicalMemoryArray | Select-Object -First 1).MemoryDevices ",
        "} | ConvertTo-Json -Compress -Depth 3"
    );

    let output = match Command::new("powershell")
        .args(["-NoProfile", "-NonInteractive", "-Command", QUERY])
        .output()
    {
        Ok(output) if output.status.success() => output,
        Ok(_) | Err(_) => {
            debug!("CIM memory module query failed");
            return MemoryHardware::default();
        }
    };

    let text = String::from_utf8_lossy(&output.stdout);
    parse_hardware_json(&text)
}

#[cfg(not(windows))]
pub fn hardware() -> MemoryHardware {
    MemoryHardware::default()
}

/// Parse the CIM JSON payload into the inventory shape.
fn parse_hardware_json(text: &str) -> MemoryHardware {
    let root: serde_json::Value = match serde_json::from_str(text.trim()) {
        Ok(value) => value,
        Err(_) => return MemoryHardware::default(),
    };

    let mut hardware = MemoryHardware {
        total_slots: root["slots"].as_u64().map(|n| n as u32),
        ..Default::default()
    };

    // ConvertTo-Json collapses a single element to a bare object.
    let modules = match &root["modules"] {
        serde_json::Value::Array(items) => items.clone(),
        value @ serde_json::Value::Object(_) => vec![value.clone()],
        _ => Vec::new(),
    };

    for item in &modules {
        let trimmed = |key: &str| {
            item[key]
                .as_str()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };
        hardware.modules.push(MemoryModule {
            bank: trimmed("BankLabel"),
            capacity: item["Capacity"].as_u64(),
            speed_mhz: item["Speed"].as_u64().map(|n| n as u32),
            memory_type: item["SMBIOSMemoryType"]
                .as_u64()
                .and_then(memory_type_name)
                .map(String::from),
            form_factor: item["FormFactor"]
                .as_u64()
                .and_then(form_factor_name)
                .map(String::from),
            manufacturer: trimmed("Manufacturer"),
            part_number: trimmed("PartNumber"),
        });
    }
    hardware.used_slots = hardware.modules.len() as u32;
    hardware
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cim_module_array() {
        let json = r#"{"modules":[
            {"BankLabel":"BANK 0","Capacity":17179869184,"Speed":3200,
             "SMBIOSMemoryType":26,"FormFactor":8,
             "Manufacturer":" Kingston ","PartNumber":"KF432C16BB/16 "},
            {"BankLabel":"BANK 2","Capacity":17179869184,"Speed":3200,
             "SMBIOSMemoryType":26,"FormFactor":8,
             "Manufacturer":"Kingston","PartNumber":"KF432C16BB/16"}
        ],"slots":4}"#;
        let hw = parse_hardware_json(json);
        assert_eq!(hw.modules.len(), 2);
        assert_eq!(hw.used_slots, 2);
        assert_eq!(hw.total_slots, Some(4));
        let first = &hw.modules[0];
        assert_eq!(first.capacity, Some(17_179_869_184));
        assert_eq!(first.memory_type.as_deref(), Some("DDR4"));
        assert_eq!(first.form_factor.as_deref(), Some("DIMM"));
        assert_eq!(first.manufacturer.as_deref(), Some("Kingston"));
    }

    #[test]
    fn parses_single_module_as_bare_object() {
        let json = r#"{"modules":{"BankLabel":"BANK 0","Capacity":8589934592,
            "Speed":2667,"SMBIOSMemoryType":34,"FormFactor":12,
            "Manufacturer":"Samsung","PartNumber":"M471A1K43DB1"},"slots":2}"#;
        let hw = parse_hardware_json(json);
        assert_eq!(hw.modules.len(), 1);
        assert_eq!(hw.modules[0].memory_type.as_deref(), Some("DDR5"));
        assert_eq!(hw.modules[0].form_factor.as_deref(), Some("SODIMM"));
    }

    #[test]
    fn garbage_json_degrades_to_empty_inventory() {
        let hw = parse_hardware_json("not json at all");
        assert!(hw.modules.is_empty());
        assert_eq!(hw.total_slots, None);
    }
}
